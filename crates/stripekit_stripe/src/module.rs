//! Registration of the Stripe service in an application's composition root.
//!
//! Three ways to build a [`StripeModule`]:
//!
//! * [`StripeModule::from_env`]: credential from `STRIPE_API_KEY` (and `.env`).
//! * [`StripeModule::for_root`]: a literal [`StripeConfig`].
//! * [`StripeModule::for_root_async`]: a factory that receives previously
//!   registered providers, declared up front through [`AsyncOptions::inject`].
//!
//! Every form resolves the configuration exactly once and fails before a
//! [`StripeService`] exists when it cannot.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use stripekit_config::{ConfigError, StripeConfig};
use tracing::info;

use crate::error::StripeError;
use crate::service::StripeService;

/// Type alias for the boxed future a configuration factory returns
pub type ConfigFuture = Pin<Box<dyn Future<Output = Result<StripeConfig, ConfigError>> + Send>>;

type ConfigFactory = Box<dyn Fn(Injected) -> ConfigFuture + Send + Sync>;

/// Identifies a provider by its Rust type.
#[derive(Clone, Copy)]
pub struct Token {
    id: TypeId,
    name: &'static str,
}

impl Token {
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.name)
    }
}

/// Type-keyed provider registry: the host application's container.
#[derive(Clone, Default)]
pub struct Providers {
    entries: HashMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value`, replacing any previous provider of the same type.
    pub fn provide<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.provide_arc(Arc::new(value))
    }

    pub fn provide_arc<T: Any + Send + Sync>(&mut self, value: Arc<T>) -> &mut Self {
        self.entries
            .insert(TypeId::of::<T>(), (type_name::<T>(), value as Arc<dyn Any + Send + Sync>));
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let (_, value) = self.entries.get(&TypeId::of::<T>())?;
        value.clone().downcast::<T>().ok()
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.entries.contains_key(&token.id)
    }

    /// Let `module` register its providers here.
    pub fn import(&mut self, module: &dyn ProviderModule) -> &mut Self {
        info!("Importing providers from {}", module.name());
        module.register(self);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.values().map(|(name, _)| name))
            .finish()
    }
}

/// Something that contributes providers to a [`Providers`] registry.
pub trait ProviderModule: Send + Sync {
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    fn register(&self, providers: &mut Providers);
}

/// Dependencies handed to a configuration factory.
///
/// Only the tokens declared with [`AsyncOptions::inject`] are visible.
pub struct Injected {
    providers: Providers,
    declared: Vec<Token>,
}

impl Injected {
    /// Resolve a declared dependency.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ConfigError> {
        let token = Token::of::<T>();
        if !self.declared.contains(&token) {
            return Err(ConfigError::Factory(format!(
                "{} was not declared in inject",
                token.name()
            )));
        }
        self.providers
            .get::<T>()
            .ok_or_else(|| ConfigError::MissingDependencies(vec![token.name().to_string()]))
    }

    pub fn tokens(&self) -> &[Token] {
        &self.declared
    }
}

/// Options for [`StripeModule::for_root_async`].
pub struct AsyncOptions {
    imports: Vec<Arc<dyn ProviderModule>>,
    providers: Providers,
    inject: Vec<Token>,
    use_factory: ConfigFactory,
}

impl AsyncOptions {
    /// Build options around an async configuration factory.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn(Injected) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StripeConfig, ConfigError>> + Send + 'static,
    {
        Self {
            imports: Vec::new(),
            providers: Providers::new(),
            inject: Vec::new(),
            use_factory: Box::new(move |deps| -> ConfigFuture { Box::pin(factory(deps)) }),
        }
    }

    /// Build options around a synchronous configuration factory.
    pub fn from_fn<F>(factory: F) -> Self
    where
        F: Fn(Injected) -> Result<StripeConfig, ConfigError> + Send + Sync + 'static,
    {
        Self::new(move |deps| std::future::ready(factory(deps)))
    }

    /// Register `module`'s providers before the factory runs.
    pub fn import(mut self, module: impl ProviderModule + 'static) -> Self {
        self.imports.push(Arc::new(module));
        self
    }

    /// Start from providers the host already has.
    pub fn with_providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    /// Declare a dependency the factory needs.
    pub fn inject<T: Any + Send + Sync>(mut self) -> Self {
        let token = Token::of::<T>();
        if !self.inject.contains(&token) {
            self.inject.push(token);
        }
        self
    }
}

impl fmt::Debug for AsyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOptions")
            .field("imports", &self.imports.iter().map(|m| m.name().to_string()).collect::<Vec<_>>())
            .field("providers", &self.providers)
            .field("inject", &self.inject)
            .finish_non_exhaustive()
    }
}

/// The Stripe module: owns the one [`StripeService`] built from the resolved configuration.
#[derive(Debug, Clone)]
pub struct StripeModule {
    service: Arc<StripeService>,
}

impl StripeModule {
    /// Resolve the credential from the process environment (after loading `.env`).
    pub fn from_env() -> Result<Self, StripeError> {
        info!("Registering Stripe module from environment");
        Self::build(StripeConfig::from_process_env()?)
    }

    /// Resolve the credential from an explicit environment snapshot.
    pub fn from_env_snapshot(vars: &HashMap<String, String>) -> Result<Self, StripeError> {
        info!("Registering Stripe module from environment snapshot");
        Self::build(StripeConfig::from_env_snapshot(vars)?)
    }

    /// Use a literal configuration as given.
    pub fn for_root(config: StripeConfig) -> Result<Self, StripeError> {
        info!("Registering Stripe module from literal configuration");
        Self::build(config)
    }

    /// Run imports, check declared dependencies, then call the factory and validate its result.
    pub async fn for_root_async(options: AsyncOptions) -> Result<Self, StripeError> {
        info!("Registering Stripe module from configuration factory");
        let AsyncOptions {
            imports,
            mut providers,
            inject,
            use_factory,
        } = options;

        for module in &imports {
            providers.import(module.as_ref());
        }

        let missing: Vec<String> = inject
            .iter()
            .filter(|token| !providers.contains(token))
            .map(|token| token.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingDependencies(missing).into());
        }

        let config = use_factory(Injected {
            providers,
            declared: inject,
        })
        .await?;

        Self::build(config.validated()?)
    }

    fn build(config: StripeConfig) -> Result<Self, StripeError> {
        let service = StripeService::new(&config)?;
        Ok(Self {
            service: Arc::new(service),
        })
    }

    /// The exported service.
    pub fn service(&self) -> Arc<StripeService> {
        self.service.clone()
    }
}

impl ProviderModule for StripeModule {
    fn name(&self) -> &str {
        "StripeModule"
    }

    fn register(&self, providers: &mut Providers) {
        providers.provide_arc(self.service.clone());
    }
}
