// --- File: crates/stripekit_config/src/models.rs ---

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::validation::validate;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_TIMEOUT_SECS: u64 = 80; // what Stripe's own SDKs use

// --- Retry Config ---
// Attempt budget and backoff curve for the retry executor.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub max_interval_ms: u64,
    /// Jitter: each delay is drawn from `delay * (1 ± randomization_factor)`.
    pub randomization_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 11, // first call + 10 retries
            initial_interval_ms: 1_000,
            multiplier: 2.0,
            max_interval_ms: 60_000,
            randomization_factor: 0.5,
        }
    }
}

impl RetryConfig {
    /// Retries left after the given (1-based) attempt has failed.
    pub fn retries_left_after(&self, attempt: u32) -> u32 {
        self.max_attempts.saturating_sub(attempt)
    }

    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

// --- Stripe Config ---
// The credential plus client tuning. Built once per module registration.
#[derive(Deserialize, Clone)]
pub struct StripeConfig {
    pub api_key: String, // Mandatory
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_version: Option<String>, // Sent as Stripe-Version when set
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl StripeConfig {
    /// Literal configuration with defaults for everything but the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: default_api_base(),
            api_version: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Runs [`validate`] and returns the config unchanged if nothing is wrong.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = validate(&self);
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

// api_key is a secret, keep it out of logs
impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Keeps the `sk_live_`/`sk_test_` style prefix and hides the rest.
fn redact(secret: &str) -> String {
    match secret.rfind('_') {
        Some(idx) if idx + 1 < secret.len() => format!("{}***", &secret[..=idx]),
        _ if secret.is_empty() => String::new(),
        _ => "***".to_string(),
    }
}
