// --- File: crates/stripekit_stripe/src/lib.rs ---

pub mod client;
pub mod error;
pub mod models;
pub mod module;
pub mod retry;
pub mod service;

// Re-export for the composition root
pub use client::StripeClient;
pub use error::{InternalFailure, StripeError, TerminalReason}; // Re-export the error types
pub use module::{AsyncOptions, Injected, ProviderModule, Providers, StripeModule, Token};
pub use retry::{is_retryable_status, RetryPolicy};
pub use service::StripeService; // Re-export the service
pub use stripekit_config::{ConfigError, RetryConfig, StripeConfig};
