// --- File: crates/stripekit_config/src/lib.rs ---
//! Configuration for the stripekit Stripe module.
//!
//! The credential is resolved exactly once, at composition time, from one of
//! three places: the process environment, a literal [`StripeConfig`], or a
//! caller-supplied factory (see `stripekit_stripe::module`). Whatever the
//! source, the result goes through [`validate`] before anything downstream
//! sees it.

pub mod env_vars;
pub mod error;
pub mod models;
pub mod validation;

pub use env_vars::{ensure_dotenv_loaded, process_env_snapshot, API_KEY_VAR};
pub use error::{ConfigError, FieldError};
pub use models::{RetryConfig, StripeConfig, DEFAULT_API_BASE};
pub use validation::validate;
