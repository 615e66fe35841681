use std::fmt;

use stripekit_common::{config_error, StripekitError};
use thiserror::Error;

/// One violated configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path (`api_key`, `retry.max_attempts`) or environment variable name.
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while composing the Stripe module. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more fields are missing or malformed. Every offending field is listed.
    #[error("invalid Stripe configuration: {}", join_fields(.0))]
    Invalid(Vec<FieldError>),

    /// The `config` crate could not read the environment source
    #[error("failed to read configuration source: {0}")]
    Source(#[from] config::ConfigError),

    /// Dependencies declared for a configuration factory were never provided
    #[error("missing dependencies for Stripe configuration factory: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    /// A caller-supplied configuration factory failed
    #[error("Stripe configuration factory failed: {0}")]
    Factory(String),
}

impl ConfigError {
    /// The field errors carried by [`ConfigError::Invalid`], empty for other variants.
    pub fn fields(&self) -> &[FieldError] {
        match self {
            ConfigError::Invalid(fields) => fields,
            _ => &[],
        }
    }
}

impl From<ConfigError> for StripekitError {
    fn from(err: ConfigError) -> Self {
        config_error(err)
    }
}
