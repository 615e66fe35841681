// --- File: crates/stripekit_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type for all stripekit errors.
///
/// Each crate keeps its own error enum and implements `From<SpecificError> for StripekitError`
/// so that an application embedding several stripekit crates can fold them into one type.
#[derive(Error, Debug)]
pub enum StripekitError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to rate limiting
    #[error("Rate limited: {0}")]
    RateLimitError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
///
/// Lets a hosting web layer turn any stripekit error into a response status
/// without matching on crate-specific variants.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for StripekitError {
    fn status_code(&self) -> u16 {
        match self {
            StripekitError::HttpError(_) => 500,
            StripekitError::ParseError(_) => 400,
            StripekitError::ConfigError(_) => 500,
            StripekitError::ExternalServiceError { .. } => 502,
            StripekitError::RateLimitError(_) => 429,
            StripekitError::InternalError(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, StripekitError>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, StripekitError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| StripekitError::InternalError(format!("{}: {}", context, error)))
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> StripekitError {
    StripekitError::ConfigError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> StripekitError {
    StripekitError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> StripekitError {
    StripekitError::InternalError(message.to_string())
}
