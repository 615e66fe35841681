use std::fmt;

use stripekit_common::{
    external_service_error,
    internal_error,
    HttpStatusCode,
    StripekitError,
};
use stripekit_config::ConfigError;
use thiserror::Error;

/// Stripe-specific error types.
#[derive(Error, Debug)]
pub enum StripeError {
    /// Transport failure talking to the Stripe API (connect, timeout, TLS, ...)
    #[error("Stripe API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error returned by the Stripe API. This is the only shape the retry executor classifies.
    #[error("Stripe API returned an error: {message} (Status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
        code: Option<String>,
        error_type: Option<String>,
    },

    /// Error parsing Stripe API response
    #[error("Failed to parse Stripe API response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing or malformed Stripe configuration
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// A remote failure the retry executor gave up on
    #[error(transparent)]
    Internal(#[from] InternalFailure),

    /// Failure raised by caller code inside a retried operation
    #[error("Stripe operation failed: {0}")]
    Operation(Box<dyn std::error::Error + Send + Sync>),
}

impl StripeError {
    /// Wrap a caller-defined error so it can be returned from a retried operation.
    pub fn operation<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StripeError::Operation(err.into())
    }

    /// Status code of a remote API error, `None` for every other kind of failure.
    pub fn api_status(&self) -> Option<u16> {
        match self {
            StripeError::ApiError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Why the retry executor stopped retrying a remote error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The status code is not one we retry (4xx other than 429).
    NonRetryable,
    /// The status was retryable but the attempt budget ran out.
    RetriesExhausted,
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalReason::NonRetryable => write!(f, "non-retryable status"),
            TerminalReason::RetriesExhausted => write!(f, "retries exhausted"),
        }
    }
}

/// Generic internal failure wrapping the last remote API error.
///
/// The display text is deliberately the same for both [`TerminalReason`]s;
/// the original error stays reachable through [`std::error::Error::source`]
/// and [`InternalFailure::cause`].
#[derive(Error, Debug)]
#[error("Internal server error")]
pub struct InternalFailure {
    reason: TerminalReason,
    attempts: u32,
    #[source]
    source: Box<StripeError>,
}

impl InternalFailure {
    pub fn new(reason: TerminalReason, attempts: u32, source: StripeError) -> Self {
        Self {
            reason,
            attempts,
            source: Box::new(source),
        }
    }

    pub fn reason(&self) -> TerminalReason {
        self.reason
    }

    /// Number of calls made, the failing one included.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The remote API error that ended the retry loop.
    pub fn cause(&self) -> &StripeError {
        &self.source
    }

    pub fn into_cause(self) -> StripeError {
        *self.source
    }
}

/// Convert StripeError to StripekitError
impl From<StripeError> for StripekitError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::RequestError(e) => StripekitError::HttpError(format!("Stripe request error: {}", e)),
            StripeError::ApiError { status_code: 429, message, .. } => {
                StripekitError::RateLimitError(format!("Stripe API: {}", message))
            }
            StripeError::ApiError { status_code, message, .. } => external_service_error(
                "Stripe API",
                format!("Status: {}, Message: {}", status_code, message)
            ),
            StripeError::ParseError(e) => StripekitError::ParseError(format!("Stripe response parse error: {}", e)),
            StripeError::ConfigError(e) => e.into(),
            StripeError::Internal(failure) => internal_error(format!(
                "Stripe call failed ({} after {} attempt(s)): {}",
                failure.reason(),
                failure.attempts(),
                failure.cause()
            )),
            StripeError::Operation(e) => internal_error(format!("Stripe operation error: {}", e)),
        }
    }
}

/// Implement HttpStatusCode for StripeError to provide a consistent way to convert
/// StripeError to HTTP status codes.
impl HttpStatusCode for StripeError {
    fn status_code(&self) -> u16 {
        match self {
            StripeError::RequestError(_) => 500,
            StripeError::ApiError { status_code, .. } => *status_code,
            StripeError::ParseError(_) => 502,
            StripeError::ConfigError(_) => 500,
            StripeError::Internal(_) => 500,
            StripeError::Operation(_) => 500,
        }
    }
}
