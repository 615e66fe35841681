// --- File: crates/stripekit_common/src/lib.rs ---

pub mod error;     // Error handling
pub mod logging;   // Logging utilities

// Re-export error types and utilities for easier access
pub use error::{
    StripekitError,
    HttpStatusCode,
    Context,
    config_error,
    external_service_error,
    internal_error,
};

// Re-export logging utilities for easier access
pub use logging::{
    init,
    init_with_level,
    log_error,
    log_result,
};

// This crate holds what every stripekit crate shares: the base error type
// that crate-specific errors convert into, and the tracing subscriber setup.
