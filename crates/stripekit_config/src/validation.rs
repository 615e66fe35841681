//! Explicit validation of a [`StripeConfig`].

use crate::error::FieldError;
use crate::models::StripeConfig;

/// Returns every problem with `config`; an empty vector means it is usable.
pub fn validate(config: &StripeConfig) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if config.api_key.trim().is_empty() {
        errors.push(FieldError::new("api_key", "must be a non-empty string"));
    }
    if !(config.api_base.starts_with("https://") || config.api_base.starts_with("http://")) {
        errors.push(FieldError::new("api_base", "must be an http(s) URL"));
    }
    if let Some(version) = &config.api_version {
        if version.trim().is_empty() {
            errors.push(FieldError::new("api_version", "must not be blank when set"));
        }
    }
    if config.timeout_secs == 0 {
        errors.push(FieldError::new("timeout_secs", "must be greater than 0"));
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(FieldError::new("retry.max_attempts", "must be at least 1"));
    }
    if retry.initial_interval_ms == 0 {
        errors.push(FieldError::new("retry.initial_interval_ms", "must be greater than 0"));
    }
    if !(retry.multiplier >= 1.0) {
        errors.push(FieldError::new("retry.multiplier", "must be >= 1.0"));
    }
    if retry.max_interval_ms < retry.initial_interval_ms {
        errors.push(FieldError::new(
            "retry.max_interval_ms",
            "must be >= retry.initial_interval_ms",
        ));
    }
    if !(0.0..=1.0).contains(&retry.randomization_factor) {
        errors.push(FieldError::new(
            "retry.randomization_factor",
            "must be within 0.0..=1.0",
        ));
    }

    errors
}
