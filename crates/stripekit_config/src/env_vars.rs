//! Environment variable handling for the Stripe configuration.
//!
//! Ambient process state is read in exactly one place, [`process_env_snapshot`].
//! Everything else works on an explicit snapshot so the resolution is
//! deterministic and testable.
//!
//! Recognised variables:
//!
//! | variable | field |
//! |----------|-------|
//! | `STRIPE_API_KEY` | `api_key` (required) |
//! | `STRIPE_API_BASE` | `api_base` |
//! | `STRIPE_API_VERSION` | `api_version` |
//! | `STRIPE_TIMEOUT_SECS` | `timeout_secs` |
//! | `STRIPE_MAX_ATTEMPTS` | `retry.max_attempts` |
//! | `STRIPE_RETRY_INITIAL_INTERVAL_MS` | `retry.initial_interval_ms` |
//! | `STRIPE_RETRY_MAX_INTERVAL_MS` | `retry.max_interval_ms` |

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use config::{Config, Environment};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ConfigError, FieldError};
use crate::models::StripeConfig;
use crate::validation::validate;

/// The prefix shared by all Stripe variables
pub const ENV_PREFIX: &str = "STRIPE";

/// The one variable that must be present
pub const API_KEY_VAR: &str = "STRIPE_API_KEY";

/// Raw string view of the `STRIPE_*` variables, as read by the `config` crate.
#[derive(Debug, Default, Deserialize)]
struct StripeEnv {
    api_key: Option<String>,
    api_base: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<String>,
    max_attempts: Option<String>,
    retry_initial_interval_ms: Option<String>,
    retry_max_interval_ms: Option<String>,
}

/// Map a config field path to the variable that feeds it
fn env_var_for(field: &str) -> String {
    let name = match field {
        "retry.max_attempts" => "max_attempts",
        "retry.initial_interval_ms" => "retry_initial_interval_ms",
        "retry.max_interval_ms" => "retry_max_interval_ms",
        other => other,
    };
    format!("{}_{}", ENV_PREFIX, name.replace('.', "_")).to_uppercase()
}

fn parse_field<T: FromStr>(
    raw: Option<&String>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(FieldError::new(
                env_var_for(field),
                format!("'{}' is not a valid number", raw),
            ));
            None
        }
    }
}

impl StripeConfig {
    /// Resolve the configuration from an explicit environment snapshot.
    ///
    /// Fails with [`ConfigError::Invalid`] naming every offending variable,
    /// `STRIPE_API_KEY` included when it is absent or empty.
    pub fn from_env_snapshot(vars: &HashMap<String, String>) -> Result<StripeConfig, ConfigError> {
        let raw: StripeEnv = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).source(Some(vars.clone())))
            .build()?
            .try_deserialize()?;

        let mut errors = Vec::new();
        let mut config = StripeConfig::new(raw.api_key.clone().unwrap_or_default());

        if let Some(api_base) = raw.api_base.clone() {
            config.api_base = api_base;
        }
        config.api_version = raw.api_version.clone();
        if let Some(timeout_secs) = parse_field(raw.timeout_secs.as_ref(), "timeout_secs", &mut errors) {
            config.timeout_secs = timeout_secs;
        }
        if let Some(max_attempts) =
            parse_field(raw.max_attempts.as_ref(), "retry.max_attempts", &mut errors)
        {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(initial) = parse_field(
            raw.retry_initial_interval_ms.as_ref(),
            "retry.initial_interval_ms",
            &mut errors,
        ) {
            config.retry.initial_interval_ms = initial;
        }
        if let Some(max) = parse_field(
            raw.retry_max_interval_ms.as_ref(),
            "retry.max_interval_ms",
            &mut errors,
        ) {
            config.retry.max_interval_ms = max;
        }

        errors.extend(validate(&config).into_iter().map(|e| FieldError {
            field: env_var_for(&e.field),
            message: e.message,
        }));

        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        debug!("Resolved Stripe configuration from environment: {:?}", config);
        Ok(config)
    }

    /// Load `.env` (once) and resolve from the current process environment.
    pub fn from_process_env() -> Result<StripeConfig, ConfigError> {
        ensure_dotenv_loaded();
        Self::from_env_snapshot(&process_env_snapshot())
    }
}

/// Take a snapshot of the process environment. Non-UTF-8 variables are skipped.
pub fn process_env_snapshot() -> HashMap<String, String> {
    env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

static INIT_DOTENV: OnceCell<String> = OnceCell::new();

/// Ensures that the dotenv file is loaded into the environment variables.
///
/// The file defaults to `.env` and can be redirected with `DOTENV_OVERRIDE`.
/// Only the first call reads `DOTENV_OVERRIDE` and touches the file; every
/// call returns that first path. A missing file is not an error.
pub fn ensure_dotenv_loaded() -> &'static str {
    INIT_DOTENV.get_or_init(|| {
        let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());
        load_dotenv_file(&dotenv_path);
        dotenv_path
    })
}

/// Load one dotenv file. Variables already set in the process win.
fn load_dotenv_file(path: &str) -> bool {
    match dotenv::from_filename(path) {
        Ok(_) => {
            info!("Loaded environment from {}", path);
            true
        }
        Err(e) => {
            debug!("No dotenv file loaded from {}: {}", path, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_var_for() {
        assert_eq!(env_var_for("api_key"), "STRIPE_API_KEY");
        assert_eq!(env_var_for("retry.max_attempts"), "STRIPE_MAX_ATTEMPTS");
        assert_eq!(
            env_var_for("retry.initial_interval_ms"),
            "STRIPE_RETRY_INITIAL_INTERVAL_MS"
        );
        assert_eq!(env_var_for("retry.multiplier"), "STRIPE_RETRY_MULTIPLIER");
    }

    #[test]
    fn test_api_key_only() {
        let config = StripeConfig::from_env_snapshot(&snapshot(&[
            ("STRIPE_API_KEY", "sk_test_123"),
            ("PATH", "/usr/bin"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "sk_test_123");
        assert_eq!(config.api_base, "https://api.stripe.com");
        assert_eq!(config.retry.max_attempts, 11);
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let err = StripeConfig::from_env_snapshot(&snapshot(&[("PATH", "/usr/bin")])).unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["STRIPE_API_KEY"]);
    }

    #[test]
    fn test_empty_api_key_is_reported() {
        let err = StripeConfig::from_env_snapshot(&snapshot(&[("STRIPE_API_KEY", "")])).unwrap_err();
        assert_eq!(err.fields()[0].field, "STRIPE_API_KEY");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = StripeConfig::from_env_snapshot(&snapshot(&[
            ("STRIPE_API_KEY", "sk_test_123"),
            ("STRIPE_API_BASE", "http://localhost:12111"),
            ("STRIPE_API_VERSION", "2024-06-20"),
            ("STRIPE_TIMEOUT_SECS", "5"),
            ("STRIPE_MAX_ATTEMPTS", "4"),
            ("STRIPE_RETRY_INITIAL_INTERVAL_MS", "10"),
            ("STRIPE_RETRY_MAX_INTERVAL_MS", "20"),
        ]))
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:12111");
        assert_eq!(config.api_version.as_deref(), Some("2024-06-20"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_interval_ms, 10);
        assert_eq!(config.retry.max_interval_ms, 20);
    }

    #[test]
    fn test_every_bad_variable_is_listed() {
        let err = StripeConfig::from_env_snapshot(&snapshot(&[
            ("STRIPE_TIMEOUT_SECS", "soon"),
            ("STRIPE_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["STRIPE_TIMEOUT_SECS", "STRIPE_API_KEY", "STRIPE_MAX_ATTEMPTS"]
        );
    }

    #[test]
    fn test_dotenv_file_feeds_resolution() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "STRIPEKIT_TEST_DOTENV_KEY=sk_test_from_file").unwrap();
        writeln!(file, "STRIPEKIT_TEST_DOTENV_BASE=http://localhost:12111").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        temp_env::with_vars(
            [
                ("STRIPEKIT_TEST_DOTENV_KEY", None::<&str>),
                ("STRIPEKIT_TEST_DOTENV_BASE", Some("http://already.set")),
            ],
            || {
                assert!(load_dotenv_file(&path));
                assert_eq!(
                    env::var("STRIPEKIT_TEST_DOTENV_KEY").as_deref(),
                    Ok("sk_test_from_file")
                );
                assert_eq!(
                    env::var("STRIPEKIT_TEST_DOTENV_BASE").as_deref(),
                    Ok("http://already.set")
                );
            },
        );
    }

    #[test]
    fn test_missing_dotenv_file_is_not_an_error() {
        assert!(!load_dotenv_file("/nonexistent/stripekit.env"));
    }

    #[test]
    fn test_dotenv_path_is_fixed_after_first_call() {
        let first = temp_env::with_var("DOTENV_OVERRIDE", Some("/nonexistent/first.env"), || {
            ensure_dotenv_loaded()
        });
        let second = temp_env::with_var("DOTENV_OVERRIDE", Some("/nonexistent/second.env"), || {
            ensure_dotenv_loaded()
        });
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_process_env() {
        temp_env::with_vars(
            [
                ("STRIPE_API_KEY", Some("sk_test_process")),
                ("DOTENV_OVERRIDE", Some("/nonexistent/.env")),
            ],
            || {
                let config = StripeConfig::from_process_env().unwrap();
                assert_eq!(config.api_key, "sk_test_process");
            },
        );
    }
}
