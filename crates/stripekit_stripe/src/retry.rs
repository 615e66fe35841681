//! Retry loop with failure classification for Stripe calls.
//!
//! Only [`StripeError::ApiError`] is ever retried, and only for 5xx and 429.
//! Anything else that is not a remote API error goes back to the caller
//! untouched after the first attempt. A remote error we stop on is wrapped
//! into [`InternalFailure`].

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use http::StatusCode;
use stripekit_config::RetryConfig;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::{InternalFailure, StripeError, TerminalReason};

/// Server errors and rate limiting are transient; everything else is final.
pub fn is_retryable_status(status_code: u16) -> bool {
    status_code >= StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        || status_code == StatusCode::TOO_MANY_REQUESTS.as_u16()
}

/// Bookkeeping for one `run` invocation. Never shared between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number
    pub number: u32,
    pub retries_left: u32,
}

impl Attempt {
    fn first(config: &RetryConfig) -> Self {
        Self {
            number: 1,
            retries_left: config.retries_left_after(1),
        }
    }

    fn next(self) -> Self {
        Self {
            number: self.number + 1,
            retries_left: self.retries_left.saturating_sub(1),
        }
    }
}

/// Bounded-attempt retry policy with jittered exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// A fresh delay sequence. Attempts are counted by [`RetryPolicy::run`], not by elapsed time.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.initial_interval())
            .with_multiplier(self.config.multiplier)
            .with_max_interval(self.config.max_interval())
            .with_randomization_factor(self.config.randomization_factor)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Run `operation` until it succeeds, fails with something we don't retry,
    /// or the attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, StripeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StripeError>>,
    {
        let mut backoff = self.backoff();
        let mut attempt = Attempt::first(&self.config);

        loop {
            let err = match operation().await {
                Ok(value) => {
                    if attempt.number > 1 {
                        debug!("Stripe call succeeded on attempt {}", attempt.number);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            error!(
                attempt = attempt.number,
                retries_left = attempt.retries_left,
                "Stripe call failed: {}",
                err
            );

            let Some(status_code) = err.api_status() else {
                return Err(err);
            };

            let reason = if !is_retryable_status(status_code) {
                Some(TerminalReason::NonRetryable)
            } else if attempt.retries_left == 0 {
                Some(TerminalReason::RetriesExhausted)
            } else {
                None
            };

            if let Some(reason) = reason {
                error!(
                    attempt = attempt.number,
                    status_code,
                    "Giving up on Stripe call ({}): {}",
                    reason,
                    err
                );
                return Err(InternalFailure::new(reason, attempt.number, err).into());
            }

            let delay = self.next_delay(&mut backoff);
            warn!(
                attempt = attempt.number,
                status_code,
                "Retrying Stripe call in {:?} ({} retries left)",
                delay,
                attempt.retries_left
            );
            sleep(delay).await;
            attempt = attempt.next();
        }
    }

    fn next_delay(&self, backoff: &mut ExponentialBackoff) -> Duration {
        backoff
            .next_backoff()
            .unwrap_or_else(|| self.config.max_interval())
    }
}
