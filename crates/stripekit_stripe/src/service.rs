use std::future::Future;

use stripekit_config::StripeConfig;
use tracing::{debug, info};

use crate::client::StripeClient;
use crate::error::StripeError;
use crate::retry::RetryPolicy;

/// Stripe service exported by [`crate::StripeModule`].
///
/// Owns the one [`StripeClient`] built for the module and the retry policy
/// derived from the same configuration.
#[derive(Debug)]
pub struct StripeService {
    client: StripeClient,
    retry: RetryPolicy,
}

impl StripeService {
    /// Create a new Stripe service. The configuration is taken as is.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = StripeClient::new(config)?;
        info!(
            "StripeService created (api_base: {}, max_attempts: {})",
            client.api_base(),
            config.retry.max_attempts
        );
        Ok(Self {
            client,
            retry: RetryPolicy::new(config.retry.clone()),
        })
    }

    /// Raw client handle for calls that should not be retried.
    pub fn client(&self) -> &StripeClient {
        &self.client
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run `operation` against the client, retrying 5xx and 429 responses.
    ///
    /// * `Ok(T)` as soon as one attempt succeeds.
    /// * The operation's own error, unchanged, when it is not a Stripe API error.
    /// * [`StripeError::Internal`] wrapping the last API error when the status is
    ///   not retryable or the attempt budget is used up.
    ///
    /// ```no_run
    /// # async fn example(service: &stripekit_stripe::StripeService) -> Result<(), stripekit_stripe::StripeError> {
    /// let balance = service
    ///     .execute_with_retry(|client| async move { client.retrieve_balance().await })
    ///     .await?;
    /// # let _ = balance;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute_with_retry<T, F, Fut>(&self, mut operation: F) -> Result<T, StripeError>
    where
        F: FnMut(StripeClient) -> Fut,
        Fut: Future<Output = Result<T, StripeError>>,
    {
        debug!("execute_with_retry");
        let client = &self.client;
        self.retry.run(|| operation(client.clone())).await
    }
}
