// --- File: crates/stripekit_stripe/src/bin/stripe_probe.rs ---
//! Startup check: compose the Stripe module from the environment and fetch
//! the account balance through the retrying executor.
//!
//! Usage: `STRIPE_API_KEY=sk_test_... stripe_probe`

use std::process::ExitCode;

use stripekit_common::{log_error, log_result, logging, Context};
use stripekit_stripe::StripeModule;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let module = match StripeModule::from_env().context("Stripe module composition failed") {
        Ok(module) => module,
        Err(err) => {
            log_error(&err, "startup");
            return ExitCode::FAILURE;
        }
    };

    let service = module.service();
    let result = service
        .execute_with_retry(|client| async move { client.retrieve_balance().await })
        .await;

    match log_result(result, "Stripe balance retrieved", "Stripe balance check failed") {
        Ok(balance) => {
            for amount in &balance.available {
                info!("available: {} {}", amount.amount, amount.currency);
            }
            for amount in &balance.pending {
                info!("pending: {} {}", amount.amount, amount.currency);
            }
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
