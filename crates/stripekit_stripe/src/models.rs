// --- File: crates/stripekit_stripe/src/models.rs ---
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// --- Data Structures ---

/// Stripe's error envelope: `{"error": {"message": ..., "code": ..., "type": ...}}`.
#[derive(Deserialize, Debug)]
pub(crate) struct StripeErrorEnvelope {
    pub error: StripeErrorBody,
}

#[derive(Deserialize, Debug)]
pub(crate) struct StripeErrorBody {
    pub message: Option<String>,
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

/// One currency bucket of a balance.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BalanceAmount {
    pub amount: i64, // In the smallest currency unit
    pub currency: String,
}

/// `GET /v1/balance`
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Balance {
    pub object: String, // "balance"
    pub livemode: bool,
    #[serde(default)]
    pub available: Vec<BalanceAmount>,
    #[serde(default)]
    pub pending: Vec<BalanceAmount>,
}

/// Parameters for a one-line-item payment Checkout Session.
#[derive(Debug, Clone, Default)]
pub struct CheckoutSessionParams {
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub product_name: String,
    pub unit_amount: i64,
    pub quantity: u32,
    pub client_reference_id: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutSessionParams {
    /// Flatten into Stripe's bracketed form encoding.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form_body: Vec<(String, String)> = vec![
            ("payment_method_types[]".to_string(), "card".to_string()),
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
            (
                "line_items[0][price_data][currency]".to_string(),
                self.currency.to_lowercase(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                self.product_name.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                self.unit_amount.to_string(),
            ),
            ("line_items[0][quantity]".to_string(), self.quantity.max(1).to_string()),
        ];
        if let Some(client_ref_id) = &self.client_reference_id {
            form_body.push(("client_reference_id".to_string(), client_ref_id.clone()));
        }
        for (key, value) in &self.metadata {
            form_body.push((format!("metadata[{}]", key), value.clone()));
        }
        form_body
    }
}

/// The parts of a Checkout Session object we read back.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,                // cs_...
    pub url: Option<String>,
    pub amount_total: Option<i64>, // Total amount in cents
    pub currency: Option<String>,
    pub payment_intent: Option<String>,
    pub payment_status: Option<String>, // "paid", "unpaid", "no_payment_required"
    pub status: Option<String>,         // "open", "complete", "expired"
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}
