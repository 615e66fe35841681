//! Thin handle to the Stripe HTTP API.
//!
//! The handle is built once from a [`StripeConfig`] and cloned freely: the
//! underlying `reqwest::Client` pools connections and the credential sits
//! behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stripekit_config::StripeConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::StripeError;
use crate::models::{Balance, CheckoutSession, CheckoutSessionParams, StripeErrorEnvelope};

struct ClientInner {
    api_key: String,
    api_base: String,
    api_version: Option<String>,
}

/// Remote client handle. Stateless beyond its credential, safe to share across tasks.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    inner: Arc<ClientInner>,
}

impl fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.inner.api_base)
            .field("api_version", &self.inner.api_version)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("stripekit/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            inner: Arc::new(ClientInner {
                api_key: config.api_key.clone(),
                api_base: config.api_base.trim_end_matches('/').to_string(),
                api_version: config.api_version.clone(),
            }),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.inner.api_base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.inner.api_base, path.trim_start_matches('/'));
        let builder = self
            .http
            .request(method, url)
            .bearer_auth(&self.inner.api_key);
        match &self.inner.api_version {
            Some(version) => builder.header("Stripe-Version", version),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, StripeError> {
        let response = builder.send().await?;
        let status = response.status();

        debug!("[Stripe Client] Stripe API response status: {}", status);

        if !status.is_success() {
            // The status alone decides retryability, so a lost body must not hide it.
            let body_text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!("[Stripe Client] Failed to read {} response body: {}", status, e);
                    String::new()
                }
            };
            return Err(api_error(status.as_u16(), body_text));
        }

        let body_text = response.text().await?;
        Ok(serde_json::from_str(&body_text)?)
    }

    /// `GET {api_base}/{path}` with query parameters.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StripeError> {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    /// Form-encoded POST with a fresh idempotency key.
    pub async fn post_form<T, F>(&self, path: &str, form: &F) -> Result<T, StripeError>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        let key = Uuid::new_v4().to_string();
        self.post_form_idempotent(path, form, &key).await
    }

    /// Form-encoded POST with a caller-chosen idempotency key.
    ///
    /// Reusing one key across every attempt of a retried call makes Stripe
    /// replay the first successful result instead of performing the action twice.
    pub async fn post_form_idempotent<T, F>(
        &self,
        path: &str,
        form: &F,
        idempotency_key: &str,
    ) -> Result<T, StripeError>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        let builder = self
            .request(Method::POST, path)
            .header("Idempotency-Key", idempotency_key)
            .form(form);
        self.send(builder).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, StripeError> {
        self.send(self.request(Method::DELETE, path)).await
    }

    pub async fn retrieve_balance(&self) -> Result<Balance, StripeError> {
        self.get("v1/balance", &[]).await
    }

    /// Creates a Checkout Session under a fresh idempotency key.
    ///
    /// Inside [`execute_with_retry`](crate::StripeService::execute_with_retry)
    /// prefer [`create_checkout_session_idempotent`](Self::create_checkout_session_idempotent),
    /// otherwise every retried attempt may create another session.
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, StripeError> {
        let key = Uuid::new_v4().to_string();
        self.create_checkout_session_idempotent(params, &key).await
    }

    pub async fn create_checkout_session_idempotent(
        &self,
        params: &CheckoutSessionParams,
        idempotency_key: &str,
    ) -> Result<CheckoutSession, StripeError> {
        info!(
            "[Stripe Client] Creating Checkout Session for product '{}'",
            params.product_name
        );
        self.post_form_idempotent("v1/checkout/sessions", &params.to_form(), idempotency_key)
            .await
    }

    pub async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, StripeError> {
        self.get(&format!("v1/checkout/sessions/{}", id), &[]).await
    }
}

/// Build the remote API error from a non-2xx response body.
fn api_error(status_code: u16, body_text: String) -> StripeError {
    match serde_json::from_str::<StripeErrorEnvelope>(&body_text) {
        Ok(envelope) => StripeError::ApiError {
            status_code,
            message: envelope.error.message.unwrap_or(body_text),
            code: envelope.error.code,
            error_type: envelope.error.error_type,
        },
        Err(_) => StripeError::ApiError {
            status_code,
            message: body_text,
            code: None,
            error_type: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> StripeClient {
        let config = StripeConfig::new("sk_test_123")
            .with_api_base(server.url())
            .with_api_version("2024-06-20");
        StripeClient::new(&config).unwrap()
    }

    #[test]
    fn test_api_error_parses_envelope() {
        let err = api_error(
            402,
            r#"{"error":{"message":"Your card was declined.","code":"card_declined","type":"card_error"}}"#
                .to_string(),
        );
        match err {
            StripeError::ApiError { status_code, message, code, error_type } => {
                assert_eq!(status_code, 402);
                assert_eq!(message, "Your card was declined.");
                assert_eq!(code.as_deref(), Some("card_declined"));
                assert_eq!(error_type.as_deref(), Some("card_error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_falls_back_to_raw_body() {
        let err = api_error(502, "<html>Bad Gateway</html>".to_string());
        assert_eq!(err.api_status(), Some(502));
        assert!(err.to_string().contains("<html>Bad Gateway</html>"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = StripeClient::new(&StripeConfig::new("sk_test_secret")).unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("sk_test_secret"));
        assert!(rendered.contains("https://api.stripe.com"));
    }

    #[tokio::test]
    async fn test_retrieve_balance_sends_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/balance")
            .match_header("authorization", "Bearer sk_test_123")
            .match_header("stripe-version", "2024-06-20")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"object":"balance","livemode":false,
                    "available":[{"amount":1200,"currency":"chf"}],"pending":[]}"#,
            )
            .create_async()
            .await;

        let balance = client_for(&server).retrieve_balance().await.unwrap();
        assert_eq!(balance.available[0].amount, 1200);
        assert!(!balance.livemode);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/checkout/sessions/cs_missing")
            .with_status(404)
            .with_body(r#"{"error":{"message":"No such checkout.session","type":"invalid_request_error"}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .retrieve_checkout_session("cs_missing")
            .await
            .unwrap_err();
        assert_eq!(err.api_status(), Some(404));
    }

    #[tokio::test]
    async fn test_post_form_sends_idempotency_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/checkout/sessions")
            .match_header("idempotency-key", "order-42-attempt")
            .match_body(mockito::Matcher::UrlEncoded("mode".into(), "payment".into()))
            .with_status(200)
            .with_body(r#"{"id":"cs_test_1","url":"https://checkout.stripe.com/c/pay/cs_test_1"}"#)
            .create_async()
            .await;

        let params = CheckoutSessionParams {
            success_url: "https://example.com/ok".into(),
            cancel_url: "https://example.com/cancel".into(),
            currency: "chf".into(),
            product_name: "Consultation".into(),
            unit_amount: 5000,
            quantity: 1,
            ..Default::default()
        };
        let session: CheckoutSession = client_for(&server)
            .post_form_idempotent("/v1/checkout/sessions", &params.to_form(), "order-42-attempt")
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_checkout_session_generates_idempotency_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/checkout/sessions")
            .match_header("idempotency-key", mockito::Matcher::Regex("^[0-9a-f-]{36}$".into()))
            .match_body(mockito::Matcher::UrlEncoded(
                "line_items[0][price_data][unit_amount]".into(),
                "2500".into(),
            ))
            .with_status(200)
            .with_body(r#"{"id":"cs_test_2","url":"https://checkout.stripe.com/c/pay/cs_test_2","status":"open"}"#)
            .create_async()
            .await;

        let params = CheckoutSessionParams {
            success_url: "https://example.com/ok".into(),
            cancel_url: "https://example.com/cancel".into(),
            currency: "eur".into(),
            product_name: "Workshop".into(),
            unit_amount: 2500,
            quantity: 1,
            ..Default::default()
        };
        let session = client_for(&server).create_checkout_session(&params).await.unwrap();
        assert_eq!(session.status.as_deref(), Some("open"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_checkout_session_key_is_stable_across_retries() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/v1/checkout/sessions")
            .match_header("idempotency-key", "order-7")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let params = CheckoutSessionParams {
            success_url: "https://example.com/ok".into(),
            cancel_url: "https://example.com/cancel".into(),
            currency: "chf".into(),
            product_name: "Coaching".into(),
            unit_amount: 9000,
            quantity: 1,
            ..Default::default()
        };
        let client = client_for(&server);
        let err = client
            .create_checkout_session_idempotent(&params, "order-7")
            .await
            .unwrap_err();
        assert_eq!(err.api_status(), Some(503));
        failing.assert_async().await;

        let replayed = server
            .mock("POST", "/v1/checkout/sessions")
            .match_header("idempotency-key", "order-7")
            .with_status(200)
            .with_body(r#"{"id":"cs_test_7","url":"https://checkout.stripe.com/c/pay/cs_test_7"}"#)
            .create_async()
            .await;
        let session = client
            .create_checkout_session_idempotent(&params, "order-7")
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_7");
        replayed.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_with_empty_body_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/balance")
            .with_status(503)
            .create_async()
            .await;

        let err = client_for(&server).retrieve_balance().await.unwrap_err();
        match err {
            StripeError::ApiError { status_code, message, .. } => {
                assert_eq!(status_code, 503);
                assert!(message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_truncated_error_body_keeps_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            // Promise more bytes than are sent, then hang up.
            socket
                .write_all(
                    b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 200\r\n\r\n{\"error\":",
                )
                .await
                .unwrap();
            let _ = socket.shutdown().await;
        });

        let config = StripeConfig::new("sk_test_123").with_api_base(format!("http://{}", addr));
        let err = StripeClient::new(&config)
            .unwrap()
            .retrieve_balance()
            .await
            .unwrap_err();
        assert_eq!(err.api_status(), Some(503));
    }

    #[tokio::test]
    async fn test_delete_decodes_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/v1/customers/cus_1")
            .with_status(200)
            .with_body(r#"{"id":"cus_1","object":"customer","deleted":true}"#)
            .create_async()
            .await;

        let deleted: serde_json::Value = client_for(&server).delete("v1/customers/cus_1").await.unwrap();
        assert_eq!(deleted["deleted"], serde_json::Value::Bool(true));
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/balance")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client_for(&server).retrieve_balance().await.unwrap_err();
        assert!(matches!(err, StripeError::ParseError(_)));
        assert_eq!(err.api_status(), None);
    }
}
