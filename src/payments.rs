//! Payment processor integration: hosted checkout session creation and the
//! verified confirmation callback.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::types::order::Cents;

/// Event type the processor sends when a hosted session is paid.
const SESSION_COMPLETED_EVENT: &str = "checkout.session.completed";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("processor rejected the request: {0}")]
    Rejected(String),

    #[error("processor returned no redirect url")]
    MissingRedirectUrl,

    #[error("invalid confirmation token")]
    InvalidToken,

    #[error("malformed confirmation event: {0}")]
    MalformedEvent(String),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidToken => AppError::Unauthorized,
            other => AppError::Payment(other.to_string()),
        }
    }
}

/// One line of a hosted checkout session. Quantity is always 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub image: Option<String>,
    pub unit_amount: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct HostedSession {
    pub url: String,
}

/// A payment event that has already passed token verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub order_id: Uuid,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session and return its redirect URL.
    async fn create_checkout_session(
        &self,
        req: &SessionRequest,
    ) -> Result<HostedSession, PaymentError>;

    /// Verify a confirmation callback before anything acts on it.
    fn verify_confirmation(
        &self,
        body: &[u8],
        token: &str,
    ) -> Result<PaymentConfirmation, PaymentError>;
}

/// Form pairs for the create-session call: mode=payment, redirect URLs,
/// order/user metadata, and per-line price data in minor units.
pub fn session_form(req: &SessionRequest, currency: &str) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), req.success_url.clone()),
        ("cancel_url".to_string(), req.cancel_url.clone()),
        ("metadata[order_id]".to_string(), req.order_id.to_string()),
        ("metadata[user_id]".to_string(), req.user_id.to_string()),
    ];
    for (i, line) in req.line_items.iter().enumerate() {
        form.push((format!("line_items[{i}][quantity]"), "1".to_string()));
        form.push((
            format!("line_items[{i}][price_data][currency]"),
            currency.to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            line.unit_amount.to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            line.name.clone(),
        ));
        if let Some(image) = &line.image {
            form.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
    }
    form
}

/// HTTP client for a Stripe-style hosted checkout API.
pub struct HostedCheckout {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    webhook_token: String,
    currency: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    url: Option<String>,
}

#[derive(Deserialize)]
struct ConfirmationEvent {
    #[serde(rename = "type")]
    kind: String,
    order_id: Uuid,
}

impl HostedCheckout {
    pub fn new(
        api_base: &str,
        secret_key: &str,
        webhook_token: &str,
        currency: &str,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            webhook_token: webhook_token.to_string(),
            currency: currency.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckout {
    async fn create_checkout_session(
        &self,
        req: &SessionRequest,
    ) -> Result<HostedSession, PaymentError> {
        let res = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&session_form(req, &self.currency))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(PaymentError::Rejected(res.status().to_string()));
        }
        let session: SessionResponse = res.json().await?;
        match session.url {
            Some(url) => Ok(HostedSession { url }),
            None => Err(PaymentError::MissingRedirectUrl),
        }
    }

    fn verify_confirmation(
        &self,
        body: &[u8],
        token: &str,
    ) -> Result<PaymentConfirmation, PaymentError> {
        if !constant_time_eq(token, &self.webhook_token) {
            return Err(PaymentError::InvalidToken);
        }
        let event: ConfirmationEvent = serde_json::from_slice(body)
            .map_err(|e| PaymentError::MalformedEvent(e.to_string()))?;
        if event.kind != SESSION_COMPLETED_EVENT {
            return Err(PaymentError::MalformedEvent(format!(
                "unexpected event type '{}'",
                event.kind
            )));
        }
        Ok(PaymentConfirmation {
            order_id: event.order_id,
        })
    }
}

/// Constant-time comparison for the callback token check.
#[inline]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
