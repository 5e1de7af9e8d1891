//! HTTP handlers for billing endpoints.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use futures::FutureExt;

use crate::application::handlers::billing::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
use crate::domain::billing::WebhookError;

use super::dto::{ErrorResponse, HealthResponse, WebhookAck};

/// Header carrying Stripe's `t=...,v1=...` signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing HTTP handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub webhook_handler: Arc<HandlePaymentWebhookHandler>,
}

impl BillingAppState {
    pub fn new(webhook_handler: Arc<HandlePaymentWebhookHandler>) -> Self {
        Self { webhook_handler }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhook - Handle Stripe webhook events
///
/// The body is passed on untouched: the signature covers the exact bytes.
/// A panic anywhere in the pipeline is turned into a 500 so Stripe retries.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let handler = Arc::clone(&state.webhook_handler);
    let result = AssertUnwindSafe(async move { handler.handle(cmd).await })
        .catch_unwind()
        .await
        .map_err(|panic| {
            let reason = panic_reason(panic.as_ref());
            tracing::error!(panic = %reason, "Error processing webhook");
            WebhookError::Internal(reason)
        })??;

    let ack = match result {
        HandlePaymentWebhookResult::Processed(_) => WebhookAck::processed(),
        HandlePaymentWebhookResult::AlreadyProcessed { .. } => WebhookAck::duplicate(),
    };
    Ok((StatusCode::OK, Json(ack)))
}

/// GET /health - Liveness check
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(pub WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let body = ErrorResponse::new(self.0.public_message());
        (status, Json(body)).into_response()
    }
}
