//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_stripe_webhook, health, BillingAppState};

/// Create the Stripe webhook router.
///
/// Webhooks carry no user authentication; they are verified via signature.
///
/// # Routes
/// - `POST /webhook` - Handle Stripe webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/webhook", post(handle_stripe_webhook))
}

/// Create the complete billing router, state attached.
///
/// # Routes
/// - `POST /webhook` - Handle Stripe webhooks
/// - `GET /health` - Liveness check
pub fn billing_router(state: BillingAppState) -> Router {
    Router::new()
        .merge(webhook_routes())
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::adapters::email::MockNotifier;
    use crate::adapters::memory::{InMemoryProcessedEventLedger, InMemoryUserSubscriptionStore};
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::application::handlers::billing::{HandlePaymentWebhookHandler, WebhookSettings};
    use crate::domain::billing::{sign_payload, StripeEventBuilder};

    const SECRET: &str = "whsec_router_test";

    fn router(secret: &str) -> Router {
        let handler = HandlePaymentWebhookHandler::new(
            Arc::new(InMemoryProcessedEventLedger::new()),
            Arc::new(InMemoryUserSubscriptionStore::new()),
            Arc::new(MockPaymentProvider::new()),
            Arc::new(MockNotifier::new()),
            WebhookSettings::new(secret),
        );
        billing_router(BillingAppState::new(Arc::new(handler)))
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = router(SECRET)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn signed_webhook_is_acknowledged() {
        let payload = StripeEventBuilder::new()
            .event_type("customer.created")
            .to_json();
        let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), payload.as_bytes());

        let response = router(SECRET)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("Stripe-Signature", signature)
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_on_webhook_is_method_not_allowed() {
        let response = router(SECRET)
            .oneshot(Request::builder().uri("/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
