//! HTTP adapter for billing endpoints.
//!
//! - `POST /webhook` - Handle Stripe webhooks
//! - `GET /health` - Liveness check

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookAck};
pub use handlers::{BillingAppState, WebhookApiError, STRIPE_SIGNATURE_HEADER};
pub use routes::{billing_router, webhook_routes};
