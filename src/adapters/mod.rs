//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes for the webhook endpoint
//! - `postgres` - Ledger and user store on PostgreSQL
//! - `memory` - In-memory ledger and user store
//! - `stripe` - Stripe REST client and a mock provider
//! - `email` - Resend notifier and a recording mock

pub mod email;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
