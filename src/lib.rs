//! todo-billing: Stripe webhook ingestion for the Todo app.
//!
//! Verifies signed Stripe events, drops replays through a processed-event
//! ledger, and applies subscription changes to user records. Failed invoice
//! payments also cancel the subscription at Stripe and notify the customer.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
