//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Webhook verification, typed events and subscription state

pub mod billing;
pub mod foundation;
