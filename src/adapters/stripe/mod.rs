//! Stripe payment provider adapters.
//!
//! - `StripePaymentAdapter`: the REST client used in production
//! - `MockPaymentProvider`: in-process fake for tests

mod mock_payment_provider;
mod stripe_adapter;

pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
