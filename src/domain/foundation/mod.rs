//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps and the error vocabulary used across the
//! billing domain and its ports.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::UserId;
pub use timestamp::Timestamp;
