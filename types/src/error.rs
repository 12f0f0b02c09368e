//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for values crossing the backend boundary.
#[derive(Debug, Error)]
pub enum EdumineError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid coin amount: {0}")]
    InvalidAmount(String),
}
