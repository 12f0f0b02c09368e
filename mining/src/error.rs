//! Errors reported by mining backends.

use thiserror::Error;

/// Failure of a call to the backend that owns mining sessions.
///
/// None of these change the locally displayed session; the caller reports
/// them and the user may retry.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned HTTP {0}")]
    Status(u16),

    #[error("backend rejected request: {0}")]
    Rejected(String),

    #[error("malformed session snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("invalid response: {0}")]
    Decode(String),
}
