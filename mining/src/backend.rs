//! Capability interface to the backend that owns mining sessions.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::session::{ClaimReceipt, MiningSession, MiningTotals};

/// What the client needs from the backend, independent of how it is reached.
///
/// The backend is the only writer of session state. `request_start` and
/// `request_claim` only ask it to act; callers re-fetch the snapshot
/// afterwards instead of transitioning anything locally.
#[async_trait]
pub trait MiningBackend: Send + Sync {
    /// Current session projection for the signed-in user.
    async fn fetch_snapshot(&self) -> Result<MiningSession, BackendError>;

    /// Ask the backend to start a new session.
    async fn request_start(&self) -> Result<(), BackendError>;

    /// Ask the backend to pay out a completed session and reset it.
    async fn request_claim(&self) -> Result<ClaimReceipt, BackendError>;

    /// Lifetime aggregates (today / all time).
    async fn fetch_totals(&self) -> Result<MiningTotals, BackendError>;

    /// Human-readable name of this backend, for logs.
    fn name(&self) -> &str;
}
