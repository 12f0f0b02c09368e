//! The server-owned mining session, as the client sees it.

use edumine_types::{CoinAmount, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::{compute_snapshot, AccrualSnapshot, MiningState};

/// Length of one mining session. The backend stamps `ends_at` with it.
pub const SESSION_DURATION: Duration = Duration::from_secs(12 * 3600);

/// Read-only projection of the backend's mining session.
///
/// `ends_at` is present iff `started_at` is. The client never derives
/// `ends_at` itself; it is whatever the backend reported.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningSession {
    pub started_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    /// Coins payable in full at completion. May change between sessions.
    pub reward_total: CoinAmount,
}

impl MiningSession {
    /// A session that has never been started.
    pub fn idle(reward_total: CoinAmount) -> Self {
        Self {
            started_at: None,
            ends_at: None,
            reward_total,
        }
    }

    /// A session as the backend creates it on "start mining".
    pub fn started(started_at: Timestamp, reward_total: CoinAmount) -> Self {
        Self {
            started_at: Some(started_at),
            ends_at: Some(started_at.saturating_add(SESSION_DURATION)),
            reward_total,
        }
    }

    /// Derive progress, accrual and claimability at `now`.
    pub fn snapshot(&self, now: Timestamp) -> AccrualSnapshot {
        compute_snapshot(self.started_at, self.ends_at, self.reward_total, now)
    }

    pub fn state(&self, now: Timestamp) -> MiningState {
        self.snapshot(now).state
    }

    /// Check the shape invariants a well-formed snapshot satisfies.
    ///
    /// Used by backend adapters when decoding; the engine itself never calls this.
    pub fn check_invariants(&self) -> Result<(), String> {
        match (self.started_at, self.ends_at) {
            (None, None) => Ok(()),
            (Some(_), None) => Err("started_at is set but ends_at is missing".into()),
            (None, Some(_)) => Err("ends_at is set but started_at is missing".into()),
            (Some(started), Some(ends)) if ends <= started => Err(format!(
                "ends_at {ends} is not after started_at {started}"
            )),
            (Some(_), Some(_)) => Ok(()),
        }
    }

    /// Length of the session as reported, if one has been started.
    pub fn span(&self) -> Option<Duration> {
        match (self.started_at, self.ends_at) {
            (Some(started), Some(ends)) => Some(started.remaining_from(ends)),
            _ => None,
        }
    }
}

/// Lifetime aggregates maintained by the backend.
///
/// Opaque to the client: it never recomputes them or infers when
/// `today_mined` resets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningTotals {
    pub today_mined: CoinAmount,
    pub total_mined: CoinAmount,
}

/// Acknowledgement returned by a successful claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub claimed: CoinAmount,
}
