//! Accrual snapshot computation.
//!
//! Everything here is a pure function of the session projection and `now`.
//! All reward arithmetic is integer (raw coin units × milliseconds), so the
//! accrued value is exact at the start and end of a session and monotonic
//! in between.

use edumine_types::{CoinAmount, Timestamp};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Where a session is in its lifecycle at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningState {
    /// No session has been started.
    Idle,
    /// `now < ends_at`; reward is accruing.
    Active,
    /// `now >= ends_at`; the full reward can be claimed.
    Claimable,
}

impl MiningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Claimable => "claimable",
        }
    }
}

impl fmt::Display for MiningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived view of a session at one instant. Never stored or sent anywhere.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccrualSnapshot {
    pub state: MiningState,
    pub reward_total: CoinAmount,
    /// `min(now, ends_at) − started_at`, clamped to the session span.
    pub elapsed: Duration,
    /// In `[0, 1]`.
    pub progress_fraction: f64,
    /// In `[0, reward_total]`; exactly `reward_total` once claimable.
    pub accrued_reward: CoinAmount,
    /// `ends_at − now` while active, zero otherwise.
    pub remaining: Duration,
}

impl AccrualSnapshot {
    fn idle(reward_total: CoinAmount) -> Self {
        Self {
            state: MiningState::Idle,
            reward_total,
            elapsed: Duration::ZERO,
            progress_fraction: 0.0,
            accrued_reward: CoinAmount::ZERO,
            remaining: Duration::ZERO,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == MiningState::Idle
    }

    pub fn is_active(&self) -> bool {
        self.state == MiningState::Active
    }

    pub fn is_claimable(&self) -> bool {
        self.state == MiningState::Claimable
    }
}

/// Compute the accrual snapshot of a session at `now`.
///
/// `ends_at` must be present iff `started_at` is, and must be after it. A
/// pair that breaks this is not repaired: a half-present pair reads as idle,
/// and a zero-length span reads as fully accrued once `now >= ends_at` and as
/// nothing accrued before that. This function never panics.
pub fn compute_snapshot(
    started_at: Option<Timestamp>,
    ends_at: Option<Timestamp>,
    reward_total: CoinAmount,
    now: Timestamp,
) -> AccrualSnapshot {
    let (started_at, ends_at) = match (started_at, ends_at) {
        (Some(started_at), Some(ends_at)) => (started_at, ends_at),
        _ => return AccrualSnapshot::idle(reward_total),
    };

    let span_ms = ends_at.as_millis().saturating_sub(started_at.as_millis());
    let elapsed_ms = (started_at.elapsed_since(now.min(ends_at)).as_millis() as u64).min(span_ms);
    let claimable = now >= ends_at;

    let progress_fraction = if span_ms == 0 {
        if claimable {
            1.0
        } else {
            0.0
        }
    } else {
        (elapsed_ms as f64 / span_ms as f64).clamp(0.0, 1.0)
    };

    let accrued_reward = if claimable {
        reward_total
    } else {
        accrue(reward_total, elapsed_ms, span_ms)
    };

    AccrualSnapshot {
        state: if claimable {
            MiningState::Claimable
        } else {
            MiningState::Active
        },
        reward_total,
        elapsed: Duration::from_millis(elapsed_ms),
        progress_fraction,
        accrued_reward,
        remaining: if claimable {
            Duration::ZERO
        } else {
            ends_at.remaining_from(now)
        },
    }
}

/// `reward_total × elapsed / span`, floored to a raw unit and capped at `reward_total`.
fn accrue(reward_total: CoinAmount, elapsed_ms: u64, span_ms: u64) -> CoinAmount {
    if span_ms == 0 || elapsed_ms == 0 {
        return CoinAmount::ZERO;
    }
    let raw = reward_total.raw();
    let accrued = match raw.checked_mul(elapsed_ms as u128) {
        Some(product) => product / span_ms as u128,
        // Only reachable for totals beyond ~10^22 coins.
        None => (raw / span_ms as u128).saturating_mul(elapsed_ms as u128),
    };
    CoinAmount::new(accrued.min(raw))
}
