//! Presentation formatting for accrual snapshots.
//!
//! The numeric engine never rounds for display. This layer applies the
//! display-precision policy: while a session is active the accrued reward is
//! shown with [`ACTIVE_DECIMALS`] fractional digits so that it visibly ticks
//! up; once claimable it is shown as a whole number equal to the session's
//! reward.

use edumine_types::CoinAmount;
use edumine_utils::format_countdown;

use crate::engine::{AccrualSnapshot, MiningState};

/// Fractional digits shown while reward is accruing.
pub const ACTIVE_DECIMALS: u32 = 5;

/// Render the accrued reward according to the session state.
pub fn format_accrued(snapshot: &AccrualSnapshot) -> String {
    match snapshot.state {
        MiningState::Active => snapshot.accrued_reward.to_decimal_string(ACTIVE_DECIMALS),
        // Equal to the reward for whole-coin rewards; fractional rewards
        // are rounded half up (2.5 shows as 3).
        MiningState::Claimable => format_whole(snapshot.reward_total),
        MiningState::Idle => format_whole(snapshot.accrued_reward),
    }
}

/// Progress as a percentage with one decimal place, e.g. `"50.0%"`.
pub fn format_progress(snapshot: &AccrualSnapshot) -> String {
    format!("{:.1}%", snapshot.progress_fraction * 100.0)
}

/// Remaining time as `HH:MM:SS`; `00:00:00` unless the session is active.
pub fn format_remaining(snapshot: &AccrualSnapshot) -> String {
    format_countdown(snapshot.remaining)
}

/// A single status line for terminal output.
pub fn status_line(snapshot: &AccrualSnapshot) -> String {
    match snapshot.state {
        MiningState::Idle => format!(
            "idle | next session pays {} coins",
            format_whole(snapshot.reward_total)
        ),
        MiningState::Active => format!(
            "mining | {} / {} coins | {} | {} left",
            format_accrued(snapshot),
            format_whole(snapshot.reward_total),
            format_progress(snapshot),
            format_remaining(snapshot),
        ),
        MiningState::Claimable => format!(
            "claimable | {} coins ready",
            format_accrued(snapshot)
        ),
    }
}

/// Whole coins, rounding half up; fractional rewards are rare but possible.
fn format_whole(amount: CoinAmount) -> String {
    let rounded = amount.saturating_add(CoinAmount::new(edumine_types::COIN_UNIT / 2));
    rounded.whole_coins().to_string()
}
