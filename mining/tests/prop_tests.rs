use proptest::prelude::*;
use std::time::Duration;

use edumine_mining::display::format_accrued;
use edumine_mining::{compute_snapshot, MiningSession, MiningState, SESSION_DURATION};
use edumine_types::{CoinAmount, Timestamp, COIN_UNIT};

const SPAN_MS: u64 = 12 * 3600 * 1000;

fn session(start_ms: u64, reward_raw: u128) -> MiningSession {
    MiningSession::started(Timestamp::from_millis(start_ms), CoinAmount::new(reward_raw))
}

proptest! {
    /// A session that was never started is idle with nothing accrued, whatever `now` is.
    #[test]
    fn idle_session_accrues_nothing(
        reward_raw in 0u128..1_000_000 * COIN_UNIT,
        now in 0u64..u64::MAX / 2,
    ) {
        let snap = MiningSession::idle(CoinAmount::new(reward_raw)).snapshot(Timestamp::from_millis(now));
        prop_assert_eq!(snap.state, MiningState::Idle);
        prop_assert!(!snap.is_active());
        prop_assert!(!snap.is_claimable());
        prop_assert_eq!(snap.progress_fraction, 0.0);
        prop_assert_eq!(snap.accrued_reward, CoinAmount::ZERO);
    }

    /// At or before `started_at` nothing has accrued.
    #[test]
    fn nothing_accrued_before_start(
        start in 1_000_000u64..1_000_000_000_000,
        before in 0u64..1_000_000,
        reward_raw in 0u128..1_000_000 * COIN_UNIT,
    ) {
        let s = session(start, reward_raw);
        let snap = s.snapshot(Timestamp::from_millis(start - before));
        prop_assert_eq!(snap.progress_fraction, 0.0);
        prop_assert_eq!(snap.accrued_reward, CoinAmount::ZERO);
    }

    /// At or after `ends_at` the full reward is claimable and progress is exactly 1.
    #[test]
    fn full_reward_at_or_after_end(
        start in 0u64..1_000_000_000_000,
        past_end in 0u64..10 * SPAN_MS,
        reward_raw in 0u128..1_000_000 * COIN_UNIT,
    ) {
        let s = session(start, reward_raw);
        let snap = s.snapshot(Timestamp::from_millis(start + SPAN_MS + past_end));
        prop_assert!(snap.is_claimable());
        prop_assert!(!snap.is_active());
        prop_assert_eq!(snap.progress_fraction, 1.0);
        prop_assert_eq!(snap.accrued_reward, CoinAmount::new(reward_raw));
        prop_assert_eq!(snap.remaining, Duration::ZERO);
        prop_assert_eq!(snap.elapsed, SESSION_DURATION);
    }

    /// Accrual never decreases as time moves forward.
    #[test]
    fn accrual_monotonic(
        start in 0u64..1_000_000_000_000,
        t1 in 0u64..SPAN_MS,
        step in 1u64..SPAN_MS,
        reward_raw in 0u128..1_000_000 * COIN_UNIT,
    ) {
        let s = session(start, reward_raw);
        let t2 = (t1 + step).min(SPAN_MS + 1);
        let a1 = s.snapshot(Timestamp::from_millis(start + t1)).accrued_reward;
        let a2 = s.snapshot(Timestamp::from_millis(start + t2)).accrued_reward;
        prop_assert!(a2 >= a1, "accrual decreased: {} -> {}", a1.raw(), a2.raw());
    }

    /// Progress and accrual stay within their bounds for any instant.
    #[test]
    fn derived_fields_bounded(
        start in 0u64..1_000_000_000_000,
        now in 0u64..2_000_000_000_000,
        reward_raw in 0u128..1_000_000 * COIN_UNIT,
    ) {
        let s = session(start, reward_raw);
        let snap = s.snapshot(Timestamp::from_millis(now));
        prop_assert!((0.0..=1.0).contains(&snap.progress_fraction));
        prop_assert!(snap.accrued_reward <= s.reward_total);
        prop_assert!(snap.elapsed <= SESSION_DURATION);
        prop_assert!(snap.remaining <= SESSION_DURATION + Duration::from_millis(start));
        prop_assert_eq!(snap.is_active(), now < start + SPAN_MS);
        prop_assert_eq!(snap.is_claimable(), now >= start + SPAN_MS);
    }

    /// Just before the end, the accrued value is within one millisecond's
    /// worth of accrual of the total.
    #[test]
    fn continuous_at_end(
        start in 0u64..1_000_000_000_000,
        reward_raw in 1u128..1_000_000 * COIN_UNIT,
    ) {
        let s = session(start, reward_raw);
        let just_before = s.snapshot(Timestamp::from_millis(start + SPAN_MS - 1)).accrued_reward;
        let at_end = s.snapshot(Timestamp::from_millis(start + SPAN_MS)).accrued_reward;
        let per_ms = reward_raw / SPAN_MS as u128 + 1;
        prop_assert!(reward_raw - just_before.raw() <= per_ms);
        prop_assert_eq!(at_end.raw(), reward_raw);
    }

    /// A zero reward accrues nothing at any instant.
    #[test]
    fn zero_reward_never_accrues(
        start in 0u64..1_000_000_000_000,
        now in 0u64..2_000_000_000_000,
    ) {
        let snap = session(start, 0).snapshot(Timestamp::from_millis(now));
        prop_assert_eq!(snap.accrued_reward, CoinAmount::ZERO);
    }

    /// The free function and the session method agree.
    #[test]
    fn session_method_matches_free_function(
        start in 0u64..1_000_000_000_000,
        now in 0u64..2_000_000_000_000,
        reward_raw in 0u128..1_000_000 * COIN_UNIT,
    ) {
        let s = session(start, reward_raw);
        let now = Timestamp::from_millis(now);
        prop_assert_eq!(
            s.snapshot(now),
            compute_snapshot(s.started_at, s.ends_at, s.reward_total, now)
        );
    }

    /// Active sessions display five decimals; claimable ones a whole number.
    #[test]
    fn display_precision_follows_state(
        start in 0u64..1_000_000_000_000,
        offset in 0u64..2 * SPAN_MS,
        coins in 0u128..1_000_000,
    ) {
        let s = session(start, coins * COIN_UNIT);
        let snap = s.snapshot(Timestamp::from_millis(start + offset));
        let rendered = format_accrued(&snap);
        if snap.is_active() {
            let (_, frac) = rendered.split_once('.').expect("active value has a fraction");
            prop_assert_eq!(frac.len(), 5);
        } else {
            prop_assert_eq!(rendered, coins.to_string());
        }
    }
}
