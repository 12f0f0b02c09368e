//! Periodic re-evaluation of the accrual display.
//!
//! One timer, one task: every period the ticker reads the clock, recomputes
//! the snapshot of the controller's current session, and publishes it on a
//! `watch` channel. It holds no state of its own beyond the previous state
//! (for logging transitions) and runs until shutdown or until every
//! receiver is gone.

use edumine_mining::{AccrualSnapshot, MiningState};
use edumine_types::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::controller::MiningController;
use crate::shutdown::TeardownReason;

/// A running ticker.
pub struct MiningTicker {
    snapshots: watch::Receiver<AccrualSnapshot>,
    handle: JoinHandle<()>,
}

impl MiningTicker {
    /// Start recomputing every `period` until `shutdown` fires.
    ///
    /// The receiver starts out holding the snapshot at spawn time.
    pub fn spawn(
        controller: Arc<MiningController>,
        clock: Arc<dyn Clock>,
        period: Duration,
        mut shutdown: broadcast::Receiver<TeardownReason>,
    ) -> Self {
        let initial = controller.snapshot(clock.now());
        let mut previous = initial.state;
        let (tx, snapshots) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    reason = shutdown.recv() => {
                        match reason {
                            Ok(reason) => tracing::debug!(%reason, "mining ticker stopping"),
                            Err(_) => tracing::debug!("teardown channel closed, mining ticker stopping"),
                        }
                        break;
                    }
                    _ = interval.tick() => {
                        let snapshot = controller.snapshot(clock.now());
                        if snapshot.state != previous {
                            log_transition(previous, snapshot.state);
                            previous = snapshot.state;
                        }
                        tracing::trace!(
                            state = %snapshot.state,
                            accrued = %snapshot.accrued_reward,
                            "tick"
                        );
                        if tx.send(snapshot).is_err() {
                            tracing::debug!("no snapshot receivers left, stopping ticker");
                            break;
                        }
                    }
                }
            }
        });

        Self { snapshots, handle }
    }

    /// A receiver for published snapshots. Clones share the same stream.
    pub fn subscribe(&self) -> watch::Receiver<AccrualSnapshot> {
        self.snapshots.clone()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> AccrualSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the ticker task to exit.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!("mining ticker task failed: {e}");
        }
    }
}

fn log_transition(from: MiningState, to: MiningState) {
    match to {
        MiningState::Claimable => tracing::info!(%from, "mining session complete, reward claimable"),
        _ => tracing::debug!(%from, %to, "mining state changed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownController;
    use edumine_mining::{MiningBackend, MiningSession, SESSION_DURATION};
    use edumine_nullables::{NullBackend, NullClock};
    use edumine_types::{CoinAmount, Timestamp};

    async fn setup() -> (Arc<NullClock>, Arc<MiningController>) {
        let clock = Arc::new(NullClock::new(Timestamp::from_secs(10_000)));
        let backend = Arc::new(NullBackend::new(clock.clone(), CoinAmount::from_coins(120)));
        backend.set_session(MiningSession::started(
            Timestamp::from_secs(10_000),
            CoinAmount::from_coins(120),
        ));
        let backend: Arc<dyn MiningBackend> = backend;
        let controller = Arc::new(MiningController::new(backend));
        controller.load().await.unwrap();
        (clock, controller)
    }

    #[tokio::test]
    async fn publishes_snapshots_as_the_clock_advances() {
        let (clock, controller) = setup().await;
        let shutdown = ShutdownController::new();
        let ticker = MiningTicker::spawn(
            controller,
            clock.clone(),
            Duration::from_millis(5),
            shutdown.subscribe(),
        );
        assert_eq!(ticker.latest().accrued_reward, CoinAmount::ZERO);

        clock.advance(SESSION_DURATION / 2);
        let mut rx = ticker.subscribe();
        let half = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.unwrap();
                let snap = rx.borrow_and_update().clone();
                if snap.accrued_reward == CoinAmount::from_coins(60) {
                    return snap;
                }
            }
        })
        .await
        .expect("ticker should publish the halfway snapshot");
        assert!(half.is_active());

        clock.advance(SESSION_DURATION);
        let done = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.unwrap();
                let snap = rx.borrow_and_update().clone();
                if snap.is_claimable() {
                    return snap;
                }
            }
        })
        .await
        .expect("ticker should publish the claimable snapshot");
        assert_eq!(done.accrued_reward, CoinAmount::from_coins(120));

        shutdown.shutdown(TeardownReason::Closed);
        tokio::time::timeout(Duration::from_secs(2), ticker.join())
            .await
            .expect("ticker should stop on shutdown");
    }

    #[tokio::test]
    async fn traces_rewards_beyond_u64_raw_units() {
        edumine_utils::init_logging(edumine_utils::LogFormat::Human, "trace");
        let clock = Arc::new(NullClock::new(Timestamp::from_secs(10_000)));
        let huge = CoinAmount::from_coins(1_000_000_000_000);
        assert!(huge.raw() > u64::MAX as u128);
        let backend = Arc::new(NullBackend::new(clock.clone(), huge));
        backend.set_session(MiningSession::started(Timestamp::from_secs(10_000), huge));
        let backend: Arc<dyn MiningBackend> = backend;
        let controller = Arc::new(MiningController::new(backend));
        controller.load().await.unwrap();

        let shutdown = ShutdownController::new();
        let ticker = MiningTicker::spawn(
            controller,
            clock.clone(),
            Duration::from_millis(5),
            shutdown.subscribe(),
        );
        clock.advance(SESSION_DURATION);
        let mut rx = ticker.subscribe();
        let done = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.unwrap();
                let snap = rx.borrow_and_update().clone();
                if snap.is_claimable() {
                    return snap;
                }
            }
        })
        .await
        .expect("ticker should keep publishing large rewards");
        assert_eq!(done.accrued_reward, huge);

        shutdown.shutdown(TeardownReason::Closed);
        ticker.join().await;
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let (clock, controller) = setup().await;
        let shutdown = ShutdownController::new();
        let ticker = MiningTicker::spawn(
            controller,
            clock,
            Duration::from_millis(5),
            shutdown.subscribe(),
        );
        shutdown.shutdown(TeardownReason::Closed);
        tokio::time::timeout(Duration::from_secs(2), ticker.join())
            .await
            .expect("ticker should stop on shutdown");
    }

    #[tokio::test]
    async fn follows_a_refreshed_session() {
        let (clock, controller) = setup().await;
        let shutdown = ShutdownController::new();
        let ticker = MiningTicker::spawn(
            controller.clone(),
            clock.clone(),
            Duration::from_millis(5),
            shutdown.subscribe(),
        );

        clock.advance(SESSION_DURATION);
        controller.claim(clock.now()).await.unwrap();

        let mut rx = ticker.subscribe();
        let idle = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                rx.changed().await.unwrap();
                let snap = rx.borrow_and_update().clone();
                if snap.is_idle() {
                    return snap;
                }
            }
        })
        .await
        .expect("ticker should pick up the idle session after claim");
        assert_eq!(idle.accrued_reward, CoinAmount::ZERO);

        shutdown.shutdown(TeardownReason::Closed);
        ticker.join().await;
    }
}
