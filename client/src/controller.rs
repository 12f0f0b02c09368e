//! Mining controller: owns the displayed session and dispatches actions.
//!
//! The backend is the only writer of session state. The controller holds the
//! last snapshot it fetched, asks the backend to `start` or `claim`, and only
//! replaces its snapshot with what the backend returns on the following
//! re-fetch. A failed action leaves the displayed session exactly as it was.
//!
//! Fetches are numbered when issued. A reply that lands after a newer one has
//! already been shown is dropped, so a slow refresh cannot roll the view back.
//!
//! At most one action is outstanding at a time. A second `start`/`claim`
//! while one is in flight is refused immediately, the way a disabled button
//! would be, and never reaches the backend.

use edumine_mining::{
    AccrualSnapshot, BackendError, ClaimReceipt, MiningBackend, MiningSession, MiningState, MiningTotals,
};
use edumine_types::{CoinAmount, Timestamp};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::ClientError;

/// A user-triggered request to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningAction {
    Start,
    Claim,
}

impl MiningAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Claim => "claim",
        }
    }

    /// The session state in which this action is offered.
    fn required_state(&self) -> MiningState {
        match self {
            Self::Start => MiningState::Idle,
            Self::Claim => MiningState::Claimable,
        }
    }
}

impl fmt::Display for MiningAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the view currently shows, as last confirmed by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub session: MiningSession,
    /// `None` until the first successful totals fetch.
    pub totals: Option<MiningTotals>,
    /// Acknowledgement of the most recent successful claim.
    pub last_claim: Option<ClaimReceipt>,
}

/// Clears the in-flight slot when the action finishes, successfully or not.
struct ActionGuard<'a> {
    slot: &'a Mutex<Option<MiningAction>>,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Issue order of fetches of one kind, and the newest one shown so far.
#[derive(Default)]
struct FetchSequence {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl FetchSequence {
    fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Mark `seq` as shown unless a newer reply already was.
    /// Callers hold the view write lock.
    fn try_apply(&self, seq: u64) -> bool {
        self.applied.fetch_max(seq, Ordering::SeqCst) < seq
    }
}

pub struct MiningController {
    backend: Arc<dyn MiningBackend>,
    view: RwLock<ViewState>,
    in_flight: Mutex<Option<MiningAction>>,
    session_seq: FetchSequence,
    totals_seq: FetchSequence,
}

impl MiningController {
    /// Create a controller showing an idle session until [`load`](Self::load) runs.
    pub fn new(backend: Arc<dyn MiningBackend>) -> Self {
        Self {
            backend,
            view: RwLock::new(ViewState {
                session: MiningSession::idle(CoinAmount::ZERO),
                ..Default::default()
            }),
            in_flight: Mutex::new(None),
            session_seq: FetchSequence::default(),
            totals_seq: FetchSequence::default(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Fetch both the session and the lifetime totals.
    pub async fn load(&self) -> Result<(), ClientError> {
        self.refresh_session().await?;
        self.refresh_totals().await?;
        Ok(())
    }

    /// Re-fetch the session snapshot and show it.
    ///
    /// Returns the session shown afterwards, which is newer than the reply
    /// if another fetch overtook this one.
    pub async fn refresh_session(&self) -> Result<MiningSession, ClientError> {
        Ok(self.fetch_session().await?)
    }

    /// Re-fetch the lifetime totals and show them.
    pub async fn refresh_totals(&self) -> Result<MiningTotals, ClientError> {
        Ok(self.fetch_totals().await?)
    }

    pub fn view(&self) -> ViewState {
        self.read_view().clone()
    }

    pub fn session(&self) -> MiningSession {
        self.read_view().session.clone()
    }

    pub fn totals(&self) -> Option<MiningTotals> {
        self.read_view().totals
    }

    /// Derived accrual for the displayed session at `now`.
    pub fn snapshot(&self, now: Timestamp) -> AccrualSnapshot {
        self.read_view().session.snapshot(now)
    }

    /// The action currently awaiting the backend, if any.
    pub fn pending_action(&self) -> Option<MiningAction> {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The action the view should offer at `now`, if any.
    ///
    /// Nothing is offered while a request is outstanding or while the
    /// session is still accruing.
    pub fn available_action(&self, now: Timestamp) -> Option<MiningAction> {
        if self.pending_action().is_some() {
            return None;
        }
        match self.snapshot(now).state {
            MiningState::Idle => Some(MiningAction::Start),
            MiningState::Claimable => Some(MiningAction::Claim),
            MiningState::Active => None,
        }
    }

    /// Ask the backend to start a session, then show the re-fetched snapshot.
    pub async fn start(&self, now: Timestamp) -> Result<MiningSession, ClientError> {
        let _guard = self.begin(MiningAction::Start, now)?;

        if let Err(e) = self.backend.request_start().await {
            tracing::warn!(backend = self.backend.name(), "start failed: {e}");
            return Err(e.into());
        }
        tracing::info!("mining session start accepted");

        let session = self.refetch_after(MiningAction::Start).await?;
        Ok(session)
    }

    /// Ask the backend to pay out a finished session, then show the re-fetched
    /// snapshot and lifetime totals.
    ///
    /// If the claim succeeds but the re-fetch fails, the receipt is still
    /// recorded in [`ViewState::last_claim`] and [`ClientError::Refresh`] is
    /// returned.
    pub async fn claim(&self, now: Timestamp) -> Result<ClaimReceipt, ClientError> {
        let _guard = self.begin(MiningAction::Claim, now)?;

        let receipt = match self.backend.request_claim().await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), "claim failed: {e}");
                return Err(e.into());
            }
        };
        tracing::info!(claimed = %receipt.claimed, "mining reward claimed");
        self.write_view().last_claim = Some(receipt);

        self.refetch_after(MiningAction::Claim).await?;
        if let Err(source) = self.fetch_totals().await {
            return Err(ClientError::Refresh {
                action: MiningAction::Claim,
                source,
            });
        }
        Ok(receipt)
    }

    fn begin(&self, action: MiningAction, now: Timestamp) -> Result<ActionGuard<'_>, ClientError> {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = *slot {
            tracing::debug!(%action, %current, "action refused while another is in flight");
            return Err(ClientError::ActionInFlight(current));
        }

        let state = self.snapshot(now).state;
        if state != action.required_state() {
            return Err(ClientError::ActionUnavailable { action, state });
        }

        *slot = Some(action);
        Ok(ActionGuard {
            slot: &self.in_flight,
        })
    }

    async fn refetch_after(&self, action: MiningAction) -> Result<MiningSession, ClientError> {
        match self.fetch_session().await {
            Ok(session) => Ok(session),
            Err(source) => {
                tracing::warn!(%action, "re-fetch after {action} failed: {source}");
                Err(ClientError::Refresh { action, source })
            }
        }
    }

    async fn fetch_session(&self) -> Result<MiningSession, BackendError> {
        let seq = self.session_seq.next();
        let session = self.backend.fetch_snapshot().await?;

        let mut view = self.write_view();
        if self.session_seq.try_apply(seq) {
            tracing::debug!(
                seq,
                started_at = ?session.started_at,
                ends_at = ?session.ends_at,
                reward_total = %session.reward_total,
                "session refreshed"
            );
            view.session = session;
        } else {
            tracing::debug!(seq, "dropping stale session reply");
        }
        Ok(view.session.clone())
    }

    async fn fetch_totals(&self) -> Result<MiningTotals, BackendError> {
        let seq = self.totals_seq.next();
        let totals = self.backend.fetch_totals().await?;

        let mut view = self.write_view();
        if self.totals_seq.try_apply(seq) {
            view.totals = Some(totals);
        } else {
            tracing::debug!(seq, "dropping stale totals reply");
        }
        Ok(view.totals.unwrap_or(totals))
    }

    fn read_view(&self) -> std::sync::RwLockReadGuard<'_, ViewState> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_view(&self) -> std::sync::RwLockWriteGuard<'_, ViewState> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_required_states() {
        assert_eq!(MiningAction::Start.required_state(), MiningState::Idle);
        assert_eq!(MiningAction::Claim.required_state(), MiningState::Claimable);
        assert_eq!(MiningAction::Claim.to_string(), "claim");
    }

    #[test]
    fn fetch_sequence_drops_older_replies() {
        let seq = FetchSequence::default();
        let first = seq.next();
        let second = seq.next();
        assert!(seq.try_apply(second));
        assert!(!seq.try_apply(first));
        assert!(seq.try_apply(seq.next()));
    }

    #[test]
    fn new_controller_shows_idle_session() {
        struct Unreachable;

        #[async_trait::async_trait]
        impl MiningBackend for Unreachable {
            async fn fetch_snapshot(&self) -> Result<MiningSession, edumine_mining::BackendError> {
                Err(edumine_mining::BackendError::Transport("offline".into()))
            }
            async fn request_start(&self) -> Result<(), edumine_mining::BackendError> {
                Err(edumine_mining::BackendError::Transport("offline".into()))
            }
            async fn request_claim(&self) -> Result<ClaimReceipt, edumine_mining::BackendError> {
                Err(edumine_mining::BackendError::Transport("offline".into()))
            }
            async fn fetch_totals(&self) -> Result<MiningTotals, edumine_mining::BackendError> {
                Err(edumine_mining::BackendError::Transport("offline".into()))
            }
            fn name(&self) -> &str {
                "unreachable"
            }
        }

        let controller = MiningController::new(Arc::new(Unreachable));
        let now = Timestamp::from_secs(1);
        assert!(controller.snapshot(now).is_idle());
        assert_eq!(controller.available_action(now), Some(MiningAction::Start));
        assert_eq!(controller.totals(), None);
        assert_eq!(controller.backend_name(), "unreachable");
    }
}
