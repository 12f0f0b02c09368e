//! Nullable mining backend, an in-memory stand-in for the real server.
//!
//! Behaves like the backend's stored procedures: `start` stamps a session at
//! the clock's current time, `claim` pays out a finished session into the
//! lifetime totals and resets to idle. Every call is recorded, individual
//! calls can be scripted to fail, and requests can be held open to observe
//! the client while an action is outstanding.

use async_trait::async_trait;
use edumine_mining::{
    BackendError, ClaimReceipt, MiningBackend, MiningSession, MiningState, MiningTotals,
};
use edumine_types::{Clock, CoinAmount};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// The kinds of request a backend receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendCall {
    FetchSnapshot,
    Start,
    Claim,
    FetchTotals,
}

struct ServerState {
    session: MiningSession,
    totals: MiningTotals,
    reward_per_session: CoinAmount,
}

/// A programmable in-memory mining backend.
pub struct NullBackend {
    clock: Arc<dyn Clock>,
    state: Mutex<ServerState>,
    calls: Mutex<Vec<BackendCall>>,
    failures: Mutex<HashMap<BackendCall, BackendError>>,
    held: AtomicBool,
    release: Notify,
}

impl NullBackend {
    /// Create an idle backend whose sessions pay `reward_per_session`.
    pub fn new(clock: Arc<dyn Clock>, reward_per_session: CoinAmount) -> Self {
        Self {
            clock,
            state: Mutex::new(ServerState {
                session: MiningSession::idle(reward_per_session),
                totals: MiningTotals::default(),
                reward_per_session,
            }),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            held: AtomicBool::new(false),
            release: Notify::new(),
        }
    }

    /// Replace the stored session (e.g. to start a test mid-session).
    pub fn set_session(&self, session: MiningSession) {
        self.state.lock().unwrap().session = session;
    }

    pub fn session(&self) -> MiningSession {
        self.state.lock().unwrap().session.clone()
    }

    pub fn set_totals(&self, totals: MiningTotals) {
        self.state.lock().unwrap().totals = totals;
    }

    pub fn totals(&self) -> MiningTotals {
        self.state.lock().unwrap().totals
    }

    /// Change the reward for sessions started from now on.
    pub fn set_reward_per_session(&self, reward: CoinAmount) {
        self.state.lock().unwrap().reward_per_session = reward;
    }

    /// Make the next call of this kind fail with `error`.
    pub fn fail_next(&self, call: BackendCall, error: BackendError) {
        self.failures.lock().unwrap().insert(call, error);
    }

    /// Hold every subsequent request open until [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let held requests complete.
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, call: BackendCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    /// Clear the call log.
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    async fn enter(&self, call: BackendCall) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call);
        loop {
            let released = self.release.notified();
            if !self.held.load(Ordering::SeqCst) {
                break;
            }
            released.await;
        }
        match self.failures.lock().unwrap().remove(&call) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MiningBackend for NullBackend {
    async fn fetch_snapshot(&self) -> Result<MiningSession, BackendError> {
        self.enter(BackendCall::FetchSnapshot).await?;
        Ok(self.session())
    }

    async fn request_start(&self) -> Result<(), BackendError> {
        self.enter(BackendCall::Start).await?;
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        if state.session.started_at.is_some() {
            return Err(BackendError::Rejected("a session is already running".into()));
        }
        state.session = MiningSession::started(now, state.reward_per_session);
        Ok(())
    }

    async fn request_claim(&self) -> Result<ClaimReceipt, BackendError> {
        self.enter(BackendCall::Claim).await?;
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        if state.session.state(now) != MiningState::Claimable {
            return Err(BackendError::Rejected("no completed session to claim".into()));
        }
        let claimed = state.session.reward_total;
        state.totals.today_mined = state.totals.today_mined.saturating_add(claimed);
        state.totals.total_mined = state.totals.total_mined.saturating_add(claimed);
        state.session = MiningSession::idle(state.reward_per_session);
        Ok(ClaimReceipt { claimed })
    }

    async fn fetch_totals(&self) -> Result<MiningTotals, BackendError> {
        self.enter(BackendCall::FetchTotals).await?;
        Ok(self.totals())
    }

    fn name(&self) -> &str {
        "null-backend"
    }
}
