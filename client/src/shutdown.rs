//! Teardown of the live mining view.
//!
//! A live view (the CLI's `watch`) runs a [`MiningTicker`](crate::MiningTicker)
//! next to its render loop. Both stop when the view closes: the user
//! interrupts it, the session it was waiting on becomes claimable, or the
//! caller closes it. The reason travels with the signal so each task can log
//! why it stopped.

use std::fmt;
use tokio::signal;
use tokio::sync::broadcast;

/// Why the live view is closing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownReason {
    /// SIGINT or SIGTERM.
    Signal,
    /// The session being watched became claimable.
    Claimable,
    /// The caller closed the view.
    Closed,
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Signal => "signal",
            Self::Claimable => "session claimable",
            Self::Closed => "view closed",
        })
    }
}

/// Broadcasts the close of a live view to the tasks serving it.
pub struct ShutdownController {
    tx: broadcast::Sender<TeardownReason>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver for the ticker or render loop to `select!` on.
    pub fn subscribe(&self) -> broadcast::Receiver<TeardownReason> {
        self.tx.subscribe()
    }

    /// Close the view. Harmless when nothing is listening.
    pub fn shutdown(&self, reason: TeardownReason) {
        tracing::debug!(%reason, "closing live view");
        let _ = self.tx.send(reason);
    }

    /// Close the view on Ctrl-C or SIGTERM.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!("SIGTERM handler unavailable, Ctrl-C only: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = terminate => {}
        }
        self.shutdown(TeardownReason::Signal);
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
