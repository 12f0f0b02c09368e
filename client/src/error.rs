use edumine_mining::{BackendError, MiningState};
use thiserror::Error;

use crate::controller::MiningAction;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("a {0} request is already in flight")]
    ActionInFlight(MiningAction),

    #[error("cannot {action} while the session is {state}")]
    ActionUnavailable {
        action: MiningAction,
        state: MiningState,
    },

    /// The action went through but re-fetching the session afterwards failed.
    #[error("{action} succeeded but refreshing the session failed: {source}")]
    Refresh {
        action: MiningAction,
        #[source]
        source: BackendError,
    },

    #[error("configuration error: {0}")]
    Config(String),
}
