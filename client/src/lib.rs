//! Mining client for the edumine rewards platform.
//!
//! Provides everything a mining view needs:
//! - An HTTP JSON-RPC adapter for the rewards backend
//! - A controller that dispatches `start`/`claim` and re-fetches afterwards
//! - A ticker that recomputes the accrual display on a fixed period
//! - TOML configuration and a teardown signal for long-running tasks

pub mod config;
pub mod controller;
pub mod error;
pub mod rpc;
pub mod shutdown;
pub mod ticker;

pub use config::ClientConfig;
pub use controller::{MiningAction, MiningController, ViewState};
pub use error::ClientError;
pub use rpc::RpcBackend;
pub use shutdown::{ShutdownController, TeardownReason};
pub use ticker::MiningTicker;
