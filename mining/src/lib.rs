//! Mining accrual engine.
//!
//! A mining session is owned by the backend; the client only holds a
//! read-only projection of it (`started_at`, `ends_at`, `reward_total`) and
//! derives everything else locally against its own clock:
//!
//! `accrued = reward_total × (min(now, ends_at) − started_at) / (ends_at − started_at)`
//!
//! This crate handles:
//! - The session projection and its derived snapshot (pure, no I/O)
//! - The display-precision policy layered on top of the snapshot
//! - The capability interface a backend adapter implements

pub mod backend;
pub mod display;
pub mod engine;
pub mod error;
pub mod session;

pub use backend::MiningBackend;
pub use engine::{compute_snapshot, AccrualSnapshot, MiningState};
pub use error::BackendError;
pub use session::{ClaimReceipt, MiningSession, MiningTotals, SESSION_DURATION};
