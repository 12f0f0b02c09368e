//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies (the clock and the mining backend) are abstracted
//! behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod backend;
pub mod clock;

pub use backend::{BackendCall, NullBackend};
pub use clock::NullClock;
