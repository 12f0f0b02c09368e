//! Fundamental types for the edumine client.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! timestamps, coin amounts, the clock abstraction, and the common error type.

pub mod amount;
pub mod clock;
pub mod error;
pub mod time;

pub use amount::{CoinAmount, COIN_DECIMALS, COIN_UNIT};
pub use clock::{Clock, SystemClock};
pub use error::EdumineError;
pub use time::Timestamp;
