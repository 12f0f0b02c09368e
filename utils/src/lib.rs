//! Shared utilities for the edumine client.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use time::{format_countdown, format_duration};
