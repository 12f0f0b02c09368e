//! Timestamp type used throughout the client.
//!
//! Timestamps are Unix epoch milliseconds (UTC). The backend speaks RFC 3339
//! strings on the wire; they are parsed into this type at the adapter boundary
//! and never carried around as text.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::EdumineError;

/// A Unix timestamp in milliseconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A system clock set before the epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Parse an ISO 8601 timestamp such as `2024-05-01T08:00:00.000Z`.
    ///
    /// Strings without an offset (`2024-05-01T08:00:00`, as sent for
    /// `timestamp without time zone` columns) are read as UTC. A space may
    /// stand in for the `T` separator in that form.
    pub fn parse_rfc3339(s: &str) -> Result<Self, EdumineError> {
        let millis = match DateTime::parse_from_rfc3339(s) {
            Ok(parsed) => parsed.timestamp_millis(),
            Err(e) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|naive| naive.and_utc().timestamp_millis())
                .map_err(|_| EdumineError::InvalidTimestamp(format!("{s}: {e}")))?,
        };
        if millis < 0 {
            return Err(EdumineError::InvalidTimestamp(format!(
                "{s}: before the Unix epoch"
            )));
        }
        Ok(Self(millis as u64))
    }

    /// Render as RFC 3339 with millisecond precision and a `Z` suffix.
    pub fn to_rfc3339(&self) -> String {
        let millis = self.0.min(i64::MAX as u64) as i64;
        match Utc.timestamp_millis_opt(millis).single() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => format!("{}ms", self.0),
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed since this timestamp (relative to `now`), zero if `now` is earlier.
    pub fn elapsed_since(&self, now: Timestamp) -> Duration {
        Duration::from_millis(now.0.saturating_sub(self.0))
    }

    /// Time from `now` until this timestamp, zero if it has already passed.
    pub fn remaining_from(&self, now: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(now.0))
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = duration.as_millis().min(u64::MAX as u128) as u64;
        Self(self.0.saturating_add(millis))
    }

    pub fn saturating_sub(self, duration: Duration) -> Self {
        let millis = duration.as_millis().min(u64::MAX as u128) as u64;
        Self(self.0.saturating_sub(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}
