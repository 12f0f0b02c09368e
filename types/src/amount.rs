//! Coin amounts.
//!
//! Amounts are fixed-point integers (u128) to keep accrual arithmetic exact.
//! The smallest unit is 1 raw; one coin is [`COIN_UNIT`] raw.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EdumineError;

/// Raw units per whole coin (8 fractional digits).
pub const COIN_UNIT: u128 = 100_000_000;

/// Number of fractional digits carried by [`COIN_UNIT`].
pub const COIN_DECIMALS: u32 = 8;

/// A non-negative coin amount, stored as raw units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CoinAmount(u128);

impl CoinAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole coins to raw units.
    pub fn from_coins(coins: u128) -> Self {
        Self(coins.saturating_mul(COIN_UNIT))
    }

    /// Convert a decimal coin value as sent by the backend (a JSON number).
    ///
    /// Rounds to the nearest raw unit. Negative, NaN and infinite values are rejected.
    pub fn from_decimal(coins: f64) -> Result<Self, EdumineError> {
        if !coins.is_finite() || coins < 0.0 {
            return Err(EdumineError::InvalidAmount(coins.to_string()));
        }
        let raw = (coins * COIN_UNIT as f64).round();
        if raw >= u128::MAX as f64 {
            return Err(EdumineError::InvalidAmount(coins.to_string()));
        }
        Ok(Self(raw as u128))
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Whole coins, truncating any fractional part.
    pub fn whole_coins(&self) -> u128 {
        self.0 / COIN_UNIT
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Render with exactly `decimals` fractional digits, truncating the rest.
    ///
    /// `decimals` is capped at [`COIN_DECIMALS`]. Zero decimals renders the
    /// whole-coin part only.
    pub fn to_decimal_string(&self, decimals: u32) -> String {
        let decimals = decimals.min(COIN_DECIMALS);
        let whole = self.0 / COIN_UNIT;
        if decimals == 0 {
            return whole.to_string();
        }
        let frac = (self.0 % COIN_UNIT) / 10u128.pow(COIN_DECIMALS - decimals);
        format!("{whole}.{frac:0width$}", width = decimals as usize)
    }
}

impl fmt::Display for CoinAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} coins", self.to_decimal_string(COIN_DECIMALS))
    }
}
