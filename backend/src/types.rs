use crate::error::{OracleError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a priced asset (token mint or symbol)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A (base, quote) pair. `base` is the asset being priced, `quote` the unit
/// of account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPair {
    pub base: AssetId,
    pub quote: AssetId,
}

impl AssetPair {
    pub fn new(base: impl Into<AssetId>, quote: impl Into<AssetId>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    pub fn matches(&self, base: &AssetId, quote: &AssetId) -> bool {
        &self.base == base && &self.quote == quote
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// Which way a query walks an adapter's configured pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    pub fn is_inverse(self) -> bool {
        matches!(self, Direction::Inverse)
    }
}

/// A decoded but untrusted price sample as delivered by a feed.
///
/// `value` is an integer in the feed's native precision: the real price is
/// `value * 10^exponent`. `confidence` is the ± half-width of the feed's
/// uncertainty band in the same units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPriceSample {
    pub value: i64,
    #[serde(default)]
    pub confidence: Option<u64>,
    pub exponent: i32,
    pub timestamp: i64,
}

impl From<pyth_sdk_solana::Price> for RawPriceSample {
    fn from(price: pyth_sdk_solana::Price) -> Self {
        Self {
            value: price.price,
            confidence: Some(price.conf),
            exponent: price.expo,
            timestamp: price.publish_time,
        }
    }
}

/// A sample that passed every validation check. Only the validator builds
/// these, so holders can rely on `price > 0` and the configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatedPrice {
    pub(crate) price: u64,
    pub(crate) confidence: Option<u64>,
    pub(crate) exponent: i32,
    pub(crate) timestamp: i64,
}

impl ValidatedPrice {
    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn confidence(&self) -> Option<u64> {
        self.confidence
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Lower and upper ends of the confidence band, `(price, price)` when the
    /// feed reports no band.
    pub fn band(&self) -> (u64, u64) {
        let conf = self.confidence.unwrap_or(0);
        (self.price.saturating_sub(conf), self.price.saturating_add(conf))
    }

    /// Human-readable price, e.g. `12345` with exponent `-2` is `123.45`.
    pub fn to_decimal(&self) -> Result<Decimal> {
        let value = Decimal::from(self.price);
        if self.exponent < 0 {
            let mut scaled = value;
            scaled
                .set_scale(self.exponent.unsigned_abs())
                .map_err(|e| OracleError::ParseError(format!("Decimal scale error: {}", e)))?;
            Ok(scaled)
        } else {
            let multiplier = 10_u64
                .checked_pow(self.exponent as u32)
                .map(Decimal::from)
                .ok_or_else(|| OracleError::Overflow(format!("10^{}", self.exponent)))?;
            value
                .checked_mul(multiplier)
                .ok_or_else(|| OracleError::Overflow(format!("{} * 10^{}", self.price, self.exponent)))
        }
    }
}

/// Two-sided quote from a feed's confidence band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidAsk {
    pub bid: u64,
    pub ask: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    PullFeed,
    CachedFeed,
    Cross,
    Aggregate,
}

/// Metadata every oracle reports about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleDescription {
    pub name: String,
    pub kind: OracleKind,
    pub pair: AssetPair,
    pub max_staleness: u64,
    pub bid_ask: bool,
}
