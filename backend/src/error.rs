use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    // Construction-time configuration errors
    #[error("Invalid feed reference: {0}")]
    InvalidFeed(String),

    #[error("Decimals lookup failed for asset {0}")]
    DecimalsLookup(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported pair: {base}/{quote}")]
    UnsupportedPair { base: String, quote: String },

    // Data-quality rejections
    #[error("Invalid price: {0}")]
    InvalidPrice(i64),

    #[error("Confidence interval too wide: {confidence} for price {price} (max {max_bps} bps)")]
    ConfidenceTooWide {
        price: u64,
        confidence: u64,
        max_bps: u64,
    },

    #[error("Invalid exponent: {0}")]
    InvalidExponent(i32),

    #[error("Price data is stale: {age}s old (max {max}s)")]
    TooStale { age: u64, max: u64 },

    #[error("Price timestamp {timestamp} is too far ahead of {now}")]
    TooFarAhead { timestamp: i64, now: i64 },

    #[error("Cached price is stale: {age}s old (max {max}s)")]
    CacheStale { age: u64, max: u64 },

    #[error("Price cache has never been updated")]
    PriceNotInitialized,

    #[error("No price data available for feed: {0}")]
    NoPriceData(String),

    // Arithmetic
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Cannot aggregate an empty set of quotes")]
    EmptyQuotes,

    #[error("No adapter produced a quote: {0}")]
    NoQuotes(String),

    // Service-level
    #[error("Unknown oracle: {0}")]
    UnknownOracle(String),

    #[error("No configured pull feed: {0}")]
    UnknownFeed(String),

    #[error("Oracle {0} does not support this operation")]
    UnsupportedOperation(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl OracleError {
    /// True for rejections caused by the feed data itself, which a caller may
    /// retry later or route around.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            OracleError::InvalidPrice(_)
                | OracleError::ConfidenceTooWide { .. }
                | OracleError::InvalidExponent(_)
                | OracleError::TooStale { .. }
                | OracleError::TooFarAhead { .. }
                | OracleError::CacheStale { .. }
                | OracleError::PriceNotInitialized
                | OracleError::NoPriceData(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
