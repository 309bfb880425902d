//! Price oracle adapters and quote aggregation.
//!
//! Adapters validate untrusted feed samples and scale them into token
//! amounts; the aggregator combines several adapters' quotes for one pair.

pub mod adapter;
pub mod api;
pub mod config;
pub mod error;
pub mod feeds;
pub mod price_aggregator;
pub mod registry;
pub mod scale;
pub mod telemetry;
pub mod types;
pub mod validator;

pub use adapter::{BidAskOracle, PriceOracle};
pub use error::{OracleError, Result};
pub use price_aggregator::{aggregate, FailurePolicy, QuoteAggregator, Statistic};
pub use registry::OracleRegistry;
pub use types::{AssetId, AssetPair, BidAsk, RawPriceSample, ValidatedPrice};
