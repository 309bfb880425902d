//! Price adapters
//!
//! One adapter per feed family turns an untrusted feed into quotes for a
//! single configured pair (and its inverse):
//!
//! ```text
//! feed sample → FeedValidator → DecimalScale → out amount
//! ```
//!
//! Every adapter implements [`PriceOracle`]. Adapters whose feed reports a
//! confidence band additionally expose [`BidAskOracle`] through
//! [`PriceOracle::as_bid_ask`].

pub mod cached;
pub mod cross;
pub mod pull;

pub use cached::{CachedFeedAdapter, CachedFeedConfig, PriceCache, UpdateOutcome};
pub use cross::CrossAdapter;
pub use pull::{PullFeedAdapter, PullFeedConfig};

use crate::{
    error::{OracleError, Result},
    feeds::DecimalsLookup,
    scale::DecimalScale,
    types::{AssetId, AssetPair, BidAsk, OracleDescription},
};
use solana_sdk::pubkey::Pubkey;

/// Single-value quoting, implemented by every adapter
pub trait PriceOracle: Send + Sync {
    /// Amount of `quote` equivalent to `in_amount` of `base` at time `now`
    fn get_quote(&self, in_amount: u64, base: &AssetId, quote: &AssetId, now: i64) -> Result<u64>;

    fn description(&self) -> OracleDescription;

    fn as_bid_ask(&self) -> Option<&dyn BidAskOracle> {
        None
    }
}

/// Two-sided quoting from a confidence band
pub trait BidAskOracle {
    fn get_quotes(&self, in_amount: u64, base: &AssetId, quote: &AssetId, now: i64)
        -> Result<BidAsk>;
}

pub(crate) fn check_feed_id(feed_id: &Pubkey) -> Result<()> {
    if *feed_id == Pubkey::default() {
        return Err(OracleError::InvalidFeed(feed_id.to_string()));
    }
    Ok(())
}

/// Look up both assets' decimals and collapse them with the feed precision
pub(crate) fn lookup_scale(
    pair: &AssetPair,
    decimals: &dyn DecimalsLookup,
    feed_decimals: u8,
) -> Result<DecimalScale> {
    let base_decimals = decimals.decimals_of(&pair.base)?;
    let quote_decimals = decimals.decimals_of(&pair.quote)?;
    Ok(DecimalScale::new(base_decimals, quote_decimals, feed_decimals))
}
