//! Cache-backed adapter
//!
//! For push feeds that deliver signed samples out of band. A sample is
//! ingested by [`CachedFeedAdapter::update_price`] and kept in a single-slot
//! cache; quotes read only the cache.
//!
//! Two independent windows apply:
//! - at ingestion, the sample's own timestamp must lie within
//!   `[now - max_price_staleness, now + max_time_ahead]`
//! - at read time, the cache must be no older than `max_cache_staleness`

use super::{check_feed_id, lookup_scale, PriceOracle};
use crate::{
    error::{OracleError, Result},
    feeds::DecimalsLookup,
    scale::DecimalScale,
    types::{AssetId, AssetPair, OracleDescription, OracleKind, RawPriceSample},
    validator::{
        resolve_direction, sample_age, Check, FeedValidator, IngestionWindow,
        MAX_EXPONENT,
    },
};
use parking_lot::RwLock;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

/// Precision of push feeds that report 8-decimal prices
pub const DEFAULT_FEED_DECIMALS: u8 = 8;

/// Single-slot price cache.
///
/// `Uninitialized` is distinct from any update, so "never updated" cannot be
/// confused with "updated at time zero".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PriceCache {
    Uninitialized,
    Updated {
        price: u64,
        price_timestamp: i64,
        updated_at: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Refreshed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct CachedFeedConfig {
    pub name: String,
    pub feed_id: Pubkey,
    pub pair: AssetPair,
    pub feed_decimals: u8,
    /// Maximum confidence half-width (basis points of the price)
    pub max_conf_width_bps: u64,
    pub max_price_staleness: u64,
    pub max_cache_staleness: u64,
    pub max_time_ahead: u64,
}

pub struct CachedFeedAdapter {
    name: String,
    feed_id: Pubkey,
    pair: AssetPair,
    scale: DecimalScale,
    validator: FeedValidator,
    window: IngestionWindow,
    max_cache_staleness: u64,
    cache: RwLock<PriceCache>,
}

impl CachedFeedAdapter {
    pub fn new(config: CachedFeedConfig, decimals: &dyn DecimalsLookup) -> Result<Self> {
        check_feed_id(&config.feed_id)?;
        if i32::from(config.feed_decimals) > MAX_EXPONENT {
            return Err(OracleError::InvalidConfig(format!(
                "{}: feed_decimals {} out of range",
                config.name, config.feed_decimals
            )));
        }

        let scale = lookup_scale(&config.pair, decimals, config.feed_decimals)?;

        // Samples must come in the feed's fixed precision; the cache stores
        // the bare integer
        let feed_exponent = -i32::from(config.feed_decimals);
        let validator = FeedValidator::from_checks(vec![
            Check::Positive,
            Check::ConfidenceWidth {
                max_bps: config.max_conf_width_bps,
            },
            Check::ExponentBounds {
                min: feed_exponent,
                max: feed_exponent,
            },
        ]);

        Ok(Self {
            name: config.name,
            feed_id: config.feed_id,
            pair: config.pair,
            scale,
            validator,
            window: IngestionWindow {
                max_price_staleness: config.max_price_staleness,
                max_time_ahead: config.max_time_ahead,
            },
            max_cache_staleness: config.max_cache_staleness,
            cache: RwLock::new(PriceCache::Uninitialized),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> PriceCache {
        *self.cache.read()
    }

    /// Ingest a freshly delivered sample.
    ///
    /// Returns `Skipped` without validating anything while the cache is
    /// still within `max_cache_staleness`.
    pub fn update_price(&self, sample: RawPriceSample, now: i64) -> Result<UpdateOutcome> {
        let mut cache = self.cache.write();

        if let PriceCache::Updated { updated_at, .. } = *cache {
            if i128::from(now) < i128::from(updated_at) + i128::from(self.max_cache_staleness) {
                debug!("{}: cache still fresh (updated at {})", self.name, updated_at);
                return Ok(UpdateOutcome::Skipped);
            }
        }

        self.window.check(sample.timestamp, now)?;
        let price = self.validator.validate(&sample, now)?;

        *cache = PriceCache::Updated {
            price: price.price(),
            price_timestamp: price.timestamp(),
            updated_at: now,
        };
        info!(
            "{}: cached price {} from feed {} (signed at {}, stored at {})",
            self.name,
            price.price(),
            self.feed_id,
            price.timestamp(),
            now
        );
        Ok(UpdateOutcome::Refreshed)
    }
}

impl PriceOracle for CachedFeedAdapter {
    fn get_quote(&self, in_amount: u64, base: &AssetId, quote: &AssetId, now: i64) -> Result<u64> {
        let direction = resolve_direction(&self.pair, base, quote)?;

        let (price, price_timestamp, updated_at) = match self.cache() {
            PriceCache::Uninitialized => return Err(OracleError::PriceNotInitialized),
            PriceCache::Updated {
                price,
                price_timestamp,
                updated_at,
            } => (price, price_timestamp, updated_at),
        };

        let age = sample_age(updated_at, now);
        if age > self.max_cache_staleness {
            return Err(OracleError::CacheStale {
                age,
                max: self.max_cache_staleness,
            });
        }

        // Feed decimals are already folded into the scale
        let out = self.scale.convert(in_amount, price, 0, direction)?;
        debug!(
            "{}: {} {} -> {} {} (price signed at {})",
            self.name, in_amount, base, out, quote, price_timestamp
        );
        Ok(out)
    }

    fn description(&self) -> OracleDescription {
        OracleDescription {
            name: self.name.clone(),
            kind: OracleKind::CachedFeed,
            pair: self.pair.clone(),
            max_staleness: self.max_cache_staleness,
            bid_ask: false,
        }
    }
}
