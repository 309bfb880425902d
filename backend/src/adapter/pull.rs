use super::{check_feed_id, lookup_scale, BidAskOracle, PriceOracle};
use crate::{
    error::{OracleError, Result},
    feeds::{DecimalsLookup, FeedReader},
    scale::DecimalScale,
    types::{AssetId, AssetPair, BidAsk, Direction, OracleDescription, OracleKind, ValidatedPrice},
    validator::{resolve_direction, FeedValidator, BPS_DENOMINATOR},
};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PullFeedConfig {
    pub name: String,
    pub feed_id: Pubkey,
    pub pair: AssetPair,
    /// Maximum sample age (seconds)
    pub max_staleness: u64,
    /// Maximum confidence half-width (basis points of the price)
    pub max_conf_width_bps: u64,
    /// Maximum forward skew of a sample timestamp (seconds)
    pub max_time_ahead: u64,
}

/// Adapter for pull-updated feeds that publish a price with an exponent and
/// a confidence band per sample (Pyth-style).
///
/// The latest sample is read from the [`FeedReader`] on every query and
/// validated from scratch; nothing is cached here.
pub struct PullFeedAdapter {
    name: String,
    feed_id: Pubkey,
    pair: AssetPair,
    scale: DecimalScale,
    validator: FeedValidator,
    max_time_ahead: u64,
    reader: Arc<dyn FeedReader>,
}

impl PullFeedAdapter {
    pub fn new(
        config: PullFeedConfig,
        reader: Arc<dyn FeedReader>,
        decimals: &dyn DecimalsLookup,
    ) -> Result<Self> {
        check_feed_id(&config.feed_id)?;
        if config.max_conf_width_bps >= BPS_DENOMINATOR {
            return Err(OracleError::InvalidConfig(format!(
                "{}: max_conf_width_bps must be below {}",
                config.name, BPS_DENOMINATOR
            )));
        }

        let scale = lookup_scale(&config.pair, decimals, 0)?;
        debug!(
            "Pull feed {} for {} (feed {}, scale 10^{})",
            config.name,
            config.pair,
            config.feed_id,
            scale.scale_exponent()
        );

        Ok(Self {
            name: config.name,
            feed_id: config.feed_id,
            pair: config.pair,
            scale,
            validator: FeedValidator::new(
                config.max_staleness,
                config.max_conf_width_bps,
                config.max_time_ahead,
            ),
            max_time_ahead: config.max_time_ahead,
            reader,
        })
    }

    pub fn feed_id(&self) -> &Pubkey {
        &self.feed_id
    }

    pub fn max_time_ahead(&self) -> u64 {
        self.max_time_ahead
    }

    fn fetch(&self, base: &AssetId, quote: &AssetId, now: i64) -> Result<(Direction, ValidatedPrice)> {
        let direction = resolve_direction(&self.pair, base, quote)?;
        let sample = self.reader.latest_sample(&self.feed_id)?;
        let price = self.validator.validate(&sample, now)?;
        Ok((direction, price))
    }
}

impl PriceOracle for PullFeedAdapter {
    fn get_quote(&self, in_amount: u64, base: &AssetId, quote: &AssetId, now: i64) -> Result<u64> {
        let (direction, price) = self.fetch(base, quote, now)?;
        let out = self
            .scale
            .convert(in_amount, price.price(), price.exponent(), direction)?;

        debug!(
            "{}: {} {} -> {} {} at {:?}",
            self.name,
            in_amount,
            base,
            out,
            quote,
            price.to_decimal().ok()
        );
        Ok(out)
    }

    fn description(&self) -> OracleDescription {
        OracleDescription {
            name: self.name.clone(),
            kind: OracleKind::PullFeed,
            pair: self.pair.clone(),
            max_staleness: self.validator.max_staleness().unwrap_or_default(),
            bid_ask: true,
        }
    }

    fn as_bid_ask(&self) -> Option<&dyn BidAskOracle> {
        Some(self)
    }
}

impl BidAskOracle for PullFeedAdapter {
    fn get_quotes(
        &self,
        in_amount: u64,
        base: &AssetId,
        quote: &AssetId,
        now: i64,
    ) -> Result<BidAsk> {
        let (direction, price) = self.fetch(base, quote, now)?;
        let (low, high) = price.band();

        let at_low = self.scale.convert(in_amount, low, price.exponent(), direction)?;
        let at_high = self.scale.convert(in_amount, high, price.exponent(), direction)?;

        // An inverse query turns the higher price into the smaller out amount
        Ok(BidAsk {
            bid: at_low.min(at_high),
            ask: at_low.max(at_high),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{InMemoryFeedStore, StaticDecimals};
    use crate::types::RawPriceSample;
    use crate::validator::{DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD};

    const NOW: i64 = 1_700_000_000;

    fn setup(sample: RawPriceSample) -> PullFeedAdapter {
        let store = Arc::new(InMemoryFeedStore::new());
        let feed_id = Pubkey::new_unique();
        store.publish(feed_id, sample);

        let decimals = StaticDecimals::new().with("TKA", 6).with("TKB", 6);
        PullFeedAdapter::new(
            PullFeedConfig {
                name: "pull".to_string(),
                feed_id,
                pair: AssetPair::new("TKA", "TKB"),
                max_staleness: 60,
                max_conf_width_bps: DEFAULT_MAX_CONF_WIDTH_BPS,
                max_time_ahead: DEFAULT_MAX_TIME_AHEAD,
            },
            store,
            &decimals,
        )
        .unwrap()
    }

    fn sample(value: i64, confidence: u64, timestamp: i64) -> RawPriceSample {
        RawPriceSample {
            value,
            confidence: Some(confidence),
            exponent: -2,
            timestamp,
        }
    }

    #[test]
    fn test_mid_and_band_quotes() {
        let adapter = setup(sample(100, 4, NOW));
        let a = AssetId::from("TKA");
        let b = AssetId::from("TKB");

        let mid = adapter.get_quote(1_000_000, &a, &b, NOW).unwrap();
        assert_eq!(mid, 1_000_000);

        let quotes = adapter.as_bid_ask().unwrap().get_quotes(1_000_000, &a, &b, NOW).unwrap();
        assert_eq!(quotes, BidAsk { bid: 960_000, ask: 1_040_000 });
        assert!(quotes.bid <= mid && mid <= quotes.ask);
    }

    #[test]
    fn test_inverse_band_reordered() {
        let adapter = setup(sample(200, 10, NOW));
        let a = AssetId::from("TKA");
        let b = AssetId::from("TKB");

        let mid = adapter.get_quote(1_000_000, &b, &a, NOW).unwrap();
        assert_eq!(mid, 500_000);

        let quotes = adapter.get_quotes(1_000_000, &b, &a, NOW).unwrap();
        // 1_000_000 * 100 / 210 and 1_000_000 * 100 / 190
        assert_eq!(quotes, BidAsk { bid: 476_190, ask: 526_315 });
        assert!(quotes.bid <= mid && mid <= quotes.ask);
    }

    #[test]
    fn test_rejects_other_pairs() {
        let adapter = setup(sample(100, 1, NOW));
        let result = adapter.get_quote(1, &AssetId::from("TKA"), &AssetId::from("TKC"), NOW);
        assert!(matches!(result, Err(OracleError::UnsupportedPair { .. })));
    }

    #[test]
    fn test_stale_sample_rejected() {
        let adapter = setup(sample(100, 1, NOW - 61));
        let result = adapter.get_quote(1, &AssetId::from("TKA"), &AssetId::from("TKB"), NOW);
        assert_eq!(result, Err(OracleError::TooStale { age: 61, max: 60 }));
    }

    #[test]
    fn test_future_sample_rejected() {
        let a = AssetId::from("TKA");
        let b = AssetId::from("TKB");

        let adapter = setup(sample(100, 1, NOW + 60));
        assert_eq!(adapter.get_quote(1_000_000, &a, &b, NOW), Ok(1_000_000));

        let adapter = setup(sample(100, 1, NOW + 61));
        assert!(matches!(
            adapter.get_quote(1_000_000, &a, &b, NOW),
            Err(OracleError::TooFarAhead { .. })
        ));
    }

    #[test]
    fn test_zero_feed_rejected() {
        let decimals = StaticDecimals::new().with("TKA", 6).with("TKB", 6);
        let result = PullFeedAdapter::new(
            PullFeedConfig {
                name: "pull".to_string(),
                feed_id: Pubkey::default(),
                pair: AssetPair::new("TKA", "TKB"),
                max_staleness: 60,
                max_conf_width_bps: DEFAULT_MAX_CONF_WIDTH_BPS,
                max_time_ahead: DEFAULT_MAX_TIME_AHEAD,
            },
            Arc::new(InMemoryFeedStore::new()),
            &decimals,
        );
        assert!(matches!(result, Err(OracleError::InvalidFeed(_))));
    }

    #[test]
    fn test_missing_decimals_rejected() {
        let decimals = StaticDecimals::new().with("TKA", 6);
        let result = PullFeedAdapter::new(
            PullFeedConfig {
                name: "pull".to_string(),
                feed_id: Pubkey::new_unique(),
                pair: AssetPair::new("TKA", "TKB"),
                max_staleness: 60,
                max_conf_width_bps: DEFAULT_MAX_CONF_WIDTH_BPS,
                max_time_ahead: DEFAULT_MAX_TIME_AHEAD,
            },
            Arc::new(InMemoryFeedStore::new()),
            &decimals,
        );
        assert_eq!(
            result.err(),
            Some(OracleError::DecimalsLookup("TKB".to_string()))
        );
    }
}
