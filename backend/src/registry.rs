//! Named oracles served by one process
//!
//! Built once from an [`OracleSetConfig`]; afterwards only the price caches
//! of cache-backed adapters change, through [`OracleRegistry::update_price`].

use crate::{
    adapter::{
        CachedFeedAdapter, CachedFeedConfig, CrossAdapter, PriceOracle, PullFeedAdapter,
        PullFeedConfig, UpdateOutcome,
    },
    config::{parse_feed_id, OracleDefinition, OracleSetConfig},
    error::{OracleError, Result},
    feeds::{DecimalsLookup, InMemoryFeedStore},
    price_aggregator::QuoteAggregator,
    types::{AssetId, AssetPair, BidAsk, OracleDescription, RawPriceSample},
    validator::check_time_ahead,
};
use solana_sdk::pubkey::Pubkey;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

pub struct OracleRegistry {
    oracles: BTreeMap<String, Arc<dyn PriceOracle>>,
    cached: HashMap<String, Arc<CachedFeedAdapter>>,
    /// Feeds read by at least one pull adapter, with the tightest forward
    /// skew any of them tolerates
    pull_feeds: HashMap<Pubkey, u64>,
    feeds: Arc<InMemoryFeedStore>,
}

impl OracleRegistry {
    pub fn new(feeds: Arc<InMemoryFeedStore>) -> Self {
        Self {
            oracles: BTreeMap::new(),
            cached: HashMap::new(),
            pull_feeds: HashMap::new(),
            feeds,
        }
    }

    /// Build every oracle in definition order
    pub fn from_config(config: &OracleSetConfig, feeds: Arc<InMemoryFeedStore>) -> Result<Self> {
        let decimals = config.decimals();
        let mut registry = Self::new(feeds);

        for definition in &config.oracles {
            registry.build(definition, &decimals)?;
        }

        info!("Registered {} oracles", registry.len());
        Ok(registry)
    }

    fn build(&mut self, definition: &OracleDefinition, decimals: &dyn DecimalsLookup) -> Result<()> {
        match definition {
            OracleDefinition::PullFeed {
                name,
                feed_id,
                base,
                quote,
                max_staleness,
                max_conf_width_bps,
                max_time_ahead,
            } => {
                let adapter = PullFeedAdapter::new(
                    PullFeedConfig {
                        name: name.clone(),
                        feed_id: parse_feed_id(feed_id)?,
                        pair: AssetPair::new(base.clone(), quote.clone()),
                        max_staleness: *max_staleness,
                        max_conf_width_bps: *max_conf_width_bps,
                        max_time_ahead: *max_time_ahead,
                    },
                    self.feeds.clone(),
                    decimals,
                )?;
                self.register_pull(Arc::new(adapter))
            }
            OracleDefinition::CachedFeed {
                name,
                feed_id,
                base,
                quote,
                feed_decimals,
                max_conf_width_bps,
                max_price_staleness,
                max_cache_staleness,
                max_time_ahead,
            } => {
                let adapter = CachedFeedAdapter::new(
                    CachedFeedConfig {
                        name: name.clone(),
                        feed_id: parse_feed_id(feed_id)?,
                        pair: AssetPair::new(base.clone(), quote.clone()),
                        feed_decimals: *feed_decimals,
                        max_conf_width_bps: *max_conf_width_bps,
                        max_price_staleness: *max_price_staleness,
                        max_cache_staleness: *max_cache_staleness,
                        max_time_ahead: *max_time_ahead,
                    },
                    decimals,
                )?;
                self.register_cached(Arc::new(adapter))
            }
            OracleDefinition::Cross {
                name,
                base,
                cross,
                quote,
                first,
                second,
            } => {
                let adapter = CrossAdapter::new(
                    name.clone(),
                    AssetPair::new(base.clone(), quote.clone()),
                    cross.clone(),
                    self.get(first)?,
                    self.get(second)?,
                )?;
                self.register(name, Arc::new(adapter))
            }
            OracleDefinition::Aggregate {
                name,
                base,
                quote,
                sources,
                statistic,
                failure_policy,
            } => {
                let oracles = sources
                    .iter()
                    .map(|source| self.get(source))
                    .collect::<Result<Vec<_>>>()?;
                let aggregator = QuoteAggregator::new(
                    name.clone(),
                    AssetPair::new(base.clone(), quote.clone()),
                    oracles,
                    *statistic,
                    *failure_policy,
                )?;
                self.register(name, Arc::new(aggregator))
            }
        }
    }

    pub fn register(&mut self, name: &str, oracle: Arc<dyn PriceOracle>) -> Result<()> {
        if self.oracles.contains_key(name) {
            return Err(OracleError::InvalidConfig(format!("Duplicate oracle name {}", name)));
        }
        debug!("Registered oracle {}", name);
        self.oracles.insert(name.to_string(), oracle);
        Ok(())
    }

    pub fn register_pull(&mut self, adapter: Arc<PullFeedAdapter>) -> Result<()> {
        let name = adapter.description().name;
        self.register(&name, adapter.clone())?;
        let bound = self
            .pull_feeds
            .entry(*adapter.feed_id())
            .or_insert(adapter.max_time_ahead());
        *bound = (*bound).min(adapter.max_time_ahead());
        Ok(())
    }

    pub fn register_cached(&mut self, adapter: Arc<CachedFeedAdapter>) -> Result<()> {
        let name = adapter.name().to_string();
        self.register(&name, adapter.clone())?;
        self.cached.insert(name, adapter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn PriceOracle>> {
        self.oracles
            .get(name)
            .cloned()
            .ok_or_else(|| OracleError::UnknownOracle(name.to_string()))
    }

    pub fn quote(
        &self,
        name: &str,
        in_amount: u64,
        base: &AssetId,
        quote: &AssetId,
        now: i64,
    ) -> Result<u64> {
        self.get(name)?.get_quote(in_amount, base, quote, now)
    }

    pub fn quotes(
        &self,
        name: &str,
        in_amount: u64,
        base: &AssetId,
        quote: &AssetId,
        now: i64,
    ) -> Result<BidAsk> {
        let oracle = self.get(name)?;
        let bid_ask = oracle
            .as_bid_ask()
            .ok_or_else(|| OracleError::UnsupportedOperation(name.to_string()))?;
        bid_ask.get_quotes(in_amount, base, quote, now)
    }

    pub fn describe(&self) -> Vec<OracleDescription> {
        self.oracles.values().map(|oracle| oracle.description()).collect()
    }

    pub fn update_price(&self, name: &str, sample: RawPriceSample, now: i64) -> Result<UpdateOutcome> {
        match self.cached.get(name) {
            Some(adapter) => adapter.update_price(sample, now),
            None if self.oracles.contains_key(name) => {
                Err(OracleError::UnsupportedOperation(name.to_string()))
            }
            None => Err(OracleError::UnknownOracle(name.to_string())),
        }
    }

    /// Store a sample for a configured pull feed.
    ///
    /// Samples dated further ahead than the feed's adapters tolerate are
    /// refused, so they cannot shadow later, correctly dated samples.
    /// Returns `false` when a newer sample is already stored.
    pub fn publish_sample(&self, feed_id: Pubkey, sample: RawPriceSample, now: i64) -> Result<bool> {
        let max_time_ahead = self
            .pull_feeds
            .get(&feed_id)
            .ok_or_else(|| OracleError::UnknownFeed(feed_id.to_string()))?;
        check_time_ahead(sample.timestamp, now, *max_time_ahead)?;
        Ok(self.feeds.publish(feed_id, sample))
    }

    pub fn feeds(&self) -> &Arc<InMemoryFeedStore> {
        &self.feeds
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}
