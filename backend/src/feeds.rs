//! External collaborators
//!
//! Adapters never talk to a feed network or a token registry directly. They
//! read decoded samples through [`FeedReader`] and asset decimals through
//! [`DecimalsLookup`]; how samples get there (RPC polling, signed payloads,
//! on-chain accounts) is outside this crate.

use crate::{
    error::{OracleError, Result},
    types::{AssetId, RawPriceSample},
};
use parking_lot::RwLock;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use tracing::debug;

/// Source of the latest decoded sample for a pull-updated feed
pub trait FeedReader: Send + Sync {
    fn latest_sample(&self, feed_id: &Pubkey) -> Result<RawPriceSample>;
}

/// Asset metadata lookup, consulted once when an adapter is built
pub trait DecimalsLookup {
    fn decimals_of(&self, asset: &AssetId) -> Result<u8>;
}

/// Latest sample per feed, held in memory.
///
/// Plays the role of the pull oracle's price storage: whoever delivers an
/// update publishes it here and adapters read it back on every query.
#[derive(Debug, Default)]
pub struct InMemoryFeedStore {
    samples: RwLock<HashMap<Pubkey, RawPriceSample>>,
}

impl InMemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a sample, replacing the previous one unless it is older
    pub fn publish(&self, feed_id: Pubkey, sample: RawPriceSample) -> bool {
        let mut samples = self.samples.write();
        if let Some(current) = samples.get(&feed_id) {
            if current.timestamp > sample.timestamp {
                debug!(
                    "Ignoring out-of-order sample for {}: {} < {}",
                    feed_id, sample.timestamp, current.timestamp
                );
                return false;
            }
        }
        samples.insert(feed_id, sample);
        debug!("Published sample for {} at {}", feed_id, sample.timestamp);
        true
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }
}

impl FeedReader for InMemoryFeedStore {
    fn latest_sample(&self, feed_id: &Pubkey) -> Result<RawPriceSample> {
        self.samples
            .read()
            .get(feed_id)
            .copied()
            .ok_or_else(|| OracleError::NoPriceData(feed_id.to_string()))
    }
}

/// Decimals known up front, e.g. from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticDecimals {
    decimals: HashMap<AssetId, u8>,
}

impl StaticDecimals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, asset: impl Into<AssetId>, decimals: u8) -> Self {
        self.insert(asset, decimals);
        self
    }

    pub fn insert(&mut self, asset: impl Into<AssetId>, decimals: u8) {
        self.decimals.insert(asset.into(), decimals);
    }
}

impl DecimalsLookup for StaticDecimals {
    fn decimals_of(&self, asset: &AssetId) -> Result<u8> {
        self.decimals
            .get(asset)
            .copied()
            .ok_or_else(|| OracleError::DecimalsLookup(asset.to_string()))
    }
}
