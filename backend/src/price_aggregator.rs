//! Quote Aggregator
//!
//! Combines quotes from independent oracles for the same pair into one
//! value, so that no single feed controls the answer.
//!
//! # Architecture
//! ```text
//! Pyth SOL/USDC   → 150_020_000
//!         ↓
//! Cached SOL/USD  → 149_980_000  →  [Aggregator]  →  median: 149_990_000
//!         ↓
//! Cross via JitoSOL → 149_990_000
//! ```
//!
//! # Statistics
//! - `min` / `max`: linear scan
//! - `mean`: summed in a `u128` accumulator, truncating division
//! - `median`: middle element of the sorted quotes; for an even count the
//!   **lower** of the two middle elements, so the result is always one of
//!   the observed quotes rather than an interpolation
//!
//! The engine has no notion of quorum. Which failures are tolerated is a
//! decision of the caller, expressed by [`FailurePolicy`].

use crate::{
    adapter::PriceOracle,
    error::{OracleError, Result},
    types::{AssetId, AssetPair, OracleDescription, OracleKind},
    validator::resolve_direction,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Min,
    Max,
    Mean,
    #[default]
    Median,
}

/// Combine a non-empty set of quotes with the selected statistic
pub fn aggregate(quotes: &[u64], statistic: Statistic) -> Result<u64> {
    if quotes.is_empty() {
        return Err(OracleError::EmptyQuotes);
    }

    match statistic {
        Statistic::Min => min(quotes),
        Statistic::Max => max(quotes),
        Statistic::Mean => mean(quotes),
        Statistic::Median => median(quotes),
    }
}

pub fn min(quotes: &[u64]) -> Result<u64> {
    quotes.iter().copied().min().ok_or(OracleError::EmptyQuotes)
}

pub fn max(quotes: &[u64]) -> Result<u64> {
    quotes.iter().copied().max().ok_or(OracleError::EmptyQuotes)
}

pub fn mean(quotes: &[u64]) -> Result<u64> {
    if quotes.is_empty() {
        return Err(OracleError::EmptyQuotes);
    }

    let sum = quotes.iter().try_fold(0_u128, |acc, quote| {
        acc.checked_add(u128::from(*quote))
            .ok_or_else(|| OracleError::Overflow("sum of quotes".to_string()))
    })?;

    // Bounded by the largest quote, so it always narrows back
    let mean = sum / quotes.len() as u128;
    u64::try_from(mean).map_err(|_| OracleError::Overflow(format!("mean {}", mean)))
}

/// Middle element after sorting; the lower middle one for even counts.
pub fn median(quotes: &[u64]) -> Result<u64> {
    if quotes.is_empty() {
        return Err(OracleError::EmptyQuotes);
    }

    let mut sorted = quotes.to_vec();
    sorted.sort_unstable();
    Ok(sorted[(sorted.len() - 1) / 2])
}

/// What to do when one of the aggregated oracles fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failing oracle fails the whole query
    #[default]
    Abort,
    /// Drop failing oracles and aggregate whatever succeeded
    SkipFailed,
}

/// Oracle that queries a fixed set of oracles for one pair and combines
/// their quotes
pub struct QuoteAggregator {
    name: String,
    pair: AssetPair,
    oracles: Vec<Arc<dyn PriceOracle>>,
    statistic: Statistic,
    policy: FailurePolicy,
}

impl QuoteAggregator {
    pub fn new(
        name: impl Into<String>,
        pair: AssetPair,
        oracles: Vec<Arc<dyn PriceOracle>>,
        statistic: Statistic,
        policy: FailurePolicy,
    ) -> Result<Self> {
        let name = name.into();
        if oracles.is_empty() {
            return Err(OracleError::InvalidConfig(format!("{}: no oracles to aggregate", name)));
        }

        for oracle in &oracles {
            let description = oracle.description();
            if resolve_direction(&description.pair, &pair.base, &pair.quote).is_err() {
                return Err(OracleError::InvalidConfig(format!(
                    "{}: {} prices {}, not {}",
                    name, description.name, description.pair, pair
                )));
            }
        }

        debug!(
            "Aggregator {} over {} oracles for {} ({:?}, {:?})",
            name,
            oracles.len(),
            pair,
            statistic,
            policy
        );

        Ok(Self {
            name,
            pair,
            oracles,
            statistic,
            policy,
        })
    }

    /// Quote from every oracle, in order, honouring the failure policy
    pub fn collect_quotes(
        &self,
        in_amount: u64,
        base: &AssetId,
        quote: &AssetId,
        now: i64,
    ) -> Result<Vec<u64>> {
        resolve_direction(&self.pair, base, quote)?;

        let mut quotes = Vec::with_capacity(self.oracles.len());
        let mut errors = Vec::new();

        for oracle in &self.oracles {
            match oracle.get_quote(in_amount, base, quote, now) {
                Ok(out) => quotes.push(out),
                Err(e) => {
                    let source = oracle.description().name;
                    warn!("{}: {} failed: {}", self.name, source, e);
                    if self.policy == FailurePolicy::Abort {
                        return Err(e);
                    }
                    errors.push(format!("{}: {}", source, e));
                }
            }
        }

        if quotes.is_empty() {
            return Err(OracleError::NoQuotes(errors.join("; ")));
        }
        Ok(quotes)
    }
}

impl PriceOracle for QuoteAggregator {
    fn get_quote(&self, in_amount: u64, base: &AssetId, quote: &AssetId, now: i64) -> Result<u64> {
        let quotes = self.collect_quotes(in_amount, base, quote, now)?;
        let out = aggregate(&quotes, self.statistic)?;

        debug!(
            "{}: {:?} of {} quotes = {} ({} {} -> {})",
            self.name,
            self.statistic,
            quotes.len(),
            out,
            in_amount,
            base,
            quote
        );
        Ok(out)
    }

    fn description(&self) -> OracleDescription {
        OracleDescription {
            name: self.name.clone(),
            kind: OracleKind::Aggregate,
            pair: self.pair.clone(),
            max_staleness: self
                .oracles
                .iter()
                .map(|oracle| oracle.description().max_staleness)
                .min()
                .unwrap_or_default(),
            bid_ask: false,
        }
    }
}
