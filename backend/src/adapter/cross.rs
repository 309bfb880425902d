use super::PriceOracle;
use crate::{
    error::{OracleError, Result},
    types::{AssetId, AssetPair, Direction, OracleDescription, OracleKind},
    validator::resolve_direction,
};
use std::sync::Arc;
use tracing::debug;

/// Prices `base/quote` by chaining two oracles through a shared asset:
///
/// ```text
/// forward:  base  → cross → quote   (first, then second)
/// inverse:  quote → cross → base    (second, then first)
/// ```
///
/// Each leg runs its own validation, so a stale leg fails the whole chain.
pub struct CrossAdapter {
    name: String,
    pair: AssetPair,
    cross: AssetId,
    first: Arc<dyn PriceOracle>,
    second: Arc<dyn PriceOracle>,
}

impl CrossAdapter {
    pub fn new(
        name: impl Into<String>,
        pair: AssetPair,
        cross: AssetId,
        first: Arc<dyn PriceOracle>,
        second: Arc<dyn PriceOracle>,
    ) -> Result<Self> {
        let name = name.into();
        check_leg(&name, first.as_ref(), &pair.base, &cross)?;
        check_leg(&name, second.as_ref(), &cross, &pair.quote)?;

        Ok(Self {
            name,
            pair,
            cross,
            first,
            second,
        })
    }
}

fn check_leg(name: &str, leg: &dyn PriceOracle, base: &AssetId, quote: &AssetId) -> Result<()> {
    let leg_pair = leg.description().pair;
    resolve_direction(&leg_pair, base, quote).map(|_| ()).map_err(|_| {
        OracleError::InvalidConfig(format!(
            "{}: leg {} cannot price {}/{}",
            name, leg_pair, base, quote
        ))
    })
}

impl PriceOracle for CrossAdapter {
    fn get_quote(&self, in_amount: u64, base: &AssetId, quote: &AssetId, now: i64) -> Result<u64> {
        let out = match resolve_direction(&self.pair, base, quote)? {
            Direction::Forward => {
                let mid = self.first.get_quote(in_amount, base, &self.cross, now)?;
                self.second.get_quote(mid, &self.cross, quote, now)?
            }
            Direction::Inverse => {
                let mid = self.second.get_quote(in_amount, base, &self.cross, now)?;
                self.first.get_quote(mid, &self.cross, quote, now)?
            }
        };

        debug!("{}: {} {} -> {} {} via {}", self.name, in_amount, base, out, quote, self.cross);
        Ok(out)
    }

    fn description(&self) -> OracleDescription {
        OracleDescription {
            name: self.name.clone(),
            kind: OracleKind::Cross,
            pair: self.pair.clone(),
            max_staleness: self
                .first
                .description()
                .max_staleness
                .min(self.second.description().max_staleness),
            bid_ask: false,
        }
    }
}
