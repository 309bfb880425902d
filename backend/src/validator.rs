//! Feed validation
//!
//! Every sample runs through a fixed, ordered list of checks before any
//! adapter is allowed to price with it. The first failing check rejects
//! the sample; later checks rely on earlier ones having passed (the
//! confidence check divides the band by a price already known positive).
//!
//! ```text
//! pair → positive → confidence width → exponent bounds → staleness → ACCEPT
//! ```

use crate::{
    error::{OracleError, Result},
    types::{AssetId, AssetPair, Direction, RawPriceSample, ValidatedPrice},
};
use tracing::warn;

/// Default confidence bound: ±5% of the price, a 10% wide band at most
pub const DEFAULT_MAX_CONF_WIDTH_BPS: u64 = 500;

pub const BPS_DENOMINATOR: u64 = 10_000;

pub const MIN_EXPONENT: i32 = -16;
pub const MAX_EXPONENT: i32 = 16;

/// Forward clock skew tolerated between a signer and the local clock
pub const DEFAULT_MAX_TIME_AHEAD: u64 = 60;

/// Map a requested pair onto an adapter's configured pair.
pub fn resolve_direction(
    configured: &AssetPair,
    base: &AssetId,
    quote: &AssetId,
) -> Result<Direction> {
    if configured.matches(base, quote) {
        Ok(Direction::Forward)
    } else if configured.matches(quote, base) {
        Ok(Direction::Inverse)
    } else {
        Err(OracleError::UnsupportedPair {
            base: base.to_string(),
            quote: quote.to_string(),
        })
    }
}

/// Seconds elapsed since `timestamp`. Timestamps ahead of `now` count as
/// zero; how far ahead is bounded separately by [`check_time_ahead`].
pub fn sample_age(timestamp: i64, now: i64) -> u64 {
    u64::try_from(i128::from(now) - i128::from(timestamp)).unwrap_or(0)
}

/// Reject a timestamp more than `max_time_ahead` seconds past `now`.
pub fn check_time_ahead(timestamp: i64, now: i64, max_time_ahead: u64) -> Result<()> {
    let ahead = i128::from(timestamp) - i128::from(now);
    if ahead > i128::from(max_time_ahead) {
        return Err(OracleError::TooFarAhead { timestamp, now });
    }
    Ok(())
}

/// One step of the validation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Positive,
    ConfidenceWidth { max_bps: u64 },
    ExponentBounds { min: i32, max: i32 },
    /// Age bound, plus the forward skew a sample's timestamp may carry
    Staleness { max_staleness: u64, max_time_ahead: u64 },
}

impl Check {
    pub fn run(&self, sample: &RawPriceSample, now: i64) -> Result<()> {
        match *self {
            Check::Positive => {
                if sample.value <= 0 {
                    return Err(OracleError::InvalidPrice(sample.value));
                }
            }
            Check::ConfidenceWidth { max_bps } => {
                let Some(confidence) = sample.confidence else {
                    return Ok(());
                };
                let price =
                    u64::try_from(sample.value).map_err(|_| OracleError::InvalidPrice(sample.value))?;
                // conf <= price * max_bps / 10_000, cross-multiplied to stay exact
                let lhs = u128::from(confidence) * u128::from(BPS_DENOMINATOR);
                let rhs = u128::from(price) * u128::from(max_bps);
                if lhs > rhs {
                    return Err(OracleError::ConfidenceTooWide {
                        price,
                        confidence,
                        max_bps,
                    });
                }
            }
            Check::ExponentBounds { min, max } => {
                if sample.exponent < min || sample.exponent > max {
                    return Err(OracleError::InvalidExponent(sample.exponent));
                }
            }
            Check::Staleness {
                max_staleness,
                max_time_ahead,
            } => {
                IngestionWindow {
                    max_price_staleness: max_staleness,
                    max_time_ahead,
                }
                .check(sample.timestamp, now)?;
            }
        }
        Ok(())
    }
}

/// Ordered validation pipeline owned by one adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedValidator {
    checks: Vec<Check>,
}

impl FeedValidator {
    /// Standard pipeline for feeds that are read on every query
    pub fn new(max_staleness: u64, max_conf_width_bps: u64, max_time_ahead: u64) -> Self {
        Self::from_checks(vec![
            Check::Positive,
            Check::ConfidenceWidth {
                max_bps: max_conf_width_bps,
            },
            Check::ExponentBounds {
                min: MIN_EXPONENT,
                max: MAX_EXPONENT,
            },
            Check::Staleness {
                max_staleness,
                max_time_ahead,
            },
        ])
    }

    pub fn from_checks(checks: Vec<Check>) -> Self {
        Self { checks }
    }

    pub fn max_staleness(&self) -> Option<u64> {
        self.checks.iter().find_map(|check| match check {
            Check::Staleness { max_staleness, .. } => Some(*max_staleness),
            _ => None,
        })
    }

    pub fn validate(&self, sample: &RawPriceSample, now: i64) -> Result<ValidatedPrice> {
        for check in &self.checks {
            if let Err(e) = check.run(sample, now) {
                warn!("Rejecting sample ({:?} failed): {}", check, e);
                return Err(e);
            }
        }

        let price = u64::try_from(sample.value)
            .ok()
            .filter(|price| *price > 0)
            .ok_or(OracleError::InvalidPrice(sample.value))?;

        Ok(ValidatedPrice {
            price,
            confidence: sample.confidence,
            exponent: sample.exponent,
            timestamp: sample.timestamp,
        })
    }
}

/// Acceptance window for a signed sample entering a price cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionWindow {
    pub max_price_staleness: u64,
    pub max_time_ahead: u64,
}

impl IngestionWindow {
    pub fn check(&self, timestamp: i64, now: i64) -> Result<()> {
        check_time_ahead(timestamp, now, self.max_time_ahead)?;
        let age = sample_age(timestamp, now);
        if age > self.max_price_staleness {
            return Err(OracleError::TooStale {
                age,
                max: self.max_price_staleness,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn sample(value: i64, confidence: Option<u64>, exponent: i32, timestamp: i64) -> RawPriceSample {
        RawPriceSample {
            value,
            confidence,
            exponent,
            timestamp,
        }
    }

    #[test]
    fn test_resolve_direction() {
        let pair = AssetPair::new("SOL", "USDC");
        let sol = AssetId::from("SOL");
        let usdc = AssetId::from("USDC");
        let btc = AssetId::from("BTC");

        assert_eq!(resolve_direction(&pair, &sol, &usdc), Ok(Direction::Forward));
        assert_eq!(resolve_direction(&pair, &usdc, &sol), Ok(Direction::Inverse));
        assert!(matches!(
            resolve_direction(&pair, &btc, &usdc),
            Err(OracleError::UnsupportedPair { .. })
        ));
    }

    #[test]
    fn test_accepts_valid_sample() {
        let validator = FeedValidator::new(60, DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD);
        let price = validator
            .validate(&sample(100, Some(4), -2, NOW - 10), NOW)
            .unwrap();
        assert_eq!(price.price(), 100);
        assert_eq!(price.confidence(), Some(4));
        assert_eq!(price.exponent(), -2);
    }

    #[test]
    fn test_rejects_non_positive_price() {
        let validator = FeedValidator::new(60, DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD);
        assert_eq!(
            validator.validate(&sample(0, None, -2, NOW), NOW),
            Err(OracleError::InvalidPrice(0))
        );
        assert_eq!(
            validator.validate(&sample(-5, None, -2, NOW), NOW),
            Err(OracleError::InvalidPrice(-5))
        );
    }

    #[test]
    fn test_confidence_boundary() {
        let validator = FeedValidator::new(60, DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD);

        // exactly 5% of the price
        assert!(validator.validate(&sample(10_000, Some(500), -4, NOW), NOW).is_ok());

        // one unit above
        assert!(matches!(
            validator.validate(&sample(10_000, Some(501), -4, NOW), NOW),
            Err(OracleError::ConfidenceTooWide { .. })
        ));

        // no band reported
        assert!(validator.validate(&sample(10_000, None, -4, NOW), NOW).is_ok());
    }

    #[test]
    fn test_exponent_boundary() {
        let validator = FeedValidator::new(60, DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD);
        assert!(validator.validate(&sample(1, None, 16, NOW), NOW).is_ok());
        assert!(validator.validate(&sample(1, None, -16, NOW), NOW).is_ok());
        assert_eq!(
            validator.validate(&sample(1, None, 17, NOW), NOW),
            Err(OracleError::InvalidExponent(17))
        );
        assert_eq!(
            validator.validate(&sample(1, None, -17, NOW), NOW),
            Err(OracleError::InvalidExponent(-17))
        );
    }

    #[test]
    fn test_staleness_boundary() {
        let validator = FeedValidator::new(60, DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD);
        assert!(validator.validate(&sample(100, None, -2, NOW - 60), NOW).is_ok());
        assert_eq!(
            validator.validate(&sample(100, None, -2, NOW - 61), NOW),
            Err(OracleError::TooStale { age: 61, max: 60 })
        );
    }

    #[test]
    fn test_checks_run_in_order() {
        let validator = FeedValidator::new(60, DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD);

        // Negative, too wide, bad exponent and stale at once: positivity wins
        let bad = sample(-1, Some(1_000), 40, NOW - 1_000);
        assert_eq!(validator.validate(&bad, NOW), Err(OracleError::InvalidPrice(-1)));

        // Valid price, everything else bad: confidence comes next
        let bad = sample(100, Some(50), 40, NOW - 1_000);
        assert!(matches!(
            validator.validate(&bad, NOW),
            Err(OracleError::ConfidenceTooWide { .. })
        ));

        let bad = sample(100, Some(1), 40, NOW - 1_000);
        assert_eq!(validator.validate(&bad, NOW), Err(OracleError::InvalidExponent(40)));
    }

    #[test]
    fn test_future_sample_bounded() {
        let validator = FeedValidator::new(60, DEFAULT_MAX_CONF_WIDTH_BPS, DEFAULT_MAX_TIME_AHEAD);
        assert_eq!(sample_age(NOW + 5, NOW), 0);

        assert!(validator.validate(&sample(100, None, -2, NOW + 60), NOW).is_ok());
        assert_eq!(
            validator.validate(&sample(100, None, -2, NOW + 61), NOW),
            Err(OracleError::TooFarAhead {
                timestamp: NOW + 61,
                now: NOW
            })
        );

        // A sample dated a year ahead never passes, no matter how long we wait
        let far = sample(100, None, -2, NOW + 365 * 86_400);
        assert!(matches!(validator.validate(&far, NOW), Err(OracleError::TooFarAhead { .. })));
        assert!(matches!(
            validator.validate(&far, NOW + 30 * 86_400),
            Err(OracleError::TooFarAhead { .. })
        ));
    }

    #[test]
    fn test_ingestion_window() {
        let window = IngestionWindow {
            max_price_staleness: 180,
            max_time_ahead: DEFAULT_MAX_TIME_AHEAD,
        };
        assert!(window.check(NOW - 180, NOW).is_ok());
        assert!(window.check(NOW + 60, NOW).is_ok());
        assert_eq!(
            window.check(NOW - 181, NOW),
            Err(OracleError::TooStale { age: 181, max: 180 })
        );
        assert_eq!(
            window.check(NOW + 61, NOW),
            Err(OracleError::TooFarAhead {
                timestamp: NOW + 61,
                now: NOW
            })
        );
    }

    #[test]
    fn test_max_staleness_reported() {
        assert_eq!(FeedValidator::new(90, 100, 30).max_staleness(), Some(90));
        assert_eq!(FeedValidator::from_checks(vec![Check::Positive]).max_staleness(), None);
    }
}
