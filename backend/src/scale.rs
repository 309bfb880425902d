//! Decimal scaling
//!
//! Converts a raw feed price (an integer with a feed-specific power-of-ten
//! exponent) into a token out amount, taking the decimals of both assets
//! into account.
//!
//! # Conversion math
//! ```text
//! e = quote_decimals - base_decimals - feed_decimals + sample_exponent
//!
//! forward:  out = in * price * 10^e         (e >= 0)
//!           out = in * price / 10^-e        (e <  0)
//! inverse:  out = in / (price * 10^e)       (e >= 0)
//!           out = in * 10^-e / price        (e <  0)
//! ```
//!
//! Intermediates are `u128`, the result is narrowed back to `u64`.
//! Division truncates toward zero, so a quote is never overestimated.
//! Overflow anywhere is an error, never a wrap.

use crate::error::{OracleError, Result};
use crate::types::Direction;
use serde::Serialize;

/// Largest power of ten representable in `u128`
const MAX_POW10: u32 = 38;

/// Decimal adjustment of an adapter, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecimalScale {
    scale_exponent: i32,
}

impl DecimalScale {
    /// Collapse the decimals of the configured pair and the feed's fixed
    /// precision into one exponent. Feeds that report an exponent with every
    /// sample pass `feed_decimals = 0`.
    pub fn new(base_decimals: u8, quote_decimals: u8, feed_decimals: u8) -> Self {
        let (scale_exponent, _) = compute_scale(base_decimals, quote_decimals, feed_decimals, false);
        Self { scale_exponent }
    }

    pub fn scale_exponent(&self) -> i32 {
        self.scale_exponent
    }

    /// Combine with a sample's own exponent
    pub fn exponent_for(&self, feed_exponent: i32) -> i32 {
        self.scale_exponent + feed_exponent
    }

    pub fn convert(
        &self,
        in_amount: u64,
        price: u64,
        feed_exponent: i32,
        direction: Direction,
    ) -> Result<u64> {
        convert(
            in_amount,
            price,
            self.exponent_for(feed_exponent),
            direction.is_inverse(),
        )
    }
}

/// Scale exponent seen from a query's point of view.
///
/// `base`/`quote` are the decimals of the queried assets. For an inverse
/// query these are swapped relative to the feed's pair, which is why the
/// subtraction flips; both views yield the same exponent.
pub fn compute_scale(
    base_decimals: u8,
    quote_decimals: u8,
    feed_decimals: u8,
    inverse: bool,
) -> (i32, bool) {
    let base = i32::from(base_decimals);
    let quote = i32::from(quote_decimals);
    let diff = if inverse { base - quote } else { quote - base };
    (diff - i32::from(feed_decimals), inverse)
}

fn pow10(exp: u32) -> Option<u128> {
    if exp > MAX_POW10 {
        return None;
    }
    10_u128.checked_pow(exp)
}

fn overflow(context: impl Into<String>) -> OracleError {
    OracleError::Overflow(context.into())
}

/// Convert `in_amount` at `price * 10^exponent`.
pub fn convert(in_amount: u64, price: u64, exponent: i32, inverse: bool) -> Result<u64> {
    let amount = u128::from(in_amount);
    let price = u128::from(price);
    let pow = pow10(exponent.unsigned_abs());

    let out = if !inverse {
        let product = amount
            .checked_mul(price)
            .ok_or_else(|| overflow("in_amount * price"))?;
        if exponent >= 0 {
            let pow = pow.ok_or_else(|| overflow(format!("10^{}", exponent)))?;
            product
                .checked_mul(pow)
                .ok_or_else(|| overflow(format!("in_amount * price * 10^{}", exponent)))?
        } else {
            // 10^-e beyond u128 exceeds any product, so the quotient is zero
            pow.map(|pow| product / pow).unwrap_or(0)
        }
    } else {
        if price == 0 {
            return Err(OracleError::InvalidPrice(0));
        }
        if exponent >= 0 {
            match pow.and_then(|pow| price.checked_mul(pow)) {
                Some(denominator) => amount / denominator,
                None => 0,
            }
        } else {
            let pow = pow.ok_or_else(|| overflow(format!("10^{}", exponent.unsigned_abs())))?;
            amount
                .checked_mul(pow)
                .ok_or_else(|| overflow(format!("in_amount * 10^{}", exponent.unsigned_abs())))?
                / price
        }
    };

    u64::try_from(out).map_err(|_| overflow(format!("out amount {} does not fit in u64", out)))
}
