use rust_decimal::Decimal;

use crate::types::{BotError, Result};

/// Fractional digits kept when converting on-chain reserves
pub const DEFAULT_PRECISION: u32 = 5;

/// Largest scale a `Decimal` can carry
pub const MAX_PRECISION: u32 = 28;

/// Convert a raw on-chain integer amount with `native_decimals` implied
/// fractional digits into a decimal with `precision` fractional digits.
///
/// Low-order digits are dropped, never rounded, so the result is always
/// `<=` the exact value `raw / 10^native_decimals`.
pub fn to_decimal(raw_amount: &str, native_decimals: u32, precision: u32) -> Result<Decimal> {
    if native_decimals < precision || precision > MAX_PRECISION {
        return Err(BotError::UnsupportedPrecision {
            native_decimals,
            precision,
        });
    }

    if raw_amount.is_empty() || !raw_amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BotError::malformed(raw_amount, "not an unsigned integer"));
    }

    let window = native_decimals - precision;
    if window > 0 && raw_amount.len() <= window as usize {
        return Err(BotError::malformed(
            raw_amount,
            format!("fewer digits than the {}-digit truncation window", window),
        ));
    }

    let raw: u128 = raw_amount
        .parse()
        .map_err(|_| BotError::malformed(raw_amount, "exceeds 128-bit range"))?;

    let divisor = 10u128
        .checked_pow(window)
        .ok_or_else(|| BotError::malformed(raw_amount, "truncation window exceeds 128-bit range"))?;

    let truncated = i128::try_from(raw / divisor)
        .map_err(|_| BotError::malformed(raw_amount, "exceeds signed 128-bit range"))?;

    Decimal::try_from_i128_with_scale(truncated, precision)
        .map_err(|e| BotError::malformed(raw_amount, e.to_string()))
}
