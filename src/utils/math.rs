use rust_decimal::Decimal;

use crate::types::{BotError, Result};

/// 0.3%
pub const DEFAULT_FEE_PERCENT: Decimal = Decimal::from_parts(3, 0, 0, false, 1);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn overflow(what: &str) -> BotError {
    BotError::InvalidPricingInput(format!("{} overflows decimal range", what))
}

/// Calculate constant product AMM output amount, fee taken from the input side
pub fn quote_output(
    reserve_in: Decimal,
    reserve_out: Decimal,
    amount_in: Decimal,
    fee_percent: Decimal,
) -> Result<Decimal> {
    if reserve_in <= Decimal::ZERO {
        return Err(BotError::InvalidPricingInput(format!(
            "reserve in must be positive, got {}",
            reserve_in
        )));
    }
    if reserve_out.is_sign_negative() && !reserve_out.is_zero() {
        return Err(BotError::InvalidPricingInput(format!(
            "reserve out must not be negative, got {}",
            reserve_out
        )));
    }
    if amount_in.is_sign_negative() && !amount_in.is_zero() {
        return Err(BotError::InvalidPricingInput(format!(
            "amount in must not be negative, got {}",
            amount_in
        )));
    }
    if fee_percent < Decimal::ZERO || fee_percent >= HUNDRED {
        return Err(BotError::InvalidPricingInput(format!(
            "fee percent must be in [0, 100), got {}",
            fee_percent
        )));
    }

    let amount_in_net = amount_in
        .checked_mul(HUNDRED - fee_percent)
        .ok_or_else(|| overflow("amount in"))?;
    let numerator = amount_in_net
        .checked_mul(reserve_out)
        .ok_or_else(|| overflow("numerator"))?;
    let denominator = reserve_in
        .checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_add(amount_in_net))
        .ok_or_else(|| overflow("denominator"))?;

    numerator
        .checked_div(denominator)
        .ok_or_else(|| overflow("amount out"))
}

/// Marginal price of the output token before any trade
pub fn spot_price(reserve_in: Decimal, reserve_out: Decimal) -> Result<Decimal> {
    if reserve_in <= Decimal::ZERO {
        return Err(BotError::InvalidPricingInput(format!(
            "reserve in must be positive, got {}",
            reserve_in
        )));
    }
    reserve_out
        .checked_div(reserve_in)
        .ok_or_else(|| overflow("spot price"))
}

/// Calculate price impact for a trade, in percent of the spot price.
/// Includes the fee, so a tiny trade approaches `fee_percent`.
pub fn price_impact_percent(
    reserve_in: Decimal,
    reserve_out: Decimal,
    amount_in: Decimal,
    fee_percent: Decimal,
) -> Result<Decimal> {
    if amount_in <= Decimal::ZERO {
        return Err(BotError::InvalidPricingInput(format!(
            "amount in must be positive to measure impact, got {}",
            amount_in
        )));
    }

    let spot = spot_price(reserve_in, reserve_out)?;
    if spot.is_zero() {
        return Err(BotError::InvalidPricingInput("pool holds none of the output token".into()));
    }

    let executed = quote_output(reserve_in, reserve_out, amount_in, fee_percent)? / amount_in;
    Ok((spot - executed) / spot * HUNDRED)
}
