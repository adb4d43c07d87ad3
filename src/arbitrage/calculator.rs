use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::{
    types::{BotError, DexId, PoolReserves, PoolSnapshots, QuoteSlot, RateQuote, RateReport, Result, TokenPair},
    utils::{
        config::TradeConfig,
        fixed_point::to_decimal,
        math::{price_impact_percent, quote_output},
    },
};

pub trait RateCalculator: Send + Sync {
    /// Quote both directions for one exchange
    fn quote_exchange(&self, reserves: &PoolReserves) -> Result<RateQuote>;

    /// Quote every exchange; a failing exchange gets an unquotable slot
    /// instead of failing the report
    fn compute_rates(&self, pools: &PoolSnapshots) -> Result<RateReport>;
}

pub struct DefaultRateCalculator {
    tokens: TokenPair,
    trade: TradeConfig,
    fee_overrides: HashMap<DexId, Decimal>,
}

impl DefaultRateCalculator {
    pub fn new(tokens: TokenPair, trade: TradeConfig) -> Self {
        Self {
            tokens,
            trade,
            fee_overrides: HashMap::new(),
        }
    }

    pub fn with_fee(mut self, dex_id: DexId, fee_percent: Decimal) -> Self {
        self.fee_overrides.insert(dex_id, fee_percent);
        self
    }

    fn fee_for(&self, dex_id: DexId) -> Decimal {
        self.fee_overrides
            .get(&dex_id)
            .copied()
            .unwrap_or(self.trade.fee_percent)
    }
}

impl RateCalculator for DefaultRateCalculator {
    fn quote_exchange(&self, reserves: &PoolReserves) -> Result<RateQuote> {
        let precision = self.trade.precision;
        let reserve_a = to_decimal(&reserves.reserve_a, u32::from(self.tokens.token_a.decimals), precision)?;
        let reserve_b = to_decimal(&reserves.reserve_b, u32::from(self.tokens.token_b.decimals), precision)?;
        let fee = self.fee_for(reserves.dex_id);

        // sell token A for token B
        let size_a = self.trade.trade_size_token_a;
        let output_b = quote_output(reserve_a, reserve_b, size_a, fee)?;
        if output_b.is_zero() {
            return Err(BotError::InvalidPricingInput(format!(
                "selling {} {} on {} yields no {}",
                size_a, self.tokens.token_a, reserves.dex_id, self.tokens.token_b
            )));
        }
        let sell_rate = size_a
            .checked_div(output_b)
            .ok_or_else(|| BotError::InvalidPricingInput("sell rate overflows decimal range".into()))?;

        // sell token B for token A
        let size_b = self.trade.trade_size_token_b;
        if size_b <= Decimal::ZERO {
            return Err(BotError::InvalidPricingInput(format!(
                "trade size of {} must be positive",
                self.tokens.token_b
            )));
        }
        let output_a = quote_output(reserve_b, reserve_a, size_b, fee)?;
        let buy_rate = output_a / size_b;

        let impact = price_impact_percent(reserve_a, reserve_b, size_a, fee).unwrap_or_default();
        debug!(
            "{}: reserves {} {} / {} {}, sell={} (impact {:.4}%) buy={}",
            reserves.dex_id, reserve_a, self.tokens.token_a, reserve_b, self.tokens.token_b, sell_rate, impact, buy_rate
        );

        Ok(RateQuote {
            dex_id: reserves.dex_id,
            sell_rate,
            buy_rate,
        })
    }

    fn compute_rates(&self, pools: &PoolSnapshots) -> Result<RateReport> {
        if pools.is_empty() {
            return Err(BotError::NoExchanges);
        }

        let mut report = RateReport::new();
        for (dex_id, snapshot) in pools {
            let quote = match snapshot {
                Some(reserves) => self.quote_exchange(reserves),
                None => Err(BotError::NotAvailable { dex: *dex_id }),
            };

            let slot = match quote {
                Ok(quote) => QuoteSlot::Quoted(quote),
                Err(e) => {
                    warn!("Cannot quote {}: {}", dex_id, e);
                    QuoteSlot::unquotable(&e)
                }
            };
            report.insert(*dex_id, slot);
        }

        Ok(report)
    }
}

/// Rates for every exchange in `pools` with the global fee
pub fn compute_rates(pools: &PoolSnapshots, tokens: &TokenPair, trade: &TradeConfig) -> Result<RateReport> {
    DefaultRateCalculator::new(tokens.clone(), trade.clone()).compute_rates(pools)
}
