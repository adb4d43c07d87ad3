use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    types::{RateReport, SpreadOpportunity, now},
    utils::config::ArbitrageConfig,
};

pub trait SpreadDetector: Send + Sync {
    /// Cross-venue round trips in `report` that clear the profit threshold,
    /// best first
    fn find_opportunities(&self, report: &RateReport) -> Vec<SpreadOpportunity>;
}

pub struct DefaultSpreadDetector {
    config: ArbitrageConfig,
}

impl DefaultSpreadDetector {
    pub fn new(config: ArbitrageConfig) -> Self {
        Self { config }
    }
}

impl SpreadDetector for DefaultSpreadDetector {
    fn find_opportunities(&self, report: &RateReport) -> Vec<SpreadOpportunity> {
        let mut found = Vec::new();

        for sell in report.quotes() {
            for buy in report.quotes() {
                if sell.dex_id == buy.dex_id || sell.sell_rate.is_zero() {
                    continue;
                }

                // A spent per B on one venue vs A received per B on the other
                let spread_percent = (buy.buy_rate - sell.sell_rate) / sell.sell_rate * Decimal::ONE_HUNDRED;
                debug!("{} -> {}: spread {}%", sell.dex_id, buy.dex_id, spread_percent);

                let opportunity = SpreadOpportunity {
                    sell_on: sell.dex_id,
                    buy_on: buy.dex_id,
                    sell_rate: sell.sell_rate,
                    buy_rate: buy.buy_rate,
                    spread_percent,
                    discovered_at: now(),
                };
                if spread_percent > Decimal::ZERO && opportunity.is_profitable(self.config.min_profit_percent) {
                    found.push(opportunity);
                }
            }
        }

        found.sort_by(|a, b| b.spread_percent.cmp(&a.spread_percent));
        found
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::types::{BotError, DexId, QuoteSlot, RateQuote};

    use super::*;

    fn detector(min_profit_percent: Decimal) -> DefaultSpreadDetector {
        DefaultSpreadDetector::new(ArbitrageConfig {
            min_profit_percent,
            ..ArbitrageConfig::default()
        })
    }

    fn report(quick: (Decimal, Decimal), sushi: (Decimal, Decimal)) -> RateReport {
        let mut report = RateReport::new();
        for (dex_id, (sell_rate, buy_rate)) in [(DexId::QuickSwap, quick), (DexId::SushiSwap, sushi)] {
            report.insert(
                dex_id,
                QuoteSlot::Quoted(RateQuote {
                    dex_id,
                    sell_rate,
                    buy_rate,
                }),
            );
        }
        report
    }

    #[test]
    fn test_detects_cross_venue_spread() {
        // selling on QuickSwap costs 160 A per B, SushiSwap pays 165 A per B
        let report = report((dec!(160), dec!(158)), (dec!(168), dec!(165)));
        let found = detector(dec!(0.5)).find_opportunities(&report);

        assert_eq!(found.len(), 1);
        let best = &found[0];
        assert_eq!(best.sell_on, DexId::QuickSwap);
        assert_eq!(best.buy_on, DexId::SushiSwap);
        assert_eq!(best.spread_percent, dec!(3.125));
    }

    #[test]
    fn test_threshold_filters_small_spreads() {
        let report = report((dec!(160), dec!(158)), (dec!(168), dec!(160.4)));

        assert_eq!(detector(dec!(0.1)).find_opportunities(&report).len(), 1);
        assert!(detector(dec!(0.5)).find_opportunities(&report).is_empty());
    }

    #[test]
    fn test_aligned_markets_have_no_opportunity() {
        let report = report((dec!(170.5), dec!(160.8)), (dec!(170.4), dec!(160.9)));
        assert!(detector(Decimal::ZERO).find_opportunities(&report).is_empty());
    }

    #[test]
    fn test_unquotable_exchanges_are_skipped() {
        let mut report = report((dec!(160), dec!(158)), (dec!(168), dec!(165)));
        report.insert(
            DexId::SushiSwap,
            QuoteSlot::unquotable(&BotError::NotAvailable { dex: DexId::SushiSwap }),
        );
        assert!(detector(Decimal::ZERO).find_opportunities(&report).is_empty());
    }
}
