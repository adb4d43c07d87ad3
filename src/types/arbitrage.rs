use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{DexId, Timestamp};

/// Round trip across two venues: sell token A on `sell_on`, then sell the
/// proceeds (token B) back into token A on `buy_on`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadOpportunity {
    pub sell_on: DexId,
    pub buy_on: DexId,
    #[serde(with = "rust_decimal::serde::float")]
    pub sell_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub buy_rate: Decimal,
    /// Net gain of the round trip in percent, fees included
    #[serde(with = "rust_decimal::serde::float")]
    pub spread_percent: Decimal,
    pub discovered_at: Timestamp,
}

impl SpreadOpportunity {
    pub fn is_profitable(&self, min_profit_percent: Decimal) -> bool {
        self.spread_percent >= min_profit_percent
    }

    pub fn summary(&self) -> String {
        format!(
            "sell on {} @ {} -> buy on {} @ {} ({:.4}%)",
            self.sell_on, self.sell_rate, self.buy_on, self.buy_rate, self.spread_percent
        )
    }
}
