use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{BotError, DexId};

/// Executable rates of one exchange for the configured trade sizes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateQuote {
    #[serde(skip)]
    pub dex_id: DexId,
    /// Units of token A spent per unit of token B received
    #[serde(rename = "sell", with = "rust_decimal::serde::float")]
    pub sell_rate: Decimal,
    /// Units of token A received per unit of token B spent
    #[serde(rename = "buy", with = "rust_decimal::serde::float")]
    pub buy_rate: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuoteErrorKind {
    MalformedReserveAmount,
    InvalidPricingInput,
    NotAvailable,
}

/// One exchange's slot in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuoteSlot {
    Quoted(RateQuote),
    Unquotable {
        error: QuoteErrorKind,
        message: String,
    },
}

impl QuoteSlot {
    pub fn unquotable(err: &BotError) -> Self {
        QuoteSlot::Unquotable {
            error: err.quote_error_kind(),
            message: err.to_string(),
        }
    }

    pub fn quote(&self) -> Option<&RateQuote> {
        match self {
            QuoteSlot::Quoted(quote) => Some(quote),
            QuoteSlot::Unquotable { .. } => None,
        }
    }

    pub fn is_quoted(&self) -> bool {
        self.quote().is_some()
    }
}

/// Rates for every exchange, keyed by exchange id
///
/// Serializes as `{ "QUICKSWAP": { "sell": .., "buy": .. }, .. }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RateReport {
    slots: BTreeMap<DexId, QuoteSlot>,
}

impl RateReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dex_id: DexId, slot: QuoteSlot) {
        self.slots.insert(dex_id, slot);
    }

    pub fn get(&self, dex_id: &DexId) -> Option<&QuoteSlot> {
        self.slots.get(dex_id)
    }

    pub fn quote(&self, dex_id: &DexId) -> Option<&RateQuote> {
        self.get(dex_id).and_then(QuoteSlot::quote)
    }

    /// Successfully quoted exchanges, in exchange id order
    pub fn quotes(&self) -> impl Iterator<Item = &RateQuote> {
        self.slots.values().filter_map(QuoteSlot::quote)
    }

    /// True when no slot carries a quote; the query surface treats this as a failure
    pub fn all_failed(&self) -> bool {
        !self.slots.values().any(QuoteSlot::is_quoted)
    }

    /// Short one-line rendering for logs
    pub fn summary(&self) -> String {
        self.slots
            .iter()
            .map(|(dex_id, slot)| match slot {
                QuoteSlot::Quoted(q) => format!("{}: sell={} buy={}", dex_id, q.sell_rate, q.buy_rate),
                QuoteSlot::Unquotable { error, .. } => format!("{}: {:?}", dex_id, error),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn quoted(dex_id: DexId, sell: Decimal, buy: Decimal) -> QuoteSlot {
        QuoteSlot::Quoted(RateQuote {
            dex_id,
            sell_rate: sell,
            buy_rate: buy,
        })
    }

    #[test]
    fn test_report_serializes_keyed_by_exchange() {
        let mut report = RateReport::new();
        report.insert(DexId::QuickSwap, quoted(DexId::QuickSwap, dec!(1.2345), dec!(0.8102)));
        report.insert(
            DexId::SushiSwap,
            QuoteSlot::unquotable(&BotError::NotAvailable { dex: DexId::SushiSwap }),
        );

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["QUICKSWAP"], json!({ "sell": 1.2345, "buy": 0.8102 }));
        assert_eq!(value["SUSHISWAP"]["error"], json!("NotAvailable"));
        assert!(value["SUSHISWAP"]["message"].as_str().unwrap().contains("SUSHISWAP"));
    }

    #[test]
    fn test_all_failed() {
        let mut report = RateReport::new();
        assert!(report.all_failed());

        report.insert(
            DexId::SushiSwap,
            QuoteSlot::unquotable(&BotError::InvalidPricingInput("zero reserve".into())),
        );
        assert!(report.all_failed());

        report.insert(DexId::QuickSwap, quoted(DexId::QuickSwap, dec!(170), dec!(160)));
        assert!(!report.all_failed());
        assert_eq!(report.quotes().count(), 1);
    }
}
