use thiserror::Error;

use crate::types::{DexId, QuoteErrorKind};

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Malformed reserve amount {amount:?}: {reason}")]
    MalformedReserveAmount { amount: String, reason: String },

    #[error("Invalid pricing input: {0}")]
    InvalidPricingInput(String),

    #[error("No reserve snapshot available for {dex}")]
    NotAvailable { dex: DexId },

    #[error("Unsupported precision: {precision} fractional digits requested from a {native_decimals}-decimal token")]
    UnsupportedPrecision { native_decimals: u32, precision: u32 },

    #[error("No exchanges to quote")]
    NoExchanges,

    #[error("Every exchange is unquotable: {0}")]
    AllUnquotable(String),

    #[error("DEX error ({dex}): {message}")]
    Dex { dex: DexId, message: String },

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;

impl BotError {
    pub fn dex(dex: DexId, message: impl Into<String>) -> Self {
        Self::Dex {
            dex,
            message: message.into(),
        }
    }

    pub fn malformed(amount: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedReserveAmount {
            amount: amount.into(),
            reason: reason.into(),
        }
    }

    /// Classify an error for the unquotable marker of a report slot
    pub fn quote_error_kind(&self) -> QuoteErrorKind {
        match self {
            BotError::MalformedReserveAmount { .. } | BotError::Decimal(_) => {
                QuoteErrorKind::MalformedReserveAmount
            }
            BotError::NotAvailable { .. } | BotError::NoExchanges | BotError::AllUnquotable(_) => QuoteErrorKind::NotAvailable,
            _ => QuoteErrorKind::InvalidPricingInput,
        }
    }
}

impl From<::config::ConfigError> for BotError {
    fn from(err: ::config::ConfigError) -> Self {
        BotError::Config(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BotError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BotError::WebSocket(err.to_string())
    }
}
