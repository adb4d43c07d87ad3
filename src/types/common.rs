use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Timestamp = u64;

pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp_millis() as u64
}

/// Supported DEX identifiers
///
/// Both venues run Uniswap-V2 style constant-product pairs on Polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DexId {
    QuickSwap,
    SushiSwap,
}

impl DexId {
    pub fn all() -> Vec<DexId> {
        vec![DexId::QuickSwap, DexId::SushiSwap]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DexId::QuickSwap => "QUICKSWAP",
            DexId::SushiSwap => "SUSHISWAP",
        }
    }
}

impl fmt::Display for DexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DexId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quickswap" => Ok(DexId::QuickSwap),
            "sushiswap" => Ok(DexId::SushiSwap),
            _ => Err(format!("Unknown DEX: {}", s)),
        }
    }
}

// ============================================================================
// Token Information
// ============================================================================

/// Token metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    /// Fractional digits of the on-chain fixed-point representation
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }
}

impl fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

// ============================================================================
// Token Pair
// ============================================================================

/// The pair quoted on every venue (eg JPYC/USDC)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPair {
    pub token_a: TokenInfo,
    pub token_b: TokenInfo,
}

impl TokenPair {
    pub fn new(token_a: TokenInfo, token_b: TokenInfo) -> Self {
        Self { token_a, token_b }
    }

    /// Get pair symbol (eg "JPYC/USDC")
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.token_a.symbol, self.token_b.symbol)
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
