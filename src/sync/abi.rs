use crate::types::{BotError, Result};

/// `getReserves()` selector of Uniswap-V2 style pairs
pub const GET_RESERVES_SELECTOR: &str = "0x0902f1ac";

/// keccak256("Sync(uint112,uint112)")
pub const SYNC_EVENT_TOPIC: &str = "0x1c411e9a96e071241c2f21f7726b17ae89e3cab4c78be50e062b03a9fffbbad1";

const WORD_HEX_LEN: usize = 64;

/// Raw pair reserves in token0/token1 order, as decimal integer strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReserves {
    pub reserve0: String,
    pub reserve1: String,
}

impl RawReserves {
    /// Reorder into (token A, token B)
    pub fn oriented(self, token_a_is_token0: bool) -> (String, String) {
        if token_a_is_token0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }
}

/// Decode the leading two words of `getReserves()` output or `Sync` log data
pub fn decode_reserves(data: &str) -> Result<RawReserves> {
    let hex = data.strip_prefix("0x").unwrap_or(data);
    if !hex.is_ascii() || hex.len() < 2 * WORD_HEX_LEN {
        return Err(BotError::Parse(format!(
            "expected at least two 32-byte words, got {} hex chars",
            hex.len()
        )));
    }

    Ok(RawReserves {
        reserve0: decode_uint_word(&hex[..WORD_HEX_LEN])?.to_string(),
        reserve1: decode_uint_word(&hex[WORD_HEX_LEN..2 * WORD_HEX_LEN])?.to_string(),
    })
}

/// Decode one 32-byte big-endian word; values above 128 bits are rejected
pub fn decode_uint_word(word: &str) -> Result<u128> {
    if word.len() != WORD_HEX_LEN || !word.is_ascii() {
        return Err(BotError::Parse(format!("invalid ABI word: {:?}", word)));
    }

    let (high, low) = word.split_at(WORD_HEX_LEN / 2);
    if high.bytes().any(|b| b != b'0') {
        return Err(BotError::Parse(format!("ABI word exceeds 128 bits: {}", word)));
    }

    u128::from_str_radix(low, 16).map_err(|e| BotError::Parse(format!("invalid ABI word {}: {}", word, e)))
}

/// Parse a `0x`-prefixed hex quantity such as a block number
pub fn parse_quantity(value: &str) -> Result<u64> {
    let hex = value
        .strip_prefix("0x")
        .ok_or_else(|| BotError::Parse(format!("quantity without 0x prefix: {}", value)))?;
    u64::from_str_radix(hex, 16).map_err(|e| BotError::Parse(format!("invalid quantity {}: {}", value, e)))
}
