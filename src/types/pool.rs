use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{DexId, Timestamp, now};

/// Point-in-time reserves of one pool, in the tokens' native fixed-point form.
///
/// Amounts are kept as decimal integer strings because uint112 reserves do
/// not fit native 64-bit integers. A snapshot is replaced wholesale on every
/// update and never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReserves {
    pub dex_id: DexId,
    pub pool_address: String,
    pub reserve_a: String,
    pub reserve_b: String,
    /// Block the reserves were observed at, when the feed knows it
    pub block_number: Option<u64>,
    /// Position of the `Sync` log within its block; `None` for block-level reads
    pub log_index: Option<u64>,
    pub updated_at: Timestamp,
}

impl PoolReserves {
    pub fn new(
        dex_id: DexId,
        pool_address: impl Into<String>,
        reserve_a: impl Into<String>,
        reserve_b: impl Into<String>,
    ) -> Self {
        Self {
            dex_id,
            pool_address: pool_address.into(),
            reserve_a: reserve_a.into(),
            reserve_b: reserve_b.into(),
            block_number: None,
            log_index: None,
            updated_at: now(),
        }
    }

    pub fn with_block_number(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    pub fn with_log_index(mut self, log_index: u64) -> Self {
        self.log_index = Some(log_index);
        self
    }

    /// Where on chain the reserves were observed, as `(block, log index)`.
    ///
    /// A block-level read reflects the state after every log of that block,
    /// so it sorts after all of them.
    pub fn chain_position(&self) -> Option<(u64, u64)> {
        self.block_number
            .map(|block| (block, self.log_index.unwrap_or(u64::MAX)))
    }

    pub fn age_ms(&self) -> u64 {
        now().saturating_sub(self.updated_at)
    }

    /// Whether the snapshot is older than `max_age_ms`; zero disables the check
    pub fn is_stale(&self, max_age_ms: u64) -> bool {
        max_age_ms > 0 && self.age_ms() > max_age_ms
    }
}

/// Latest snapshot per exchange; `None` when the feed has delivered nothing usable
pub type PoolSnapshots = BTreeMap<DexId, Option<Arc<PoolReserves>>>;
