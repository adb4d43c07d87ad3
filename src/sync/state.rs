use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use tracing::debug;

use crate::types::{BotError, DexId, PoolReserves, PoolSnapshots, Result};

/// Read side of the reserve feed
pub trait ReserveSource: Send + Sync {
    /// Exchanges this source tracks
    fn dex_ids(&self) -> Vec<DexId>;

    /// Most recently published snapshot, `None` until the first update
    fn latest_reserves(&self, dex_id: DexId) -> Option<Arc<PoolReserves>>;

    /// Latest snapshot of every tracked exchange
    fn snapshots(&self) -> PoolSnapshots {
        self.dex_ids()
            .into_iter()
            .map(|dex_id| (dex_id, self.latest_reserves(dex_id)))
            .collect()
    }
}

/// One snapshot cell per exchange. Writers swap in a whole new `Arc`,
/// readers clone the current one, so a reader never sees a torn pair.
pub struct ReserveStore {
    cells: HashMap<DexId, RwLock<Option<Arc<PoolReserves>>>>,
}

impl ReserveStore {
    pub fn new(dex_ids: impl IntoIterator<Item = DexId>) -> Self {
        Self {
            cells: dex_ids.into_iter().map(|dex_id| (dex_id, RwLock::new(None))).collect(),
        }
    }

    /// Replace the snapshot of `reserves.dex_id`.
    ///
    /// Updates are ordered by chain position. One that sorts before the
    /// current snapshot is dropped, as is one without a block number once the
    /// cell holds a positioned snapshot. Within a block, a `Sync` log loses to
    /// a block-level read of the same block; equal positions replace.
    pub fn publish(&self, reserves: PoolReserves) -> Result<()> {
        let dex_id = reserves.dex_id;
        let cell = self
            .cells
            .get(&dex_id)
            .ok_or_else(|| BotError::dex(dex_id, "exchange not tracked"))?;

        let mut slot = cell.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = slot.as_ref().and_then(|r| r.chain_position());
        match (current, reserves.chain_position()) {
            (Some(current), Some(incoming)) if incoming < current => {
                debug!("Ignoring {} reserves at {:?}, older than {:?}", dex_id, incoming, current);
                return Ok(());
            }
            (Some(current), None) => {
                debug!("Ignoring {} reserves without block number, holding {:?}", dex_id, current);
                return Ok(());
            }
            _ => {}
        }

        debug!("Published {} reserves {} / {}", dex_id, reserves.reserve_a, reserves.reserve_b);
        *slot = Some(Arc::new(reserves));
        Ok(())
    }
}

impl ReserveSource for ReserveStore {
    fn dex_ids(&self) -> Vec<DexId> {
        let mut ids: Vec<DexId> = self.cells.keys().copied().collect();
        ids.sort();
        ids
    }

    fn latest_reserves(&self, dex_id: DexId) -> Option<Arc<PoolReserves>> {
        let cell = self.cells.get(&dex_id)?;
        let slot = cell.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.clone()
    }
}
