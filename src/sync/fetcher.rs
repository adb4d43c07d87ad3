use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::{
    sync::rpc::RpcClient,
    types::{BotError, PoolReserves, Result},
    utils::config::{PoolConfig, SyncConfig},
};

pub struct ReserveFetcher {
    rpc_client: Arc<dyn RpcClient>,
    config: SyncConfig,
}

impl ReserveFetcher {
    pub fn new(rpc_client: Arc<dyn RpcClient>, config: SyncConfig) -> Self {
        Self { rpc_client, config }
    }

    pub async fn fetch_with_retry(&self, pool: &PoolConfig) -> Result<PoolReserves> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            debug!("Fetch attempt {}/{} for {} pool {}", attempt + 1, attempts, pool.dex, pool.address);

            match self.fetch_once(pool).await {
                Ok(reserves) => {
                    debug!("Fetched {} reserves on attempt {}", pool.dex, attempt + 1);
                    return Ok(reserves);
                }
                Err(e) => {
                    warn!("Fetch attempt {} failed for {}: {}", attempt + 1, pool.dex, e);
                    last_error = Some(e);

                    if attempt + 1 < attempts {
                        tokio::time::sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        error!("All {} attempts exhausted for {} pool {}", attempts, pool.dex, pool.address);
        Err(BotError::Sync(format!(
            "Failed to fetch {} pool {} after {} attempts: {}",
            pool.dex,
            pool.address,
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn fetch_once(&self, pool: &PoolConfig) -> Result<PoolReserves> {
        // reserves are read at the block they are labelled with
        let block_number = self.rpc_client.block_number().await?;
        let raw = self.rpc_client.get_reserves(&pool.address, Some(block_number)).await?;
        let (reserve_a, reserve_b) = raw.oriented(pool.token_a_is_token0);

        Ok(PoolReserves::new(pool.dex, pool.address.clone(), reserve_a, reserve_b).with_block_number(block_number))
    }

    /// Fetch every pool concurrently; failed pools are logged and left out
    pub async fn fetch_all(&self, pools: &[PoolConfig]) -> Vec<PoolReserves> {
        info!("Fetching reserves of {} pools", pools.len());

        let results = join_all(pools.iter().map(|pool| self.fetch_with_retry(pool))).await;
        results
            .into_iter()
            .filter_map(|result| match result {
                Ok(reserves) => Some(reserves),
                Err(e) => {
                    error!("{}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use async_trait::async_trait;

    use crate::{sync::abi::RawReserves, types::DexId};

    use super::*;

    /// Fails the first `failures` calls, then serves fixed reserves
    struct FlakyRpc {
        failures: u32,
        calls: AtomicU32,
        requested_blocks: Mutex<Vec<Option<u64>>>,
    }

    impl FlakyRpc {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                requested_blocks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RpcClient for FlakyRpc {
        async fn get_reserves(&self, _pool_address: &str, block_number: Option<u64>) -> Result<RawReserves> {
            self.requested_blocks.lock().unwrap().push(block_number);
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(BotError::Rpc("timeout".into()));
            }
            Ok(RawReserves {
                reserve0: "3000000000".into(),
                reserve1: "500000000000000000000000".into(),
            })
        }

        async fn block_number(&self) -> Result<u64> {
            Ok(42)
        }

        fn is_healthy(&self) -> bool {
            true
        }
    }

    fn config(max_retries: u32) -> SyncConfig {
        SyncConfig {
            max_retries,
            retry_delay_ms: 1,
            ..SyncConfig::default()
        }
    }

    fn pool(dex: DexId) -> PoolConfig {
        PoolConfig {
            dex,
            address: "0xpair".into(),
            token_a_is_token0: false,
            fee_percent: None,
        }
    }

    #[tokio::test]
    async fn test_retries_then_orients_reserves() {
        let rpc = Arc::new(FlakyRpc::new(2));
        let fetcher = ReserveFetcher::new(rpc.clone(), config(3));

        let reserves = fetcher.fetch_with_retry(&pool(DexId::QuickSwap)).await.unwrap();
        assert_eq!(reserves.reserve_a, "500000000000000000000000");
        assert_eq!(reserves.reserve_b, "3000000000");
        assert_eq!(reserves.block_number, Some(42));

        // every read is pinned to the block the snapshot is labelled with
        let requested = rpc.requested_blocks.lock().unwrap();
        assert_eq!(requested.len(), 3);
        assert!(requested.iter().all(|block| *block == Some(42)));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let rpc = Arc::new(FlakyRpc::new(10));
        let fetcher = ReserveFetcher::new(rpc.clone(), config(2));

        let err = fetcher.fetch_with_retry(&pool(DexId::QuickSwap)).await.unwrap_err();
        assert!(matches!(err, BotError::Sync(_)));
        assert_eq!(rpc.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_all_skips_failures() {
        let rpc = Arc::new(FlakyRpc::new(1));
        let fetcher = ReserveFetcher::new(rpc, config(1));

        let fetched = fetcher
            .fetch_all(&[pool(DexId::QuickSwap), pool(DexId::SushiSwap)])
            .await;
        assert_eq!(fetched.len(), 1);
    }
}
