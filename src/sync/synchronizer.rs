use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    event::websocket::SyncEventSubscriber,
    sync::{
        fetcher::ReserveFetcher,
        rpc::{JsonRpcClient, RpcClient},
        state::ReserveStore,
    },
    types::{BotError, Result},
    utils::config::{PoolConfig, SyncConfig},
};

/// Keeps the reserve store current: an initial full fetch, then `Sync`
/// events with a periodic poll as fallback
pub struct ReserveSynchronizer {
    store: Arc<ReserveStore>,
    fetcher: Arc<ReserveFetcher>,
    subscriber: Option<Arc<SyncEventSubscriber>>,
    pools: Vec<PoolConfig>,
    config: SyncConfig,
}

impl ReserveSynchronizer {
    pub fn store(&self) -> Arc<ReserveStore> {
        self.store.clone()
    }

    pub async fn initialize(&self) -> Result<usize> {
        let published = self.sync_all().await;
        if published == 0 {
            warn!("Initial sync published no reserves; every exchange is unquotable until the feed recovers");
        }
        Ok(published)
    }

    /// Fetch and publish every pool, returning how many were published
    pub async fn sync_all(&self) -> usize {
        let fetched = self.fetcher.fetch_all(&self.pools).await;
        let mut published = 0;

        for reserves in fetched {
            let dex_id = reserves.dex_id;
            match self.store.publish(reserves) {
                Ok(()) => published += 1,
                Err(e) => error!("Failed to publish {} reserves: {}", dex_id, e),
            }
        }

        info!("Sync completed: {}/{} pools updated", published, self.pools.len());
        published
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let subscriber_task = self.subscriber.clone().map(|subscriber| {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { subscriber.run(shutdown).await })
        });

        if self.config.poll_interval_ms == 0 {
            debug!("Periodic polling disabled");
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        } else {
            let period = self.config.poll_interval();
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        debug!("Polling reserves");
                        self.sync_all().await;
                    }
                }
            }
        }

        if let Some(task) = subscriber_task {
            match task.await {
                Ok(result) => result?,
                Err(e) => error!("Subscriber task failed: {}", e),
            }
        }

        info!("Reserve synchronizer stopped");
        Ok(())
    }
}

pub struct ReserveSynchronizerBuilder {
    store: Option<Arc<ReserveStore>>,
    rpc_client: Option<Arc<dyn RpcClient>>,
    rpc_endpoint: Option<String>,
    ws_url: Option<String>,
    pools: Vec<PoolConfig>,
    config: Option<SyncConfig>,
}

impl ReserveSynchronizerBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            rpc_client: None,
            rpc_endpoint: None,
            ws_url: None,
            pools: Vec::new(),
            config: None,
        }
    }

    pub fn with_store(mut self, store: Arc<ReserveStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_rpc_client(mut self, rpc_client: Arc<dyn RpcClient>) -> Self {
        self.rpc_client = Some(rpc_client);
        self
    }

    pub fn with_rpc_endpoint(mut self, endpoint: String) -> Self {
        self.rpc_endpoint = Some(endpoint);
        self
    }

    /// Without a websocket url the feed relies on polling alone
    pub fn with_ws_url(mut self, ws_url: String) -> Self {
        self.ws_url = Some(ws_url).filter(|url| !url.is_empty());
        self
    }

    pub fn with_pools(mut self, pools: Vec<PoolConfig>) -> Self {
        self.pools = pools;
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<ReserveSynchronizer> {
        let config = self
            .config
            .ok_or_else(|| BotError::Config("SyncConfig is required".to_string()))?;

        if self.pools.is_empty() {
            return Err(BotError::Config("At least one pool is required".to_string()));
        }

        let rpc_client = match (self.rpc_client, self.rpc_endpoint) {
            (Some(client), _) => client,
            (None, Some(endpoint)) => Arc::new(JsonRpcClient::new(endpoint)) as Arc<dyn RpcClient>,
            (None, None) => return Err(BotError::Config("RPC endpoint is required".to_string())),
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(ReserveStore::new(self.pools.iter().map(|p| p.dex))));

        let subscriber = self.ws_url.map(|ws_url| {
            Arc::new(SyncEventSubscriber::new(
                ws_url,
                self.pools.clone(),
                store.clone(),
                config.reconnect_delay(),
            ))
        });

        let fetcher = Arc::new(ReserveFetcher::new(rpc_client, config.clone()));

        Ok(ReserveSynchronizer {
            store,
            fetcher,
            subscriber,
            pools: self.pools,
            config,
        })
    }
}

impl Default for ReserveSynchronizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
