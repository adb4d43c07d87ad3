use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::{
    sync::{
        abi::{SYNC_EVENT_TOPIC, decode_reserves, parse_quantity},
        state::ReserveStore,
    },
    types::{BotError, DexId, PoolReserves, Result},
    utils::config::PoolConfig,
};

/// A `Sync` log as delivered by `eth_subscribe("logs")`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    pub address: String,
    pub data: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Deserialize)]
struct SubscriptionNotification {
    method: String,
    params: NotificationParams,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    result: SyncLog,
}

/// Parse a websocket text frame; `None` for anything that is not a log
/// notification (subscription acks, other methods). A JSON-RPC error reply
/// is a `BotError::WebSocket`: the subscription it answers does not exist.
pub fn parse_sync_notification(text: &str) -> Result<Option<SyncLog>> {
    let value: Value = serde_json::from_str(text)?;
    if let Some(error) = value.get("error") {
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        return Err(BotError::WebSocket(format!("request {} rejected: {}", id, error)));
    }
    if value.get("method").and_then(Value::as_str) != Some("eth_subscription") {
        return Ok(None);
    }

    let notification: SubscriptionNotification = serde_json::from_value(value)?;
    debug!("{} notification for {}", notification.method, notification.params.result.address);
    Ok(Some(notification.params.result))
}

/// Pushes pool reserves into the store on every `Sync` event of the
/// configured pairs
pub struct SyncEventSubscriber {
    ws_url: String,
    pools: Vec<PoolConfig>,
    store: Arc<ReserveStore>,
    reconnect_delay: Duration,
}

impl SyncEventSubscriber {
    pub fn new(ws_url: impl Into<String>, pools: Vec<PoolConfig>, store: Arc<ReserveStore>, reconnect_delay: Duration) -> Self {
        Self {
            ws_url: ws_url.into(),
            pools,
            store,
            reconnect_delay,
        }
    }

    pub fn subscription_request(&self) -> Value {
        let addresses: Vec<&str> = self.pools.iter().map(|p| p.address.as_str()).collect();
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_subscribe",
            "params": ["logs", { "address": addresses, "topics": [SYNC_EVENT_TOPIC] }],
        })
    }

    /// Apply one text frame; returns the exchange whose reserves changed
    pub fn handle_message(&self, text: &str) -> Result<Option<DexId>> {
        let Some(log) = parse_sync_notification(text)? else {
            return Ok(None);
        };

        if log.removed {
            debug!("Skipping removed log for {}", log.address);
            return Ok(None);
        }

        let Some(pool) = self
            .pools
            .iter()
            .find(|p| p.address.eq_ignore_ascii_case(&log.address))
        else {
            warn!("Sync event from unmonitored pool {}", log.address);
            return Ok(None);
        };

        let (reserve_a, reserve_b) = decode_reserves(&log.data)?.oriented(pool.token_a_is_token0);
        let mut reserves = PoolReserves::new(pool.dex, pool.address.clone(), reserve_a, reserve_b);
        if let Some(block) = log.block_number.as_deref() {
            reserves = reserves.with_block_number(parse_quantity(block)?);
        }
        if let Some(index) = log.log_index.as_deref() {
            reserves = reserves.with_log_index(parse_quantity(index)?);
        }

        self.store.publish(reserves)?;
        Ok(Some(pool.dex))
    }

    /// Stream events until shutdown, reconnecting after failures
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        while !*shutdown.borrow() {
            match self.stream(&mut shutdown).await {
                Ok(()) => info!("WebSocket stream to {} closed", self.ws_url),
                Err(e) => error!("WebSocket stream to {} failed: {}", self.ws_url, e),
            }

            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {
                    info!("Reconnecting to {}", self.ws_url);
                }
            }
        }

        info!("Sync event subscriber stopped");
        Ok(())
    }

    async fn stream(&self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        let (ws_stream, _) = connect_async(self.ws_url.as_str()).await?;
        info!("Connected to {}, subscribing to {} pools", self.ws_url, self.pools.len());

        let (mut write, mut read) = ws_stream.split();
        write
            .send(Message::Text(self.subscription_request().to_string().into()))
            .await?;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => match self.handle_message(text.as_str()) {
                        Ok(Some(dex_id)) => debug!("Reserves of {} updated from event", dex_id),
                        Ok(None) => {}
                        // a rejected subscription leaves the socket idle; reconnect
                        Err(e @ BotError::WebSocket(_)) => return Err(e),
                        Err(e) => warn!("Dropping malformed event: {}", e),
                    },
                    Some(Ok(Message::Ping(payload))) => write.send(Message::Pong(payload)).await?,
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::sync::state::ReserveSource;

    use super::*;

    const PAIR: &str = "0xAbCd000000000000000000000000000000000001";

    fn subscriber(store: Arc<ReserveStore>) -> SyncEventSubscriber {
        subscriber_at("ws://localhost:8546", store)
    }

    fn subscriber_at(ws_url: &str, store: Arc<ReserveStore>) -> SyncEventSubscriber {
        let pools = vec![PoolConfig {
            dex: DexId::QuickSwap,
            address: PAIR.into(),
            token_a_is_token0: false,
            fee_percent: None,
        }];
        SyncEventSubscriber::new(ws_url, pools, store, Duration::from_millis(10))
    }

    fn notification(address: &str, removed: bool) -> String {
        let data = format!("0x{:064x}{:064x}", 3_000_000_000u128, 500_000u128 * 10u128.pow(18));
        json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {
                "subscription": "0x9ce59a13059e417087c02d3236a0b1cc",
                "result": {
                    "address": address,
                    "topics": [SYNC_EVENT_TOPIC],
                    "data": data,
                    "blockNumber": "0x10",
                    "logIndex": "0x2",
                    "removed": removed,
                },
            },
        })
        .to_string()
    }

    #[test]
    fn test_subscription_request_filters_sync_topic() {
        let request = subscriber(Arc::new(ReserveStore::new([DexId::QuickSwap]))).subscription_request();
        assert_eq!(request["method"], "eth_subscribe");
        assert_eq!(request["params"][0], "logs");
        assert_eq!(request["params"][1]["address"][0], PAIR);
        assert_eq!(request["params"][1]["topics"][0], SYNC_EVENT_TOPIC);
    }

    #[test]
    fn test_sync_event_publishes_oriented_reserves() {
        let store = Arc::new(ReserveStore::new([DexId::QuickSwap]));
        let subscriber = subscriber(store.clone());

        let updated = subscriber
            .handle_message(&notification(&PAIR.to_lowercase(), false))
            .unwrap();
        assert_eq!(updated, Some(DexId::QuickSwap));

        let reserves = store.latest_reserves(DexId::QuickSwap).unwrap();
        assert_eq!(reserves.reserve_a, "500000000000000000000000");
        assert_eq!(reserves.reserve_b, "3000000000");
        assert_eq!(reserves.block_number, Some(16));
        assert_eq!(reserves.log_index, Some(2));
    }

    #[test]
    fn test_event_does_not_override_block_read_of_same_block() {
        let store = Arc::new(ReserveStore::new([DexId::QuickSwap]));
        store
            .publish(PoolReserves::new(DexId::QuickSwap, PAIR, "480000000000000000000000", "3100000000").with_block_number(16))
            .unwrap();

        let subscriber = subscriber(store.clone());
        subscriber.handle_message(&notification(PAIR, false)).unwrap();

        assert_eq!(store.latest_reserves(DexId::QuickSwap).unwrap().reserve_b, "3100000000");
    }

    #[test]
    fn test_ignores_acks_removed_logs_and_unknown_pools() {
        let store = Arc::new(ReserveStore::new([DexId::QuickSwap]));
        let subscriber = subscriber(store.clone());

        let ack = r#"{"jsonrpc":"2.0","id":1,"result":"0x9ce59a13059e417087c02d3236a0b1cc"}"#;
        assert_eq!(subscriber.handle_message(ack).unwrap(), None);
        assert_eq!(subscriber.handle_message(&notification(PAIR, true)).unwrap(), None);
        assert_eq!(
            subscriber
                .handle_message(&notification("0x0000000000000000000000000000000000000bad", false))
                .unwrap(),
            None
        );
        assert!(store.latest_reserves(DexId::QuickSwap).is_none());
    }

    #[test]
    fn test_rejected_subscription_is_error() {
        let store = Arc::new(ReserveStore::new([DexId::QuickSwap]));
        let subscriber = subscriber(store.clone());

        let reply = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"the method eth_subscribe does not exist"}}"#;
        let err = subscriber.handle_message(reply).unwrap_err();

        assert!(matches!(err, BotError::WebSocket(ref msg) if msg.contains("eth_subscribe does not exist")));
        assert!(store.latest_reserves(DexId::QuickSwap).is_none());
    }

    #[tokio::test]
    async fn test_stream_ends_when_node_rejects_subscription() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let node = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            let request = ws.next().await.unwrap().unwrap();
            assert!(request.to_text().unwrap().contains("eth_subscribe"));

            let reply = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#;
            ws.send(Message::Text(reply.to_string().into())).await.unwrap();
            // keep the socket open; only the reply should end the stream
            let _ = ws.next().await;
        });

        let subscriber = subscriber_at(&url, Arc::new(ReserveStore::new([DexId::QuickSwap])));
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let result = tokio::time::timeout(Duration::from_secs(5), subscriber.stream(&mut shutdown_rx))
            .await
            .unwrap();
        assert!(matches!(result, Err(BotError::WebSocket(_))));
        node.abort();
    }

    #[test]
    fn test_garbage_frame_is_error() {
        let subscriber = subscriber(Arc::new(ReserveStore::new([DexId::QuickSwap])));
        assert!(subscriber.handle_message("not json").is_err());
    }
}
