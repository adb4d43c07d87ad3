use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    sync::abi::{GET_RESERVES_SELECTOR, RawReserves, decode_reserves, parse_quantity},
    types::{BotError, Result},
};

#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Reserves of a constant-product pair contract as of `block_number`,
    /// or the latest block when `None`
    async fn get_reserves(&self, pool_address: &str, block_number: Option<u64>) -> Result<RawReserves>;
    async fn block_number(&self) -> Result<u64>;
    fn is_healthy(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Ethereum JSON-RPC over HTTP
pub struct JsonRpcClient {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
    health_status: AtomicBool,
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        info!("Initializing RPC client with endpoint: {}", endpoint);
        Self {
            endpoint,
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            health_status: AtomicBool::new(true),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let result = self.send(method, params).await;
        self.health_status.store(result.is_ok(), Ordering::Relaxed);
        if let Err(e) = &result {
            warn!("RPC {} failed: {}", method, e);
        }
        result
    }

    async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!("RPC request {} #{}", method, id);
        let response: JsonRpcResponse = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(BotError::Rpc(format!("{} ({})", error.message, error.code)));
        }
        response
            .result
            .ok_or_else(|| BotError::Rpc(format!("{} returned no result", method)))
    }
}

fn block_tag(block_number: Option<u64>) -> String {
    match block_number {
        Some(number) => format!("0x{:x}", number),
        None => "latest".to_string(),
    }
}

fn as_hex_string(value: Value, what: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(BotError::Rpc(format!("{} is not a hex string: {}", what, other))),
    }
}

#[async_trait]
impl RpcClient for JsonRpcClient {
    async fn get_reserves(&self, pool_address: &str, block_number: Option<u64>) -> Result<RawReserves> {
        let tag = block_tag(block_number);
        debug!("Fetching reserves via RPC for pool {} at {}", pool_address, tag);
        let params = json!([{ "to": pool_address, "data": GET_RESERVES_SELECTOR }, tag]);
        let data = as_hex_string(self.call("eth_call", params).await?, "eth_call result")?;
        decode_reserves(&data)
    }

    async fn block_number(&self) -> Result<u64> {
        let value = as_hex_string(self.call("eth_blockNumber", json!([])).await?, "block number")?;
        parse_quantity(&value)
    }

    fn is_healthy(&self) -> bool {
        self.health_status.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn reserves_payload() -> String {
        format!(
            "0x{:064x}{:064x}{:064x}",
            500_000u128 * 10u128.pow(18),
            3_000_000_000u128,
            1_700_000_000u128
        )
    }

    #[tokio::test]
    async fn test_get_reserves() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "eth_call",
                "params": [{ "to": "0xpair", "data": GET_RESERVES_SELECTOR }, "latest"],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": reserves_payload() }).to_string())
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        let reserves = client.get_reserves("0xpair", None).await.unwrap();

        assert_eq!(reserves.reserve0, "500000000000000000000000");
        assert_eq!(reserves.reserve1, "3000000000");
        assert!(client.is_healthy());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_reserves_pinned_to_block() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "eth_call",
                "params": [{ "to": "0xpair", "data": GET_RESERVES_SELECTOR }, "0x3039"],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": reserves_payload() }).to_string())
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        client.get_reserves("0xpair", Some(12345)).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_block_number() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x3039"}"#)
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        assert_eq!(client.block_number().await.unwrap(), 12345);
    }

    #[tokio::test]
    async fn test_rpc_error_marks_unhealthy() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"execution reverted"}}"#)
            .create_async()
            .await;

        let client = JsonRpcClient::new(server.url());
        let err = client.get_reserves("0xpair", None).await.unwrap_err();

        assert!(matches!(err, BotError::Rpc(ref msg) if msg.contains("execution reverted")));
        assert!(!client.is_healthy());
    }

    #[tokio::test]
    async fn test_http_failure_is_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/").with_status(503).create_async().await;

        let client = JsonRpcClient::new(server.url());
        assert!(matches!(client.block_number().await, Err(BotError::Http(_))));
    }
}
