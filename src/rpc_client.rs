/// Steem SDK - JSON-RPC Client
///
/// HTTP client for communicating with a Steem node. Plain calls, signed
/// (authenticated) calls and the handful of `condenser_api` methods the
/// transaction pipeline needs.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::chain_state::ChainState;
use crate::config::{ClientConfig, DEFAULT_TIMEOUT_SECS};
use crate::crypto::DigestSigner;
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::SignedTransaction;
use crate::rpc::signed_call;
use crate::types::{Block, BroadcastResult, DynamicGlobalProperties, RpcRequest, RpcResponse};

// ============================================================================
// RPC CLIENT
// ============================================================================

/// Client for one node endpoint.
///
/// Each client is its own session: the JSON-RPC id counter is never shared
/// between clients.
#[derive(Debug)]
pub struct RpcClient {
    /// Node endpoint URL
    url: String,

    /// HTTP client
    client: Client,

    /// Last JSON-RPC id handed out
    seq_no: AtomicU64,
}

impl RpcClient {
    /// Create a client for `url` with the default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        RpcClient {
            url: url.into(),
            client,
            seq_no: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::with_timeout(config.url.clone(), config.timeout)
    }

    /// Create a client from `STEEM_RPC_URL` / `STEEM_RPC_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_config(&ClientConfig::from_env())
    }

    pub fn endpoint_url(&self) -> &str {
        &self.url
    }

    /// Number of request ids issued so far in this session
    pub fn seq_no(&self) -> u64 {
        self.seq_no.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> u64 {
        self.seq_no.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Signed calls are request/response only; anything but HTTP(S) is refused.
    pub fn supports_signed_calls(&self) -> bool {
        Url::parse(&self.url)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    // ========================================================================
    // PLAIN CALLS
    // ========================================================================

    /// Call `method` and return the raw `result` member.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let request = RpcRequest::new(method, params, self.next_id());
        self.send(&request).await
    }

    pub async fn call_with_result<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T> {
        let value = self.call(method, params).await?;
        decode_result(method, value)
    }

    /// Retry a read-only call on node or network failure.
    ///
    /// Never use this for broadcasts: a resend after an ambiguous failure can
    /// apply a transaction twice.
    pub async fn call_with_retry(
        &self,
        method: &str,
        params: Vec<Value>,
        max_attempts: u32,
        delay: Duration,
    ) -> Result<Value> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.call(method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.kind() == ErrorKind::Network => {
                    warn!(method, attempt, error = %e, "rpc call failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ========================================================================
    // SIGNED CALLS
    // ========================================================================

    /// Call `method` with an authentication envelope signed by `keys`.
    ///
    /// Fails with `UnsupportedTransport` before any signing when the endpoint
    /// is not HTTP(S). Past that check every call consumes an id.
    pub async fn signed_call<K: DigestSigner>(
        &self,
        method: &str,
        params: Vec<Value>,
        account: &str,
        keys: &[K],
    ) -> Result<Value> {
        if !self.supports_signed_calls() {
            return Err(Error::UnsupportedTransport { url: self.url.clone() });
        }

        // Counts the attempt even when signing fails below
        let id = self.next_id();
        let envelope = signed_call::sign(method, params, account, keys)?;
        let request = RpcRequest::new(method, envelope.to_wire_params()?, id);
        self.send(&request).await
    }

    pub async fn signed_call_with_result<T: DeserializeOwned, K: DigestSigner>(
        &self,
        method: &str,
        params: Vec<Value>,
        account: &str,
        keys: &[K],
    ) -> Result<T> {
        let value = self.signed_call(method, params, account, keys).await?;
        decode_result(method, value)
    }

    // ========================================================================
    // CHAIN QUERIES
    // ========================================================================

    pub async fn get_dynamic_global_properties(&self) -> Result<DynamicGlobalProperties> {
        self.call_with_result("condenser_api.get_dynamic_global_properties", vec![])
            .await
    }

    /// `Ok(None)` when the node returns `null` for a block it does not have
    pub async fn get_block(&self, block_num: u32) -> Result<Option<Block>> {
        let method = "condenser_api.get_block";
        match self.call(method, vec![json!(block_num)]).await? {
            Value::Null => Ok(None),
            value => decode_result(method, value).map(Some),
        }
    }

    /// Node-side hex serialization of a transaction, for comparing against local bytes.
    pub async fn get_transaction_hex(&self, tx: &SignedTransaction) -> Result<String> {
        self.call_with_result("condenser_api.get_transaction_hex", vec![serde_json::to_value(tx)?])
            .await
    }

    /// Submit and wait for inclusion. Not retried here.
    pub async fn broadcast_transaction_synchronous(
        &self,
        tx: &SignedTransaction,
    ) -> Result<BroadcastResult> {
        self.call_with_result(
            "condenser_api.broadcast_transaction_synchronous",
            vec![serde_json::to_value(tx)?],
        )
        .await
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    async fn send(&self, request: &RpcRequest) -> Result<Value> {
        let method = request.method.as_str();
        debug!(method, id = request.id, "sending rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|source| Error::Network { method: method.to_string(), source })?;

        let status = response.status();
        let body: RpcResponse = match response.json().await {
            Ok(body) => body,
            Err(source) if status.is_success() => {
                return Err(Error::Network { method: method.to_string(), source })
            }
            Err(_) => {
                return Err(Error::Rpc {
                    method: method.to_string(),
                    code: i64::from(status.as_u16()),
                    message: format!("node returned HTTP status {}", status),
                })
            }
        };

        if let Some(error) = body.error {
            return Err(Error::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

fn decode_result<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::Serialization(format!("unexpected result for {}: {}", method, e)))
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

#[async_trait]
impl ChainState for RpcClient {
    async fn get_chain_head_properties(&self) -> Result<DynamicGlobalProperties> {
        self.get_dynamic_global_properties().await
    }

    async fn get_block(&self, block_num: u32) -> Result<Option<Block>> {
        RpcClient::get_block(self, block_num).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    const WIF: &str = "5JLw5dgQAx6rhZEgNN5C2ds1V47RweGshynFSWFbaMohsYsBvE8";

    #[test]
    fn test_client_creation() {
        let client = RpcClient::new("http://localhost:8090");
        assert_eq!(client.endpoint_url(), "http://localhost:8090");
        assert_eq!(client.seq_no(), 0);

        let client = RpcClient::default();
        assert_eq!(client.endpoint_url(), "https://api.steemit.com");
    }

    #[test]
    fn test_scheme_check() {
        assert!(RpcClient::new("http://localhost:8090").supports_signed_calls());
        assert!(RpcClient::new("HTTPS://api.steemit.com").supports_signed_calls());
        assert!(!RpcClient::new("wss://api.steemit.com").supports_signed_calls());
        assert!(!RpcClient::new("ws://localhost:8090").supports_signed_calls());
        assert!(!RpcClient::new("not a url").supports_signed_calls());
    }

    #[test]
    fn test_ids_are_per_session() {
        let a = RpcClient::new("http://localhost:8090");
        let b = RpcClient::new("http://localhost:8090");
        assert_eq!(a.next_id(), 1);
        assert_eq!(a.next_id(), 2);
        assert_eq!(b.next_id(), 1);
        assert_eq!(a.seq_no(), 2);
    }

    #[tokio::test]
    async fn test_signed_call_over_websocket_rejected() {
        let client = RpcClient::new("wss://api.steemit.com");
        let key = PrivateKey::from_wif(WIF).unwrap();

        let err = client
            .signed_call("condenser_api.get_accounts", vec![json!(["alice"])], "alice", &[key])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedTransport { .. }));
        assert_eq!(client.seq_no(), 0);
    }

    #[tokio::test]
    async fn test_signing_failure_still_consumes_id() {
        let client = RpcClient::new("http://127.0.0.1:1");
        let no_keys: [PrivateKey; 0] = [];

        let err = client
            .signed_call("condenser_api.get_accounts", vec![json!(["alice"])], "alice", &no_keys)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoKeysProvided));
        assert_eq!(client.seq_no(), 1);
        assert_eq!(client.next_id(), 2);
    }

    #[tokio::test]
    async fn test_disconnected_endpoint_is_network_error() {
        let client = RpcClient::with_timeout("http://127.0.0.1:1", Duration::from_secs(2));
        let err = client.get_dynamic_global_properties().await.unwrap_err();

        assert!(matches!(err, Error::Network { .. }));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable_before_send());
        assert_eq!(client.seq_no(), 1);
    }
}
