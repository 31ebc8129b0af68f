/// Steem SDK - Session Client
///
/// Owns one node connection, one call counter and one key table. Everything
/// a typical application needs is reachable from here.

use serde_json::Value;
use std::sync::Arc;

use crate::broadcast::{custom_json_role, Broadcaster, TransactionAssembler};
use crate::config::{ClientConfig, RefBlockPolicy};
use crate::crypto::PrivateKey;
use crate::error::{Error, Result};
use crate::fetcher::ConcurrentBlockFetcher;
use crate::keystore::{KeyRole, KeyStore};
use crate::protocol::{Authority, Operation, SignedTransaction};
use crate::rpc_client::RpcClient;
use crate::types::{BroadcastResult, WrapBlock};

#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    rpc: Arc<RpcClient>,
    keys: KeyStore,
    broadcaster: Broadcaster,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let rpc = Arc::new(RpcClient::from_config(&config));
        let broadcaster = Broadcaster::new(Arc::clone(&rpc), &config);
        Client { config, rpc, keys: KeyStore::new(), broadcaster }
    }

    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn broadcast(&self) -> &Broadcaster {
        &self.broadcaster
    }

    // ========================================================================
    // KEYS
    // ========================================================================

    /// Import a WIF key for `role` (`owner`, `active`, `posting` or `memo`)
    pub fn import_wif(&self, role: &str, wif: &str) -> Result<()> {
        self.keys.import(role, wif)
    }

    pub fn key(&self, role: KeyRole) -> Result<PrivateKey> {
        self.keys.get(role)
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    // ========================================================================
    // CALLS
    // ========================================================================

    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.rpc.call(method, params).await
    }

    /// Signed call using the imported key for `role`
    pub async fn signed_call(
        &self,
        method: &str,
        params: Vec<Value>,
        account: &str,
        role: KeyRole,
    ) -> Result<Value> {
        if !self.rpc.supports_signed_calls() {
            return Err(Error::UnsupportedTransport { url: self.config.url.clone() });
        }
        let key = self.keys.get(role)?;
        self.rpc.signed_call(method, params, account, &[key]).await
    }

    /// Blocks `[from, to)` using the configured retry budget and in-flight cap
    pub async fn get_blocks(&self, from: u32, to: u32) -> Result<Vec<WrapBlock>> {
        ConcurrentBlockFetcher::from_config(Arc::clone(&self.rpc), &self.config)
            .fetch_range(from, to)
            .await
    }

    pub async fn get_transaction_hex(&self, tx: &SignedTransaction) -> Result<String> {
        self.rpc.get_transaction_hex(tx).await
    }

    // ========================================================================
    // BROADCAST
    // ========================================================================

    /// Sign `operations` with the imported `role` key, bound to the head block.
    pub async fn broadcast_raw_ops(
        &self,
        operations: Vec<Operation>,
        role: KeyRole,
    ) -> Result<BroadcastResult> {
        if operations.is_empty() {
            return Err(Error::EmptyOperationList);
        }
        let key = self.keys.get(role)?;

        let assembler = TransactionAssembler::new(Arc::clone(&self.rpc))
            .with_policy(RefBlockPolicy::Head)
            .with_expiration(self.config.expiration);
        let mut tx = SignedTransaction::new(assembler.prepare(operations).await?);

        self.broadcaster.signer().sign(&mut tx, std::slice::from_ref(&key))?;
        if tx.signatures().len() != 1 {
            return Err(Error::SigningFailed(format!(
                "expected 1 signature, transaction carries {}",
                tx.signatures().len()
            )));
        }

        self.broadcaster.submitter().submit(&tx).await
    }

    /// Broadcast operations with the one imported key their authority needs.
    ///
    /// A batch with any active operation is signed by the active key alone.
    pub async fn send(&self, operations: Vec<Operation>) -> Result<BroadcastResult> {
        if operations.is_empty() {
            return Err(Error::EmptyOperationList);
        }
        let role = Authority::for_operations(&operations).key_role();
        let key = self.keys.get(role)?;

        self.broadcaster.send(operations, std::slice::from_ref(&key)).await
    }

    /// `custom_json` signed with the active or posting key as the auths require
    pub async fn custom_json(
        &self,
        required_auths: &[String],
        required_posting_auths: &[String],
        id: &str,
        json: &str,
    ) -> Result<BroadcastResult> {
        let key = self.keys.get(custom_json_role(required_auths))?;
        self.broadcaster
            .custom_json(required_auths, required_posting_auths, id, json, &key)
            .await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIF: &str = "5JLw5dgQAx6rhZEgNN5C2ds1V47RweGshynFSWFbaMohsYsBvE8";

    #[test]
    fn test_import_and_lookup() {
        let client = Client::default();
        client.import_wif("posting", WIF).unwrap();
        assert_eq!(client.key(KeyRole::Posting).unwrap().to_wif(), WIF);
        assert!(matches!(client.import_wif("root", WIF), Err(Error::InvalidRole(_))));
    }

    #[tokio::test]
    async fn test_signed_call_over_websocket_rejected_before_key_lookup() {
        let client = Client::new(ClientConfig::with_url("ws://localhost:8090"));
        let err = client
            .signed_call("condenser_api.get_accounts", vec![], "alice", KeyRole::Posting)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransport { .. }));
    }

    #[tokio::test]
    async fn test_broadcast_requires_key() {
        let client = Client::new(ClientConfig::with_url("http://127.0.0.1:1"));
        let err = client
            .broadcast_raw_ops(vec![Operation::vote("alice", "bob", "p", 10000)], KeyRole::Posting)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(KeyRole::Posting)));

        let err = client.broadcast_raw_ops(vec![], KeyRole::Posting).await.unwrap_err();
        assert!(matches!(err, Error::EmptyOperationList));
    }

    #[tokio::test]
    async fn test_mixed_batch_needs_active_key() {
        let client = Client::new(ClientConfig::with_url("http://127.0.0.1:1"));
        client.import_wif("posting", WIF).unwrap();

        let err = client
            .send(vec![
                Operation::vote("alice", "bob", "p", 10000),
                Operation::transfer("alice", "bob", crate::protocol::Asset::steem(1), ""),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(KeyRole::Active)));
        assert_eq!(client.rpc().seq_no(), 0);

        assert!(matches!(client.send(vec![]).await, Err(Error::EmptyOperationList)));
    }

    #[tokio::test]
    async fn test_get_blocks_invalid_range() {
        let client = Client::default();
        assert!(matches!(client.get_blocks(5, 5).await, Err(Error::InvalidRange { from: 5, to: 5 })));
        assert_eq!(client.rpc().seq_no(), 0);
    }
}
