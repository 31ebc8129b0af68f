// ============================================================================
// Broadcast Module - Prepare, Sign & Submit Transactions
// ============================================================================
//
// Components:
//   - assembler: reference block, expiration and operation list
//   - signer: digest over chain id + body, one signature per key
//   - submitter: synchronous broadcast with pre-send-only retry
//
// `Broadcaster` chains the three for the common case.
//
// ============================================================================

pub mod assembler;
pub mod signer;
pub mod submitter;

pub use assembler::{RefBlock, TransactionAssembler};
pub use signer::TransactionSigner;
pub use submitter::BroadcastSubmitter;

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::crypto::DigestSigner;
use crate::error::Result;
use crate::keystore::KeyRole;
use crate::protocol::{CustomJsonOperation, Operation, SignedTransaction};
use crate::rpc_client::RpcClient;
use crate::types::BroadcastResult;

/// One-call transaction pipeline bound to a node.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    client: Arc<RpcClient>,
    assembler: TransactionAssembler<Arc<RpcClient>>,
    signer: TransactionSigner,
    submitter: BroadcastSubmitter,
}

impl Broadcaster {
    pub fn new(client: Arc<RpcClient>, config: &ClientConfig) -> Self {
        Broadcaster {
            assembler: TransactionAssembler::new(Arc::clone(&client))
                .with_policy(config.ref_block_policy)
                .with_expiration(config.expiration),
            signer: TransactionSigner::new(config.chain_id),
            submitter: BroadcastSubmitter::new(Arc::clone(&client))
                .with_connect_retries(config.broadcast_connect_retries),
            client,
        }
    }

    pub fn assembler(&self) -> &TransactionAssembler<Arc<RpcClient>> {
        &self.assembler
    }

    pub fn signer(&self) -> &TransactionSigner {
        &self.signer
    }

    pub fn submitter(&self) -> &BroadcastSubmitter {
        &self.submitter
    }

    /// Prepare and sign without submitting
    pub async fn sign<K: DigestSigner>(
        &self,
        operations: Vec<Operation>,
        keys: &[K],
    ) -> Result<SignedTransaction> {
        let mut tx = SignedTransaction::new(self.assembler.prepare(operations).await?);
        self.signer.sign(&mut tx, keys)?;
        Ok(tx)
    }

    /// Prepare, sign with every key and broadcast.
    pub async fn send<K: DigestSigner>(
        &self,
        operations: Vec<Operation>,
        keys: &[K],
    ) -> Result<BroadcastResult> {
        let tx = self.sign(operations, keys).await?;
        self.submitter.submit(&tx).await
    }

    /// Single operation, single key
    pub async fn send_with<K: DigestSigner>(&self, operation: Operation, key: &K) -> Result<BroadcastResult> {
        self.send(vec![operation], std::slice::from_ref(key)).await
    }

    /// Broadcast a `custom_json` operation; both auth lists are sorted first.
    ///
    /// `key` must be the active key when `required_auths` is non-empty and
    /// the posting key otherwise (see [`custom_json_role`]).
    pub async fn custom_json<K: DigestSigner>(
        &self,
        required_auths: &[String],
        required_posting_auths: &[String],
        id: &str,
        json: &str,
        key: &K,
    ) -> Result<BroadcastResult> {
        let op = CustomJsonOperation::new(required_auths, required_posting_auths, id, json);
        self.send_with(Operation::CustomJson(op), key).await
    }

    pub async fn get_transaction_hex(&self, tx: &SignedTransaction) -> Result<String> {
        self.client.get_transaction_hex(tx).await
    }
}

/// Key role a `custom_json` with these required auths must be signed with
pub fn custom_json_role(required_auths: &[String]) -> KeyRole {
    if required_auths.is_empty() {
        KeyRole::Posting
    } else {
        KeyRole::Active
    }
}
