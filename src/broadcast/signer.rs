/// Transaction signing over `sha256(chain_id || serialized transaction)`.

use std::sync::Arc;
use tracing::{debug, enabled, Level};

use crate::crypto::{DigestSigner, PublicKey, Signature};
use crate::error::{Error, Result};
use crate::protocol::{ChainId, GrapheneSerializer, SignedTransaction, TransactionSerializer};

#[derive(Clone)]
pub struct TransactionSigner {
    chain_id: ChainId,
    serializer: Arc<dyn TransactionSerializer>,
}

impl TransactionSigner {
    pub fn new(chain_id: ChainId) -> Self {
        TransactionSigner { chain_id, serializer: Arc::new(GrapheneSerializer) }
    }

    /// Replace the byte serializer used for the digest
    pub fn with_serializer(mut self, serializer: Arc<dyn TransactionSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn digest(&self, tx: &SignedTransaction) -> Result<[u8; 32]> {
        tx.transaction().digest_with(&self.chain_id, self.serializer.as_ref())
    }

    /// Sign with every key, in order, replacing any existing signatures.
    ///
    /// The signature list is only swapped in once every key has signed; on
    /// error the transaction is left untouched.
    pub fn sign<K: DigestSigner>(&self, tx: &mut SignedTransaction, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Err(Error::NoKeysProvided);
        }

        let digest = self.digest(tx)?;
        if enabled!(Level::DEBUG) {
            self.dump_unsigned(tx, &digest);
        }

        let signatures = keys
            .iter()
            .map(|key| key.sign_digest(&digest).map(|sig| sig.to_hex()))
            .collect::<Result<Vec<_>>>()?;

        if enabled!(Level::DEBUG) {
            check_first_signature(&signatures, keys, &digest);
        }

        tx.replace_signatures(signatures);
        debug!(signatures = ?tx.signatures(), "transaction signed");
        Ok(())
    }

    /// Public keys recovered from each signature, in signature order.
    pub fn recover_signers(&self, tx: &SignedTransaction) -> Result<Vec<PublicKey>> {
        let digest = self.digest(tx)?;
        tx.signatures()
            .iter()
            .map(|hex_sig| Signature::from_hex(hex_sig)?.recover(&digest))
            .collect()
    }

    fn dump_unsigned(&self, tx: &SignedTransaction, digest: &[u8; 32]) {
        if let Ok(json) = serde_json::to_string_pretty(tx.transaction()) {
            debug!("transaction before signing:\n{}", json);
        }
        if let Ok(bytes) = self.serializer.serialize(tx.transaction()) {
            debug!(hex = %hex::encode(bytes), "serialized transaction");
        }
        debug!(digest = %hex::encode(digest), chain_id = %self.chain_id.to_hex(), "transaction digest");
    }
}

impl std::fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("chain_id", &self.chain_id.to_hex())
            .finish()
    }
}

fn check_first_signature<K: DigestSigner>(signatures: &[String], keys: &[K], digest: &[u8; 32]) {
    let (Some(first), Some(expected)) = (signatures.first(), keys.first().and_then(|k| k.public_key()))
    else {
        return;
    };
    match Signature::from_hex(first).and_then(|sig| sig.recover(digest)) {
        Ok(recovered) if recovered == expected => {
            debug!(public_key = %recovered, "recovered public key matches signing key")
        }
        Ok(recovered) => debug!(
            recovered = %recovered,
            expected = %expected,
            "recovered public key does not match signing key"
        ),
        Err(e) => debug!(error = %e, "could not recover public key from signature"),
    }
}
