/// Transactions, reference-block helpers and the chain id used for digests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::operation::Operation;
use super::serializer::{GrapheneSerializer, TransactionSerializer};
use crate::crypto::sha256;
use crate::error::{Error, Result};

// ============================================================================
// CHAIN ID
// ============================================================================

/// Chain id mixed into every transaction digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainId(pub [u8; 32]);

impl ChainId {
    /// Steem mainnet uses the all-zero chain id
    pub const STEEM: ChainId = ChainId([0u8; 32]);

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s).map_err(|e| Error::Serialization(format!("bad chain id: {}", e)))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| Error::Serialization("chain id must be 32 bytes".into()))?;
        Ok(ChainId(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ChainId {
    fn default() -> Self {
        ChainId::STEEM
    }
}

// ============================================================================
// REFERENCE BLOCK HELPERS
// ============================================================================

/// Low 16 bits of a block number
pub fn ref_block_num(block_num: u32) -> u16 {
    (block_num & 0xFFFF) as u16
}

/// Bytes 4..8 of a block id, read little-endian.
///
/// The first four bytes of a block id are the block number itself, so the
/// prefix is the first part that actually depends on the block contents.
pub fn ref_block_prefix(block_id: &str) -> Result<u32> {
    let raw = hex::decode(block_id)
        .map_err(|e| Error::Serialization(format!("invalid block id '{}': {}", block_id, e)))?;
    if raw.len() < 8 {
        return Err(Error::Serialization(format!(
            "block id '{}' too short for a reference prefix",
            block_id
        )));
    }
    Ok(u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]))
}

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    #[serde(with = "graphene_time")]
    pub expiration: DateTime<Utc>,
    pub operations: Vec<Operation>,
    pub extensions: Vec<serde_json::Value>,
}

impl Transaction {
    pub fn serialize_with(&self, serializer: &dyn TransactionSerializer) -> Result<Vec<u8>> {
        serializer.serialize(self)
    }

    /// `sha256(chain_id || serialized transaction)`
    pub fn digest_with(
        &self,
        chain_id: &ChainId,
        serializer: &dyn TransactionSerializer,
    ) -> Result<[u8; 32]> {
        let bytes = serializer.serialize(self)?;
        let mut buf = Vec::with_capacity(32 + bytes.len());
        buf.extend_from_slice(&chain_id.0);
        buf.extend_from_slice(&bytes);
        Ok(sha256(&buf))
    }

    pub fn digest(&self, chain_id: &ChainId) -> Result<[u8; 32]> {
        self.digest_with(chain_id, &GrapheneSerializer)
    }

    /// Transaction id as reported by nodes: first 20 bytes of sha256 over the body.
    pub fn id(&self) -> Result<String> {
        let bytes = GrapheneSerializer.serialize(self)?;
        Ok(hex::encode(&sha256(&bytes)[..20]))
    }
}

/// A transaction plus the signatures over its digest.
///
/// Signatures can only be installed as a complete set, and any mutation of
/// the body drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    transaction: Transaction,
    signatures: Vec<String>,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        SignedTransaction { transaction, signatures: Vec::new() }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Append an operation. Existing signatures no longer cover the body and are discarded.
    pub fn push_operation(&mut self, op: Operation) {
        self.transaction.operations.push(op);
        self.signatures.clear();
    }

    pub(crate) fn replace_signatures(&mut self, signatures: Vec<String>) {
        self.signatures = signatures;
    }

    pub fn into_transaction(self) -> Transaction {
        self.transaction
    }
}

/// `YYYY-MM-DDTHH:MM:SS` in UTC, without a zone suffix.
mod graphene_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&s, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
