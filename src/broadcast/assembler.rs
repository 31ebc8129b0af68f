/// Transaction assembly: bind operations to a reference block and an expiration.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;
use tracing::debug;

use crate::chain_state::ChainState;
use crate::config::{RefBlockPolicy, DEFAULT_EXPIRATION_SECS};
use crate::error::{Error, Result};
use crate::protocol::{ref_block_num, ref_block_prefix, Operation, Transaction};

/// Block id used when a block reports no parent (genesis)
const ZERO_BLOCK_ID: &str = "0000000000000000000000000000000000000000";

/// Reference block a transaction is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefBlock {
    pub num: u16,
    pub prefix: u32,
}

/// Builds unsigned transactions from the current chain head.
///
/// Chain-state failures abort assembly and are never retried here; a retry
/// must start over from a fresh head.
#[derive(Debug, Clone)]
pub struct TransactionAssembler<C> {
    chain: C,
    policy: RefBlockPolicy,
    expiration: Duration,
}

impl<C: ChainState> TransactionAssembler<C> {
    pub fn new(chain: C) -> Self {
        TransactionAssembler {
            chain,
            policy: RefBlockPolicy::default(),
            expiration: Duration::from_secs(DEFAULT_EXPIRATION_SECS),
        }
    }

    pub fn with_policy(mut self, policy: RefBlockPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn policy(&self) -> RefBlockPolicy {
        self.policy
    }

    /// Unsigned transaction carrying `operations` in the given order.
    pub async fn prepare(&self, operations: Vec<Operation>) -> Result<Transaction> {
        if operations.is_empty() {
            return Err(Error::EmptyOperationList);
        }

        let reference = self.reference_block().await?;
        let expiration = self.expiration_from_now()?;

        debug!(
            ref_block_num = reference.num,
            ref_block_prefix = reference.prefix,
            %expiration,
            operations = operations.len(),
            "prepared transaction"
        );

        Ok(Transaction {
            ref_block_num: reference.num,
            ref_block_prefix: reference.prefix,
            expiration,
            operations,
            extensions: Vec::new(),
        })
    }

    /// Resolve the reference block under the configured policy.
    pub async fn reference_block(&self) -> Result<RefBlock> {
        let props = self
            .chain
            .get_chain_head_properties()
            .await
            .map_err(|e| Error::PropertiesFetchFailed(Box::new(e)))?;

        match self.policy {
            RefBlockPolicy::Head => Ok(RefBlock {
                num: ref_block_num(props.head_block_number),
                prefix: ref_block_prefix(&props.head_block_id)?,
            }),
            RefBlockPolicy::LastIrreversible => {
                let lib = props.last_irreversible_block_num;
                // The id of block `lib - 1` is the `previous` field of block `lib`.
                let block = self
                    .chain
                    .get_block(lib)
                    .await
                    .map_err(|e| Error::PropertiesFetchFailed(Box::new(e)))?
                    .ok_or_else(|| {
                        Error::PropertiesFetchFailed(Box::new(Error::FetchFailed {
                            block_num: lib,
                            attempts: 1,
                            reason: "node returned no block".into(),
                        }))
                    })?;

                let previous = if block.previous.is_empty() {
                    ZERO_BLOCK_ID
                } else {
                    block.previous.as_str()
                };

                Ok(RefBlock {
                    num: ref_block_num(lib.wrapping_sub(1)),
                    prefix: ref_block_prefix(previous)?,
                })
            }
        }
    }

    /// Now plus the configured window, whole seconds, UTC.
    fn expiration_from_now(&self) -> Result<DateTime<Utc>> {
        let secs = Utc::now().timestamp() + self.expiration.as_secs() as i64;
        Utc.timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| Error::Serialization(format!("expiration {} out of range", secs)))
    }
}
