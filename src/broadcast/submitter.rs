/// Synchronous broadcast of signed transactions.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::DEFAULT_BROADCAST_CONNECT_RETRIES;
use crate::error::{Error, Result};
use crate::protocol::SignedTransaction;
use crate::rpc_client::RpcClient;
use crate::types::BroadcastResult;

/// Sends a signed transaction exactly once from the node's point of view.
///
/// Only failures where the request never left the client (connection refused,
/// request build errors) are retried. Timeouts and node errors are returned
/// as is, since the node may already have applied the transaction.
#[derive(Debug, Clone)]
pub struct BroadcastSubmitter {
    client: Arc<RpcClient>,
    connect_retries: u32,
}

impl BroadcastSubmitter {
    pub fn new(client: Arc<RpcClient>) -> Self {
        BroadcastSubmitter { client, connect_retries: DEFAULT_BROADCAST_CONNECT_RETRIES }
    }

    pub fn with_connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    pub async fn submit(&self, tx: &SignedTransaction) -> Result<BroadcastResult> {
        let mut retries_left = self.connect_retries;
        loop {
            match self.client.broadcast_transaction_synchronous(tx).await {
                Ok(result) => {
                    info!(
                        id = %result.id,
                        block_num = result.block_num,
                        trx_num = result.trx_num,
                        "transaction broadcast"
                    );
                    return Ok(result);
                }
                Err(e) if retries_left > 0 && e.is_retryable_before_send() => {
                    retries_left -= 1;
                    warn!(error = %e, retries_left, "broadcast never reached the node, resending");
                }
                Err(Error::Rpc { code, message, .. }) => {
                    return Err(Error::BroadcastRejected { code, message })
                }
                Err(e) => return Err(e),
            }
        }
    }
}
