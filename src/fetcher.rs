/// Steem SDK - Concurrent Block Fetcher
///
/// Fan-out/fan-in retrieval of a contiguous block range. One task per block,
/// spawned through a window of `max_in_flight`, results reassembled by block
/// number. The range is all-or-nothing: a block that cannot be fetched fails
/// the whole call.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::chain_state::ChainState;
use crate::config::{ClientConfig, DEFAULT_MAX_IN_FLIGHT, DEFAULT_MAX_RETRY, DEFAULT_RETRY_DELAY_MS};
use crate::error::{Error, Result};
use crate::types::{Block, WrapBlock};

// ============================================================================
// RETRY MODE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// Give up on a block after `max_attempts` tries
    Bounded { max_attempts: u32, delay: Duration },
    /// Keep trying until the block arrives. Pair with a cancellation token
    /// or an outer timeout; nothing else stops it.
    Unbounded { delay: Duration },
}

impl RetryMode {
    pub fn delay(&self) -> Duration {
        match self {
            RetryMode::Bounded { delay, .. } | RetryMode::Unbounded { delay } => *delay,
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        match self {
            RetryMode::Bounded { max_attempts, .. } => attempts >= (*max_attempts).max(1),
            RetryMode::Unbounded { .. } => false,
        }
    }
}

impl Default for RetryMode {
    fn default() -> Self {
        RetryMode::Bounded {
            max_attempts: DEFAULT_MAX_RETRY,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

// ============================================================================
// FETCHER
// ============================================================================

#[derive(Debug)]
pub struct ConcurrentBlockFetcher<C> {
    chain: Arc<C>,
    retry: RetryMode,
    max_in_flight: usize,
}

impl<C> Clone for ConcurrentBlockFetcher<C> {
    fn clone(&self) -> Self {
        ConcurrentBlockFetcher {
            chain: Arc::clone(&self.chain),
            retry: self.retry,
            max_in_flight: self.max_in_flight,
        }
    }
}

impl<C: ChainState + 'static> ConcurrentBlockFetcher<C> {
    pub fn new(chain: Arc<C>) -> Self {
        ConcurrentBlockFetcher {
            chain,
            retry: RetryMode::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Bounded retry and in-flight cap taken from `config`
    pub fn from_config(chain: Arc<C>, config: &ClientConfig) -> Self {
        Self::new(chain)
            .with_retry(RetryMode::Bounded {
                max_attempts: config.max_retry,
                delay: config.retry_delay,
            })
            .with_max_in_flight(config.max_in_flight)
    }

    pub fn with_retry(mut self, retry: RetryMode) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Blocks `[from, to)` in ascending order.
    pub async fn fetch_range(&self, from: u32, to: u32) -> Result<Vec<WrapBlock>> {
        self.fetch_range_with_cancel(from, to, CancellationToken::new()).await
    }

    /// `fetch_range` that stops with `Error::Cancelled` once `cancel` fires.
    pub async fn fetch_range_with_cancel(
        &self,
        from: u32,
        to: u32,
        cancel: CancellationToken,
    ) -> Result<Vec<WrapBlock>> {
        if from >= to {
            return Err(Error::InvalidRange { from, to });
        }

        // Child token so a failed block can stop its siblings without
        // cancelling the caller's token.
        let local = cancel.child_token();
        let mut tasks = JoinSet::new();
        let mut next = from;
        let mut blocks: BTreeMap<u32, Block> = BTreeMap::new();

        loop {
            // At most `max_in_flight` tasks exist at once; the rest of the
            // range is spawned as earlier blocks complete.
            while next < to && tasks.len() < self.max_in_flight {
                self.spawn_fetch(&mut tasks, next, local.clone());
                next += 1;
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let outcome = joined.map_err(|e| Error::FetchFailed {
                block_num: from,
                attempts: 0,
                reason: format!("fetch task aborted: {}", e),
            });

            match outcome {
                Ok((block_num, Ok(block))) => {
                    blocks.insert(block_num, block);
                }
                Ok((_, Err(e))) | Err(e) => {
                    local.cancel();
                    tasks.abort_all();
                    return Err(if cancel.is_cancelled() { Error::Cancelled } else { e });
                }
            }
        }

        debug!(from, to, fetched = blocks.len(), "block range fetched");
        Ok(blocks
            .into_iter()
            .map(|(block_num, block)| WrapBlock { block_num, block: Some(block) })
            .collect())
    }

    fn spawn_fetch(
        &self,
        tasks: &mut JoinSet<(u32, Result<Block>)>,
        block_num: u32,
        token: CancellationToken,
    ) {
        let chain = Arc::clone(&self.chain);
        let retry = self.retry;
        tasks.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(Error::Cancelled),
                fetched = fetch_with_retry(chain.as_ref(), block_num, retry) => fetched,
            };
            (block_num, result)
        });
    }
}

async fn fetch_with_retry<C: ChainState + ?Sized>(
    chain: &C,
    block_num: u32,
    retry: RetryMode,
) -> Result<Block> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let reason = match chain.get_block(block_num).await {
            Ok(Some(block)) => return Ok(block),
            Ok(None) => "block not available".to_string(),
            Err(e) => e.to_string(),
        };

        if retry.exhausted(attempts) {
            error!(block_num, attempts, %reason, "giving up on block");
            return Err(Error::FetchFailed { block_num, attempts, reason });
        }

        warn!(block_num, attempt = attempts, %reason, "get block failed, retrying");
        tokio::time::sleep(retry.delay()).await;
    }
}

// ============================================================================
// TESTS
// ============================================================================
