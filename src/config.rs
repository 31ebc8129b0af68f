/// Steem SDK - Client Configuration
///
/// Defaults target Steem mainnet. `ClientConfig::from_env()` reads overrides
/// from the environment (and a `.env` file when present).

use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::protocol::ChainId;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DEFAULT_RPC_URL: &str = "https://api.steemit.com";

/// Default timeout for a single JSON-RPC round trip
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Attempts per block in bounded fetch mode
pub const DEFAULT_MAX_RETRY: u32 = 5;

pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Cap on concurrent block requests
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Lifetime of a prepared transaction
pub const DEFAULT_EXPIRATION_SECS: u64 = 600;

/// Resends allowed when a broadcast never reached the node
pub const DEFAULT_BROADCAST_CONNECT_RETRIES: u32 = 2;

// ============================================================================
// REFERENCE BLOCK POLICY
// ============================================================================

/// Which block a new transaction is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefBlockPolicy {
    /// Block `last_irreversible - 1`; its id is read from the `previous`
    /// field of the last irreversible block. Cannot be reorganized away.
    #[default]
    LastIrreversible,
    /// The current head block and `head_block_id`.
    Head,
}

impl FromStr for RefBlockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "irreversible" | "last_irreversible" | "lib" => Ok(RefBlockPolicy::LastIrreversible),
            "head" => Ok(RefBlockPolicy::Head),
            other => Err(format!("unknown reference block policy '{}'", other)),
        }
    }
}

// ============================================================================
// CLIENT CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Node endpoint; signed calls require `http://` or `https://`
    pub url: String,
    pub timeout: Duration,
    pub max_retry: u32,
    pub retry_delay: Duration,
    pub max_in_flight: usize,
    pub ref_block_policy: RefBlockPolicy,
    pub expiration: Duration,
    pub broadcast_connect_retries: u32,
    pub chain_id: ChainId,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            url: DEFAULT_RPC_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retry: DEFAULT_MAX_RETRY,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            ref_block_policy: RefBlockPolicy::default(),
            expiration: Duration::from_secs(DEFAULT_EXPIRATION_SECS),
            broadcast_connect_retries: DEFAULT_BROADCAST_CONNECT_RETRIES,
            chain_id: ChainId::STEEM,
        }
    }
}

impl ClientConfig {
    /// Default config pointed at another node
    pub fn with_url(url: impl Into<String>) -> Self {
        ClientConfig { url: url.into(), ..Default::default() }
    }

    /// Load from `STEEM_*` environment variables.
    ///
    /// Values that fail to parse are logged and replaced by the default.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let defaults = ClientConfig::default();

        let url = lookup("STEEM_RPC_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(defaults.url);

        let chain_id = match lookup("STEEM_CHAIN_ID") {
            Some(raw) => ChainId::from_hex(raw.trim()).unwrap_or_else(|e| {
                warn!(value = %raw, error = %e, "invalid STEEM_CHAIN_ID, using mainnet");
                defaults.chain_id
            }),
            None => defaults.chain_id,
        };

        ClientConfig {
            url,
            timeout: Duration::from_secs(parse_or(&lookup, "STEEM_RPC_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            max_retry: parse_or(&lookup, "STEEM_MAX_RETRY", DEFAULT_MAX_RETRY),
            retry_delay: Duration::from_millis(parse_or(&lookup, "STEEM_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)),
            max_in_flight: parse_or(&lookup, "STEEM_MAX_IN_FLIGHT", DEFAULT_MAX_IN_FLIGHT).max(1),
            ref_block_policy: parse_or(&lookup, "STEEM_REF_BLOCK_POLICY", defaults.ref_block_policy),
            expiration: Duration::from_secs(parse_or(&lookup, "STEEM_TX_EXPIRATION_SECS", DEFAULT_EXPIRATION_SECS)),
            broadcast_connect_retries: parse_or(
                &lookup,
                "STEEM_BROADCAST_CONNECT_RETRIES",
                DEFAULT_BROADCAST_CONNECT_RETRIES,
            ),
            chain_id,
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, "invalid config value, using default");
            default
        }),
        None => default,
    }
}
