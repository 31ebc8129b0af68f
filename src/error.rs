//! Error types shared by every layer of the SDK.

use crate::keystore::KeyRole;

/// Broad classification used by callers to decide what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input. Never retried.
    Validation,
    /// Signed-call authentication failed (expired, bad signature, malformed envelope).
    Authentication,
    /// The configured endpoint cannot carry the request at all.
    Transport,
    /// Node unreachable or node-reported failure.
    Network,
    /// Local signing failure.
    Crypto,
}

/// Errors that can occur anywhere in the SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected key role: {0}")]
    InvalidRole(String),

    #[error("invalid private key format: {0}")]
    InvalidKeyFormat(String),

    #[error("no {0} key imported")]
    KeyNotFound(KeyRole),

    #[error("no operations provided")]
    EmptyOperationList,

    #[error("unexpected block range: from {from}, to {to}")]
    InvalidRange { from: u32, to: u32 },

    #[error("no signing keys provided")]
    NoKeysProvided,

    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Signature older (or further in the future) than the validity window.
    #[error("signature expired for account {account} ({age_secs}s old)")]
    Expired { account: String, age_secs: i64 },

    #[error("bad signature for account {account}: {reason}")]
    BadSignature { account: String, reason: String },

    #[error("malformed signed request: {0}")]
    Malformed(String),

    #[error("signed calls can only be made when using HTTP transport (got {url})")]
    UnsupportedTransport { url: String },

    #[error("failed to send RPC request for {method}: {source}")]
    Network {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("RPC error for {method} ({code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("transaction rejected ({code}): {message}")]
    BroadcastRejected { code: i64, message: String },

    #[error("failed to resolve reference block from chain head: {0}")]
    PropertiesFetchFailed(#[source] Box<Error>),

    #[error("get block {block_num} failed after {attempts} attempt(s): {reason}")]
    FetchFailed {
        block_num: u32,
        attempts: u32,
        reason: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("signing failed: {0}")]
    SigningFailed(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRole(_)
            | Error::InvalidKeyFormat(_)
            | Error::KeyNotFound(_)
            | Error::EmptyOperationList
            | Error::InvalidRange { .. }
            | Error::NoKeysProvided
            | Error::InvalidAsset(_)
            | Error::Serialization(_) => ErrorKind::Validation,
            Error::Expired { .. } | Error::BadSignature { .. } | Error::Malformed(_) => {
                ErrorKind::Authentication
            }
            Error::UnsupportedTransport { .. } => ErrorKind::Transport,
            Error::Network { .. }
            | Error::Rpc { .. }
            | Error::BroadcastRejected { .. }
            | Error::PropertiesFetchFailed(_)
            | Error::FetchFailed { .. }
            | Error::Cancelled => ErrorKind::Network,
            Error::SigningFailed(_) => ErrorKind::Crypto,
        }
    }

    /// True only when the request provably never left the client, so resending
    /// it cannot duplicate a side effect on the node.
    pub fn is_retryable_before_send(&self) -> bool {
        match self {
            Error::Network { source, .. } => source.is_connect() || source.is_builder(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, Error>;
