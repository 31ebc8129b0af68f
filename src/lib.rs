/// Steem SDK
/// Client library for Steem nodes: JSON-RPC and signed calls, transaction
/// assembly, signing and broadcast, and concurrent block retrieval.

pub mod auth;
pub mod broadcast;
pub mod chain_state;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fetcher;
pub mod keystore;
pub mod logging;
pub mod protocol;
pub mod rpc_client;
pub mod types;

#[path = "../rpc/mod.rs"]
pub mod rpc;

pub use broadcast::{
    custom_json_role, BroadcastSubmitter, Broadcaster, RefBlock, TransactionAssembler,
    TransactionSigner,
};
pub use chain_state::ChainState;
pub use client::Client;
pub use config::{ClientConfig, RefBlockPolicy};
pub use crypto::{DigestSigner, PrivateKey, PublicKey, Signature};
pub use error::{Error, ErrorKind, Result};
pub use fetcher::{ConcurrentBlockFetcher, RetryMode};
pub use keystore::{KeyRole, KeyStore};
pub use logging::{init_logging, try_init_logging};
pub use protocol::{
    Asset, Authority, ChainId, CustomJsonOperation, GrapheneSerializer, Operation,
    SignedTransaction, Transaction, TransactionSerializer,
};
pub use rpc::{KeyAuthorityVerifier, SignOptions, SignatureVerifier, SignedEnvelope};
pub use rpc_client::RpcClient;
pub use types::{Block, BroadcastResult, DynamicGlobalProperties, WrapBlock};
