//! Canonical message for signed JSON-RPC calls.
//!
//! Both the signer and the verifier hash exactly these bytes:
//!
//! ```text
//! inner   = SHA256(timestamp || account || method || params_b64)
//! message = SHA256(K || inner || nonce)
//! K       = SHA256("steem_jsonrpc_auth")
//! ```
//!
//! `params_b64` is the base64 of the compact JSON encoding of the params
//! array, and `timestamp` is the ISO-8601 string carried on the wire. The
//! layout matches the `@steemit/rpc-auth` JavaScript implementation.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Input to the domain separator hash
pub const DOMAIN_TAG: &[u8] = b"steem_jsonrpc_auth";

/// SHA256(DOMAIN_TAG), precomputed
pub const DOMAIN_SEPARATOR: [u8; 32] = [
    0x3b, 0x3b, 0x08, 0x1e, 0x46, 0xea, 0x80, 0x8d, 0x5a, 0x96, 0xb0, 0x8c, 0x4b, 0xc5, 0x00, 0x3f,
    0x5e, 0x15, 0x76, 0x70, 0x90, 0xf3, 0x44, 0xfa, 0xab, 0x53, 0x1e, 0xc5, 0x75, 0x65, 0x13, 0x6b,
];

pub const NONCE_LEN: usize = 8;

/// Everything that goes into the signed digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    pub timestamp: String,
    pub account: String,
    pub method: String,
    pub params: String,
    pub nonce: [u8; NONCE_LEN],
}

impl CanonicalMessage {
    pub fn new(
        method: &str,
        params: &[Value],
        account: &str,
        timestamp_secs: i64,
        nonce: [u8; NONCE_LEN],
    ) -> Result<Self> {
        Ok(CanonicalMessage {
            timestamp: format_timestamp(timestamp_secs)?,
            account: account.to_string(),
            method: method.to_string(),
            params: encode_params(params)?,
            nonce,
        })
    }

    pub fn digest(&self) -> [u8; 32] {
        let inner = Sha256::new()
            .chain_update(self.timestamp.as_bytes())
            .chain_update(self.account.as_bytes())
            .chain_update(self.method.as_bytes())
            .chain_update(self.params.as_bytes())
            .finalize();

        Sha256::new()
            .chain_update(DOMAIN_SEPARATOR)
            .chain_update(inner)
            .chain_update(self.nonce)
            .finalize()
            .into()
    }
}

/// base64(compact JSON of the params array)
pub fn encode_params(params: &[Value]) -> Result<String> {
    let json = serde_json::to_string(params)?;
    Ok(BASE64.encode(json.as_bytes()))
}

pub fn decode_params(encoded: &str) -> Result<Vec<Value>> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| Error::Malformed(format!("params are not valid base64: {}", e)))?;
    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(Error::Malformed("signed params must be a JSON array".into())),
        Err(e) => Err(Error::Malformed(format!("signed params are not valid JSON: {}", e))),
    }
}

/// Epoch seconds rendered as `2026-10-17T12:00:00.000Z`
pub fn format_timestamp(secs: i64) -> Result<String> {
    let time = Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| Error::Serialization(format!("timestamp {} out of range", secs)))?;
    Ok(time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse an RFC 3339 wire timestamp back to whole epoch seconds.
pub fn parse_timestamp(s: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp())
        .map_err(|e| Error::Malformed(format!("invalid timestamp '{}': {}", s, e)))
}
