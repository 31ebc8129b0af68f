//! Signed (authenticated) JSON-RPC calls.
//!
//! A signed call proves control of an account's key to an RPC node without
//! sending the key. The original params are followed by one extra object,
//! `{"__signed": {...}}`, carrying the account, a random nonce, the base64
//! params, the signatures and the signing time. Nodes accept an envelope for
//! [`SIGNATURE_VALIDITY_SECS`] after it was signed.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::canonical::{decode_params, parse_timestamp, CanonicalMessage, NONCE_LEN};
use crate::crypto::{DigestSigner, PublicKey, Signature};
use crate::error::{Error, Result};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Key of the trailing params object that carries the envelope
pub const SIGNED_PARAM_KEY: &str = "__signed";

/// Protocol constant shared with every other implementation. Not configurable.
pub const SIGNATURE_VALIDITY_SECS: i64 = 60;

// ============================================================================
// ENVELOPE TYPES
// ============================================================================

/// The `__signed` object exactly as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedPayload {
    pub account: String,
    #[serde(with = "hex_nonce")]
    pub nonce: [u8; NONCE_LEN],
    /// base64 of the compact JSON params array
    pub params: String,
    pub signatures: Vec<String>,
    /// ISO-8601 UTC, e.g. `2026-10-17T12:00:00.000Z`
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkeys: Option<Vec<String>>,
}

impl SignedPayload {
    /// Signing time in epoch seconds
    pub fn timestamp_secs(&self) -> Result<i64> {
        parse_timestamp(&self.timestamp)
    }
}

/// A method call plus its authentication envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope {
    pub method: String,
    pub params: Vec<Value>,
    pub signed: SignedPayload,
}

impl SignedEnvelope {
    /// Original params followed by `{"__signed": {...}}`.
    pub fn to_wire_params(&self) -> Result<Vec<Value>> {
        let mut params = self.params.clone();
        let mut wrapper = Map::new();
        wrapper.insert(SIGNED_PARAM_KEY.to_string(), serde_json::to_value(&self.signed)?);
        params.push(Value::Object(wrapper));
        Ok(params)
    }

    /// Full JSON-RPC 2.0 request body.
    pub fn to_request(&self, id: u64) -> Result<Value> {
        Ok(json!({
            "jsonrpc": "2.0",
            "method": self.method,
            "params": self.to_wire_params()?,
            "id": id,
        }))
    }

    /// Split received params into the plain params and the trailing envelope.
    pub fn from_wire(method: &str, mut params: Vec<Value>) -> Result<Self> {
        let last = params
            .pop()
            .ok_or_else(|| Error::Malformed("request has no params".into()))?;

        let signed = match last {
            Value::Object(mut obj) if obj.len() == 1 => obj
                .remove(SIGNED_PARAM_KEY)
                .ok_or_else(|| Error::Malformed(format!("missing {} object", SIGNED_PARAM_KEY)))?,
            _ => {
                return Err(Error::Malformed(format!(
                    "last param must be a single {} object",
                    SIGNED_PARAM_KEY
                )))
            }
        };

        let signed: SignedPayload = serde_json::from_value(signed)
            .map_err(|e| Error::Malformed(format!("invalid {} object: {}", SIGNED_PARAM_KEY, e)))?;

        Ok(SignedEnvelope { method: method.to_string(), params, signed })
    }

    fn canonical_message(&self) -> CanonicalMessage {
        CanonicalMessage {
            timestamp: self.signed.timestamp.clone(),
            account: self.signed.account.clone(),
            method: self.method.clone(),
            params: self.signed.params.clone(),
            nonce: self.signed.nonce,
        }
    }
}

// ============================================================================
// SIGNING
// ============================================================================

/// Overrides for the values `sign` normally generates itself.
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    /// Epoch seconds; defaults to the current time
    pub timestamp: Option<i64>,
    /// Defaults to 8 random bytes
    pub nonce: Option<[u8; NONCE_LEN]>,
    /// Add the signers' public keys to the envelope
    pub pubkeys: Option<Vec<PublicKey>>,
}

/// Sign `method(params)` on behalf of `account`, one signature per key in order.
pub fn sign<K: DigestSigner>(
    method: &str,
    params: Vec<Value>,
    account: &str,
    keys: &[K],
) -> Result<SignedEnvelope> {
    sign_with_options(method, params, account, keys, SignOptions::default())
}

pub fn sign_with_options<K: DigestSigner>(
    method: &str,
    params: Vec<Value>,
    account: &str,
    keys: &[K],
    options: SignOptions,
) -> Result<SignedEnvelope> {
    if keys.is_empty() {
        return Err(Error::NoKeysProvided);
    }

    let nonce = options.nonce.unwrap_or_else(|| {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        nonce
    });
    let timestamp = options.timestamp.unwrap_or_else(unix_now);

    let message = CanonicalMessage::new(method, &params, account, timestamp, nonce)?;
    let digest = message.digest();

    let signatures = keys
        .iter()
        .map(|key| key.sign_digest(&digest).map(|sig| sig.to_hex()))
        .collect::<Result<Vec<_>>>()?;

    Ok(SignedEnvelope {
        method: method.to_string(),
        params,
        signed: SignedPayload {
            account: account.to_string(),
            nonce,
            params: message.params,
            signatures,
            timestamp: message.timestamp,
            pubkeys: options
                .pubkeys
                .map(|keys| keys.iter().map(|k| k.to_string()).collect()),
        },
    })
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Checks that `signatures` over `message` satisfy `account`'s authority.
///
/// Authority lookup needs chain state, so it is injected by the caller.
pub trait SignatureVerifier {
    fn verify(&self, message: &[u8; 32], signatures: &[String], account: &str) -> Result<()>;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&[u8; 32], &[String], &str) -> Result<()>,
{
    fn verify(&self, message: &[u8; 32], signatures: &[String], account: &str) -> Result<()> {
        self(message, signatures, account)
    }
}

/// Verifier backed by a static table of account keys.
///
/// Every signature must recover to one of the account's registered keys.
#[derive(Debug, Clone, Default)]
pub struct KeyAuthorityVerifier {
    keys: HashMap<String, Vec<PublicKey>>,
}

impl KeyAuthorityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key(&mut self, account: &str, key: PublicKey) {
        self.keys.entry(account.to_string()).or_default().push(key);
    }

    pub fn with_key(mut self, account: &str, key: PublicKey) -> Self {
        self.add_key(account, key);
        self
    }
}

impl SignatureVerifier for KeyAuthorityVerifier {
    fn verify(&self, message: &[u8; 32], signatures: &[String], account: &str) -> Result<()> {
        let bad = |reason: String| Error::BadSignature { account: account.to_string(), reason };

        let authorized = self
            .keys
            .get(account)
            .ok_or_else(|| bad("unknown account".into()))?;

        for (i, sig_hex) in signatures.iter().enumerate() {
            let signature = Signature::from_hex(sig_hex)
                .map_err(|e| bad(format!("signature {}: {}", i, e)))?;
            let recovered = signature
                .recover(message)
                .map_err(|e| bad(format!("signature {}: {}", i, e)))?;
            if !authorized.contains(&recovered) {
                return Err(bad(format!("signature {} from unauthorized key {}", i, recovered)));
            }
        }
        Ok(())
    }
}

/// Authenticate an envelope and return the params for normal dispatch.
pub fn validate<V: SignatureVerifier + ?Sized>(
    envelope: &SignedEnvelope,
    verifier: &V,
) -> Result<Vec<Value>> {
    validate_at(envelope, verifier, unix_now())
}

/// `validate` against an explicit clock.
pub fn validate_at<V: SignatureVerifier + ?Sized>(
    envelope: &SignedEnvelope,
    verifier: &V,
    now_secs: i64,
) -> Result<Vec<Value>> {
    let signed = &envelope.signed;

    let signed_at = signed.timestamp_secs()?;
    let age = now_secs - signed_at;
    if age > SIGNATURE_VALIDITY_SECS || age < -SIGNATURE_VALIDITY_SECS {
        return Err(Error::Expired { account: signed.account.clone(), age_secs: age });
    }

    let params = decode_params(&signed.params)?;
    if !envelope.params.is_empty() && envelope.params != params {
        return Err(Error::Malformed("plain params differ from signed params".into()));
    }

    if signed.signatures.is_empty() {
        return Err(Error::Malformed("envelope carries no signatures".into()));
    }

    let message = envelope.canonical_message().digest();
    verifier.verify(&message, &signed.signatures, &signed.account)?;

    Ok(params)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

mod hex_nonce {
    use super::NONCE_LEN;
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(nonce: &[u8; NONCE_LEN], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(nonce))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; NONCE_LEN], D::Error> {
        let s = String::deserialize(d)?;
        let raw = hex::decode(&s).map_err(D::Error::custom)?;
        raw.try_into()
            .map_err(|_| D::Error::custom(format!("nonce must be {} bytes", NONCE_LEN)))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;
    use std::cell::Cell;

    const ALICE_WIF: &str = "5JLw5dgQAx6rhZEgNN5C2ds1V47RweGshynFSWFbaMohsYsBvE8";
    const BOB_WIF: &str = "5JoQtsKQuH8hC9MyvfJAqo6qmKLm8ePYNucs7tPu2YxG12trzBt";
    const METHOD: &str = "condenser_api.get_accounts";
    const TS: i64 = 1_792_238_400;

    fn alice() -> PrivateKey {
        PrivateKey::from_wif(ALICE_WIF).unwrap()
    }

    fn bob() -> PrivateKey {
        PrivateKey::from_wif(BOB_WIF).unwrap()
    }

    fn fixed(nonce: [u8; 8]) -> SignOptions {
        SignOptions { timestamp: Some(TS), nonce: Some(nonce), pubkeys: None }
    }

    fn verifier() -> KeyAuthorityVerifier {
        KeyAuthorityVerifier::new().with_key("testuser", alice().public_key())
    }

    #[test]
    fn test_sign_then_validate() {
        let params = vec![json!(["testuser"])];
        let env = sign(METHOD, params.clone(), "testuser", &[alice()]).unwrap();

        assert_eq!(env.signed.signatures.len(), 1);
        assert_eq!(env.signed.signatures[0].len(), 130);
        assert_eq!(validate(&env, &verifier()).unwrap(), params);
    }

    #[test]
    fn test_fixed_inputs_reproduce_exactly() {
        let params = vec![json!(["testuser"])];
        let a = sign_with_options(METHOD, params.clone(), "testuser", &[alice()], fixed([1, 2, 3, 4, 5, 6, 7, 8])).unwrap();
        let b = sign_with_options(METHOD, params, "testuser", &[alice()], fixed([1, 2, 3, 4, 5, 6, 7, 8])).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.signed.timestamp, "2026-10-17T12:00:00.000Z");
        assert_eq!(
            hex::encode(a.canonical_message().digest()),
            "47199273dc8e0bbe65fd26696efabd2d6f5436003086572726d5d03f93baffb2"
        );
    }

    #[test]
    fn test_random_nonce_differs() {
        let a = sign(METHOD, vec![], "testuser", &[alice()]).unwrap();
        let b = sign(METHOD, vec![], "testuser", &[alice()]).unwrap();
        assert_ne!(a.signed.nonce, b.signed.nonce);
    }

    #[test]
    fn test_multi_key_order() {
        let env = sign_with_options(METHOD, vec![], "testuser", &[alice(), bob()], fixed([9; 8])).unwrap();
        let digest = env.canonical_message().digest();

        let recovered: Vec<PublicKey> = env
            .signed
            .signatures
            .iter()
            .map(|s| Signature::from_hex(s).unwrap().recover(&digest).unwrap())
            .collect();
        assert_eq!(recovered, vec![alice().public_key(), bob().public_key()]);

        let both = verifier().with_key("testuser", bob().public_key());
        assert!(validate_at(&env, &both, TS + 5).is_ok());
        // Bob's signature is not covered by the single-key verifier
        assert!(matches!(
            validate_at(&env, &verifier(), TS + 5),
            Err(Error::BadSignature { .. })
        ));
    }

    #[test]
    fn test_expired() {
        let env = sign_with_options(METHOD, vec![], "testuser", &[alice()], fixed([1; 8])).unwrap();

        assert!(validate_at(&env, &verifier(), TS + SIGNATURE_VALIDITY_SECS).is_ok());
        let err = validate_at(&env, &verifier(), TS + SIGNATURE_VALIDITY_SECS + 1).unwrap_err();
        assert!(matches!(err, Error::Expired { age_secs: 61, .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Authentication);
    }

    #[test]
    fn test_expiry_checked_before_signatures() {
        let env = sign_with_options(METHOD, vec![], "testuser", &[alice()], fixed([1; 8])).unwrap();
        let calls = Cell::new(0);
        let counting = |_: &[u8; 32], _: &[String], _: &str| -> Result<()> {
            calls.set(calls.get() + 1);
            Ok(())
        };

        assert!(matches!(validate_at(&env, &counting, TS + 3600), Err(Error::Expired { .. })));
        assert_eq!(calls.get(), 0);
        assert!(validate_at(&env, &counting, TS).is_ok());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let env = sign_with_options(METHOD, vec![], "testuser", &[alice()], fixed([1; 8])).unwrap();
        assert!(matches!(validate_at(&env, &verifier(), TS - 120), Err(Error::Expired { .. })));
    }

    #[test]
    fn test_tampered_params_rejected() {
        let mut env = sign_with_options(METHOD, vec![json!(["testuser"])], "testuser", &[alice()], fixed([1; 8])).unwrap();
        env.params = vec![json!(["mallory"])];
        assert!(matches!(validate_at(&env, &verifier(), TS), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_tampered_method_rejected() {
        let mut env = sign_with_options(METHOD, vec![], "testuser", &[alice()], fixed([1; 8])).unwrap();
        env.method = "condenser_api.get_block".into();
        assert!(matches!(validate_at(&env, &verifier(), TS), Err(Error::BadSignature { .. })));
    }

    #[test]
    fn test_wrong_account_rejected() {
        let env = sign_with_options(METHOD, vec![], "testuser", &[bob()], fixed([1; 8])).unwrap();
        assert!(matches!(validate_at(&env, &verifier(), TS), Err(Error::BadSignature { .. })));

        let env = sign_with_options(METHOD, vec![], "stranger", &[alice()], fixed([1; 8])).unwrap();
        assert!(matches!(validate_at(&env, &verifier(), TS), Err(Error::BadSignature { .. })));
    }

    #[test]
    fn test_no_keys() {
        let keys: [PrivateKey; 0] = [];
        assert!(matches!(sign(METHOD, vec![], "testuser", &keys), Err(Error::NoKeysProvided)));
    }

    #[test]
    fn test_wire_shape() {
        let params = vec![json!(["testuser"])];
        let opts = SignOptions { pubkeys: Some(vec![alice().public_key()]), ..fixed([1, 2, 3, 4, 5, 6, 7, 8]) };
        let env = sign_with_options(METHOD, params, "testuser", &[alice()], opts).unwrap();

        let request = env.to_request(7).unwrap();
        assert_eq!(request["jsonrpc"], "2.0");
        assert_eq!(request["id"], 7);
        assert_eq!(request["params"][0], json!(["testuser"]));

        let signed = &request["params"][1][SIGNED_PARAM_KEY];
        assert_eq!(signed["account"], "testuser");
        assert_eq!(signed["nonce"], "0102030405060708");
        assert_eq!(signed["params"], "W1sidGVzdHVzZXIiXV0=");
        assert_eq!(signed["timestamp"], "2026-10-17T12:00:00.000Z");
        assert_eq!(signed["pubkeys"][0], alice().public_key().to_string());

        let keys: Vec<&String> = signed.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["account", "nonce", "params", "signatures", "timestamp", "pubkeys"]);
    }

    #[test]
    fn test_from_wire_round_trip() {
        let env = sign_with_options(METHOD, vec![json!(["testuser"])], "testuser", &[alice()], fixed([3; 8])).unwrap();
        let parsed = SignedEnvelope::from_wire(METHOD, env.to_wire_params().unwrap()).unwrap();
        assert_eq!(parsed, env);
        assert!(validate_at(&parsed, &verifier(), TS + 1).is_ok());
    }

    #[test]
    fn test_envelope_without_plain_params_validates() {
        let env = sign_with_options(METHOD, vec![json!(["testuser"])], "testuser", &[alice()], fixed([3; 8])).unwrap();
        let stripped = SignedEnvelope { params: vec![], ..env };
        assert_eq!(validate_at(&stripped, &verifier(), TS).unwrap(), vec![json!(["testuser"])]);
    }

    #[test]
    fn test_from_wire_malformed() {
        assert!(matches!(SignedEnvelope::from_wire(METHOD, vec![]), Err(Error::Malformed(_))));
        assert!(matches!(
            SignedEnvelope::from_wire(METHOD, vec![json!({"other": 1})]),
            Err(Error::Malformed(_))
        ));
        assert!(matches!(
            SignedEnvelope::from_wire(METHOD, vec![json!({"__signed": {"account": "x"}})]),
            Err(Error::Malformed(_))
        ));
    }
}
