/// Steem SDK - Key and Signature Primitives
///
/// secp256k1 private keys (WIF encoded), STM-prefixed public keys and
/// 65-byte compact recoverable signatures in the graphene canonical form.

use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use secp256k1::constants::CURVE_ORDER;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, Scalar, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Version byte prepended to a private key before base58 encoding
pub const WIF_VERSION: u8 = 0x80;

/// Address prefix used by Steem mainnet public keys
pub const PUBLIC_KEY_PREFIX: &str = "STM";

/// Recovery header offset for compressed keys (27 + 4)
const COMPACT_HEADER: u8 = 31;

/// Upper bound on nonce retries while searching for a canonical signature
const MAX_CANONICAL_ATTEMPTS: u32 = 256;

/// `(n - 1) / 2`; a larger `s` is replaced by `n - s`
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

type HmacSha256 = Hmac<Sha256>;

fn context() -> &'static Secp256k1<All> {
    static CTX: OnceLock<Secp256k1<All>> = OnceLock::new();
    CTX.get_or_init(Secp256k1::new)
}

// ============================================================================
// HASH HELPERS
// ============================================================================

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

// ============================================================================
// SIGNER TRAIT
// ============================================================================

/// Anything that can sign a 32-byte digest.
///
/// Signed calls and transaction signing are generic over this so callers can
/// plug in hardware keys or instrumented signers.
pub trait DigestSigner {
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature>;

    /// Public half of the signing key, when the signer can reveal it
    fn public_key(&self) -> Option<PublicKey> {
        None
    }
}

// ============================================================================
// PRIVATE KEY
// ============================================================================

#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| Error::InvalidKeyFormat(format!("invalid secret scalar: {}", e)))?;
        Ok(PrivateKey { secret })
    }

    /// Decode a WIF string: base58(0x80 || key || checksum[4]).
    pub fn from_wif(wif: &str) -> Result<Self> {
        let raw = bs58::decode(wif)
            .into_vec()
            .map_err(|e| Error::InvalidKeyFormat(format!("invalid base58: {}", e)))?;

        if raw.len() != 37 {
            return Err(Error::InvalidKeyFormat(format!(
                "expected 37 decoded bytes, got {}",
                raw.len()
            )));
        }
        if raw[0] != WIF_VERSION {
            return Err(Error::InvalidKeyFormat(format!(
                "unexpected version byte 0x{:02x}",
                raw[0]
            )));
        }

        let (payload, checksum) = raw.split_at(33);
        if double_sha256(payload)[..4] != *checksum {
            return Err(Error::InvalidKeyFormat("checksum mismatch".into()));
        }

        Self::from_bytes(&payload[1..])
    }

    pub fn to_wif(&self) -> String {
        let mut payload = Vec::with_capacity(37);
        payload.push(WIF_VERSION);
        payload.extend_from_slice(&self.secret.secret_bytes());
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: secp256k1::PublicKey::from_secret_key(context(), &self.secret),
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.secret_bytes()
    }

    /// Sign a digest, retrying until the signature is canonical.
    ///
    /// Attempt 0 is plain RFC 6979 over the digest. Attempt `i` seeds RFC 6979
    /// with `sha256(digest || [0; i])` instead, the same derivation steem-js
    /// uses, so every attempt yields the bytes the JavaScript signer produces.
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature> {
        for attempt in 0..MAX_CANONICAL_ATTEMPTS {
            let signature = if attempt == 0 {
                let message = Message::from_digest(*digest);
                Signature::from_recoverable(&context().sign_ecdsa_recoverable(&message, &self.secret))
            } else {
                let mut seed = digest.to_vec();
                seed.resize(32 + attempt as usize, 0);
                self.sign_with_nonce_seed(digest, &sha256(&seed))?
            };

            if signature.is_canonical() {
                return Ok(signature);
            }
        }

        Err(Error::SigningFailed(format!(
            "no canonical signature after {} attempts",
            MAX_CANONICAL_ATTEMPTS
        )))
    }

    /// ECDSA over `digest` with `k` drawn from RFC 6979 keyed by `nonce_seed`.
    fn sign_with_nonce_seed(&self, digest: &[u8; 32], nonce_seed: &[u8; 32]) -> Result<Signature> {
        let e = to_scalar(&reduce_mod_order(*digest))?;
        let mut nonces = Rfc6979::new(&self.secret.secret_bytes(), nonce_seed)?;

        loop {
            let candidate = nonces.next_candidate()?;
            // Zero or >= n
            let Ok(k) = SecretKey::from_slice(&candidate) else {
                continue;
            };
            if let Some(signature) = self.sign_with_k(&e, &k)? {
                return Ok(signature);
            }
        }
    }

    /// `None` when `r` or `s` comes out zero and the next `k` must be tried.
    fn sign_with_k(&self, e: &Scalar, k: &SecretKey) -> Result<Option<Signature>> {
        let point = secp256k1::PublicKey::from_secret_key(context(), k).serialize();
        let mut x = [0u8; 32];
        x.copy_from_slice(&point[1..]);

        // 0x02 / 0x03 prefix carries the parity of y
        let mut recid = point[0] & 1;
        if x >= CURVE_ORDER {
            recid |= 2;
        }

        let r_bytes = reduce_mod_order(x);
        let Ok(r) = SecretKey::from_slice(&r_bytes) else {
            return Ok(None);
        };

        let dr = self.secret.mul_tweak(&to_scalar(&r.secret_bytes())?).map_err(signing_error)?;
        let Ok(numerator) = dr.add_tweak(e) else {
            return Ok(None);
        };
        let mut s = numerator
            .mul_tweak(&to_scalar(&invert(k)?.secret_bytes())?)
            .map_err(signing_error)?;

        if s.secret_bytes() > HALF_ORDER {
            s = s.negate();
            recid ^= 1;
        }

        let mut bytes = [0u8; 65];
        bytes[0] = COMPACT_HEADER + recid;
        bytes[1..33].copy_from_slice(&r_bytes);
        bytes[33..].copy_from_slice(&s.secret_bytes());
        Ok(Some(Signature(bytes)))
    }
}

// ============================================================================
// NONCE DERIVATION
// ============================================================================

/// RFC 6979 HMAC-DRBG for secp256k1 with SHA-256 (qlen == hlen == 256).
struct Rfc6979 {
    k: [u8; 32],
    v: [u8; 32],
    started: bool,
}

impl Rfc6979 {
    fn new(secret: &[u8; 32], hash: &[u8; 32]) -> Result<Self> {
        let v = [1u8; 32];
        let k = hmac_sha256(&[0u8; 32], &[&v, &[0x00], secret, hash])?;
        let v = hmac_sha256(&k, &[&v])?;
        let k = hmac_sha256(&k, &[&v, &[0x01], secret, hash])?;
        let v = hmac_sha256(&k, &[&v])?;
        Ok(Rfc6979 { k, v, started: false })
    }

    fn next_candidate(&mut self) -> Result<[u8; 32]> {
        if self.started {
            self.k = hmac_sha256(&self.k, &[&self.v, &[0x00]])?;
            self.v = hmac_sha256(&self.k, &[&self.v])?;
        }
        self.started = true;
        self.v = hmac_sha256(&self.k, &[&self.v])?;
        Ok(self.v)
    }
}

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::SigningFailed(format!("hmac key: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

// ============================================================================
// SCALAR HELPERS
// ============================================================================

fn signing_error(e: secp256k1::Error) -> Error {
    Error::SigningFailed(e.to_string())
}

fn to_scalar(bytes: &[u8; 32]) -> Result<Scalar> {
    Scalar::from_be_bytes(*bytes).map_err(|_| Error::SigningFailed("scalar out of range".into()))
}

/// `value mod n` for a 256-bit big-endian value (one subtraction suffices).
fn reduce_mod_order(mut value: [u8; 32]) -> [u8; 32] {
    if value >= CURVE_ORDER {
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut diff = i16::from(value[i]) - i16::from(CURVE_ORDER[i]) - borrow;
            borrow = 0;
            if diff < 0 {
                diff += 256;
                borrow = 1;
            }
            value[i] = diff as u8;
        }
    }
    value
}

/// `k^(n-2) mod n`
fn invert(k: &SecretKey) -> Result<SecretKey> {
    let mut exponent = CURVE_ORDER;
    exponent[31] -= 2;
    let base = to_scalar(&k.secret_bytes())?;

    let mut acc: Option<SecretKey> = None;
    for byte in exponent {
        for bit in (0..8).rev() {
            if let Some(a) = acc {
                acc = Some(a.mul_tweak(&to_scalar(&a.secret_bytes())?).map_err(signing_error)?);
            }
            if (byte >> bit) & 1 == 1 {
                acc = Some(match acc {
                    Some(a) => a.mul_tweak(&base).map_err(signing_error)?,
                    None => *k,
                });
            }
        }
    }
    acc.ok_or_else(|| Error::SigningFailed("zero exponent".into()))
}

impl DigestSigner for PrivateKey {
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature> {
        self.sign(digest)
    }

    fn public_key(&self) -> Option<PublicKey> {
        Some(PrivateKey::public_key(self))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key().to_string())
            .finish()
    }
}

// ============================================================================
// PUBLIC KEY
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    inner: secp256k1::PublicKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let inner = secp256k1::PublicKey::from_slice(bytes)
            .map_err(|e| Error::InvalidKeyFormat(format!("invalid public key: {}", e)))?;
        Ok(PublicKey { inner })
    }

    /// Compressed SEC1 encoding (33 bytes)
    pub fn to_bytes(&self) -> [u8; 33] {
        self.inner.serialize()
    }

    pub fn to_string_with_prefix(&self, prefix: &str) -> String {
        let compressed = self.to_bytes();
        let checksum = ripemd160(&compressed);
        let mut payload = compressed.to_vec();
        payload.extend_from_slice(&checksum[..4]);
        format!("{}{}", prefix, bs58::encode(payload).into_string())
    }

    pub fn from_str_with_prefix(s: &str, prefix: &str) -> Result<Self> {
        let encoded = s
            .strip_prefix(prefix)
            .ok_or_else(|| Error::InvalidKeyFormat(format!("public key must start with {}", prefix)))?;

        let raw = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| Error::InvalidKeyFormat(format!("invalid base58: {}", e)))?;
        if raw.len() != 37 {
            return Err(Error::InvalidKeyFormat(format!(
                "expected 37 decoded bytes, got {}",
                raw.len()
            )));
        }

        let (compressed, checksum) = raw.split_at(33);
        if ripemd160(compressed)[..4] != *checksum {
            return Err(Error::InvalidKeyFormat("checksum mismatch".into()));
        }

        Self::from_bytes(compressed)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with_prefix(PUBLIC_KEY_PREFIX))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_with_prefix(s, PUBLIC_KEY_PREFIX)
    }
}

// ============================================================================
// SIGNATURE
// ============================================================================

/// Compact recoverable signature: `[31 + recid, r(32), s(32)]`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    fn from_recoverable(sig: &RecoverableSignature) -> Self {
        let (recid, rs) = sig.serialize_compact();
        let mut bytes = [0u8; 65];
        bytes[0] = COMPACT_HEADER + recid.to_i32() as u8;
        bytes[1..].copy_from_slice(&rs);
        Signature(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s)
            .map_err(|e| Error::Malformed(format!("invalid signature hex: {}", e)))?;
        let bytes: [u8; 65] = raw.try_into().map_err(|v: Vec<u8>| {
            Error::Malformed(format!("expected 65 signature bytes, got {}", v.len()))
        })?;
        Ok(Signature(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Graphene canonical rule: neither r nor s may have the high bit set or
    /// carry a redundant leading zero byte.
    pub fn is_canonical(&self) -> bool {
        let c = &self.0;
        (c[1] & 0x80) == 0
            && !(c[1] == 0 && (c[2] & 0x80) == 0)
            && (c[33] & 0x80) == 0
            && !(c[33] == 0 && (c[34] & 0x80) == 0)
    }

    /// Recover the public key that produced this signature over `digest`.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<PublicKey> {
        let header = self.0[0];
        if !(27..=34).contains(&header) {
            return Err(Error::Malformed(format!("invalid recovery header {}", header)));
        }
        let recid = RecoveryId::from_i32(((header - 27) & 3) as i32)
            .map_err(|e| Error::Malformed(e.to_string()))?;
        let recoverable = RecoverableSignature::from_compact(&self.0[1..], recid)
            .map_err(|e| Error::Malformed(e.to_string()))?;
        let inner = context()
            .recover_ecdsa(&Message::from_digest(*digest), &recoverable)
            .map_err(|e| Error::Malformed(format!("public key recovery failed: {}", e)))?;
        Ok(PublicKey { inner })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_WIF: &str = "5JLw5dgQAx6rhZEgNN5C2ds1V47RweGshynFSWFbaMohsYsBvE8";
    const TEST_SECRET_HEX: &str = "459632cae92b753176b78cf19bb490cebd0f98c72cf5aeb20412c0cb896052db";
    const TEST_PUBKEY: &str = "STM7a4zu9FdZueupx4tH8yWe12aLTT4CE7rvDH7kEKLiaefd29n5d";

    #[test]
    fn test_wif_decode() {
        let key = PrivateKey::from_wif(TEST_WIF).unwrap();
        assert_eq!(hex::encode(key.to_bytes()), TEST_SECRET_HEX);
        assert_eq!(key.to_wif(), TEST_WIF);
    }

    #[test]
    fn test_public_key_string() {
        let key = PrivateKey::from_wif(TEST_WIF).unwrap();
        let public = key.public_key();
        assert_eq!(public.to_string(), TEST_PUBKEY);
        assert_eq!(
            hex::encode(public.to_bytes()),
            "0361437d9b6ab321dab23cd8da288ad0267debedc7247ca78d4be3f43ea6d4d28a"
        );

        let parsed: PublicKey = TEST_PUBKEY.parse().unwrap();
        assert_eq!(parsed, public);
        assert!(public.to_string_with_prefix("TST").starts_with("TST"));
    }

    #[test]
    fn test_invalid_wif_rejected() {
        assert!(matches!(PrivateKey::from_wif("invalid-key"), Err(Error::InvalidKeyFormat(_))));

        // Flip the last character to break the checksum
        let mut broken = TEST_WIF.to_string();
        broken.pop();
        broken.push('9');
        assert!(matches!(PrivateKey::from_wif(&broken), Err(Error::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_invalid_public_key_rejected() {
        assert!("STM1111".parse::<PublicKey>().is_err());
        assert!(TEST_PUBKEY.replace("STM", "XYZ").parse::<PublicKey>().is_err());
    }

    #[test]
    fn test_sign_is_canonical_and_recoverable() {
        let key = PrivateKey::from_wif(TEST_WIF).unwrap();

        for i in 0u8..16 {
            let digest = sha256(&[i]);
            let sig = key.sign(&digest).unwrap();
            assert!(sig.is_canonical());
            assert!((31..=34).contains(&sig.0[0]));
            assert_eq!(sig.recover(&digest).unwrap(), key.public_key());
        }
    }

    #[test]
    fn test_signatures_match_steem_js() {
        let key = PrivateKey::from_wif(TEST_WIF).unwrap();
        // (digest preimage, canonical on the first try?, steem-js signature)
        let vectors: [(u8, bool, &str); 3] = [
            (
                1,
                true,
                "1f296c7e10143d8285bf40cca9bef4edab2234a45b0175999fd36feb343fd21fb13c638b161ecea1d5b9e426399dbab9020de43917d950839f488a94b109022f99",
            ),
            (
                0,
                false,
                "1f23bbe5e44cf5573c558716d9bd09bc4ae83224483805e2524f2b3ca43d1838336764eee8921b03ba5c54d1d10f008e8f3927fb813cacc66f00e13cdbcfbdbbe0",
            ),
            (
                2,
                false,
                "207fdfb2fb886099c8ecd49411e80611c50c898686663e6150abaa714e2f57c58f67d1cbb791cf946a8cf85c3fb94bd6edf5c9719786653781dca4c4d5a103a004",
            ),
        ];

        for (preimage, first_try, expected) in vectors {
            let digest = sha256(&[preimage]);
            let plain = context().sign_ecdsa_recoverable(&Message::from_digest(digest), &key.secret);
            assert_eq!(Signature::from_recoverable(&plain).is_canonical(), first_try);
            assert_eq!(key.sign(&digest).unwrap().to_hex(), expected);
        }
    }

    #[test]
    fn test_scalar_helpers() {
        assert_eq!(reduce_mod_order(CURVE_ORDER), [0u8; 32]);
        let mut above = CURVE_ORDER;
        above[31] += 5;
        let mut five = [0u8; 32];
        five[31] = 5;
        assert_eq!(reduce_mod_order(above), five);
        assert_eq!(reduce_mod_order(five), five);

        let mut one = [0u8; 32];
        one[31] = 1;
        let k = SecretKey::from_slice(&sha256(b"k")).unwrap();
        let product = invert(&k).unwrap().mul_tweak(&to_scalar(&k.secret_bytes()).unwrap()).unwrap();
        assert_eq!(product.secret_bytes(), one);
    }

    #[test]
    fn test_sign_deterministic() {
        let key = PrivateKey::from_wif(TEST_WIF).unwrap();
        let digest = sha256(b"steem");
        assert_eq!(key.sign(&digest).unwrap(), key.sign(&digest).unwrap());
    }

    #[test]
    fn test_signature_hex_round_trip() {
        let key = PrivateKey::from_wif(TEST_WIF).unwrap();
        let sig = key.sign(&sha256(b"hello")).unwrap();
        let hex_sig = sig.to_hex();
        assert_eq!(hex_sig.len(), 130);
        assert_eq!(Signature::from_hex(&hex_sig).unwrap(), sig);
        assert!(Signature::from_hex("abcd").is_err());
    }

    #[test]
    fn test_recover_wrong_digest_gives_other_key() {
        let key = PrivateKey::from_wif(TEST_WIF).unwrap();
        let sig = key.sign(&sha256(b"one")).unwrap();
        let recovered = sig.recover(&sha256(b"two"));
        assert!(recovered.map(|k| k != key.public_key()).unwrap_or(true));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let key = PrivateKey::from_wif(TEST_WIF).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains(TEST_SECRET_HEX));
        assert!(debug.contains(TEST_PUBKEY));
    }
}
