/// Key format helpers for account credentials.
///
/// Thin wrappers over `crypto` for callers that deal in strings: wallets,
/// config loaders and form validation.

use crate::crypto::{PrivateKey, PublicKey, PUBLIC_KEY_PREFIX};
use crate::error::Result;

/// True if `wif` decodes to a valid private key
pub fn is_wif(wif: &str) -> bool {
    PrivateKey::from_wif(wif).is_ok()
}

/// `STM...` public key for a WIF private key
pub fn wif_to_public(wif: &str) -> Result<String> {
    Ok(PrivateKey::from_wif(wif)?.public_key().to_string())
}

/// True if `pubkey` is a well-formed key with the given prefix (`STM` when `None`)
pub fn is_pubkey(pubkey: &str, prefix: Option<&str>) -> bool {
    PublicKey::from_str_with_prefix(pubkey, prefix.unwrap_or(PUBLIC_KEY_PREFIX)).is_ok()
}

/// True if `wif` is the private half of `pubkey`
pub fn wif_is_valid(wif: &str, pubkey: &str) -> bool {
    matches!(wif_to_public(wif), Ok(derived) if derived == pubkey)
}
