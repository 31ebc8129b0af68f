// ============================================================================
// RPC Module - Authenticated JSON-RPC Calls
// ============================================================================
//
// Signed calls let a node verify that a request comes from an account
// holder without the private key ever leaving the client.
//
// Components:
//   - canonical: the exact bytes both sides hash
//   - signed_call: envelope construction, wire format and validation
//
// ============================================================================

pub mod canonical;
pub mod signed_call;

pub use canonical::{CanonicalMessage, DOMAIN_SEPARATOR, NONCE_LEN};
pub use signed_call::{
    sign, sign_with_options, validate, validate_at, KeyAuthorityVerifier, SignOptions,
    SignatureVerifier, SignedEnvelope, SignedPayload, SIGNATURE_VALIDITY_SECS, SIGNED_PARAM_KEY,
};
