//!
//! Content digest handling for both header spellings
//!
//! RFC 9530 dictates `Content-Digest: sha-256=:<base64>:`, the pre-standard
//! `Digest` header spells the same hash as `SHA-256=<base64>`. FASP only ever
//! accepts the RFC 9530 form, ActivityPub has to tolerate both.
//!

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compute the digest of a body in its RFC 9530 representation
#[must_use]
pub fn digest(body: &[u8]) -> String {
    let hash = Sha256::digest(body);
    let encoded = base64_simd::STANDARD.encode_to_string(hash);
    format!("sha-256=:{encoded}:")
}

/// Compute the digest of a body in its legacy `Digest` header representation
#[must_use]
pub fn digest_legacy(body: &[u8]) -> String {
    let hash = Sha256::digest(body);
    let encoded = base64_simd::STANDARD.encode_to_string(hash);
    format!("SHA-256={encoded}")
}

/// Verify a digest header value against a body, RFC 9530 spelling only
///
/// The comparison is an exact constant-time string match, format included.
#[must_use]
pub fn verify(body: &[u8], header: &str) -> bool {
    digest(body).as_bytes().ct_eq(header.as_bytes()).into()
}

/// Verify a digest header value against a body, accepting either spelling
///
/// Interop helper for the ActivityPub inbox path where old signers still send
/// the legacy `Digest` header.
#[must_use]
pub fn verify_any(body: &[u8], header: &str) -> bool {
    let rfc9530: bool = digest(body).as_bytes().ct_eq(header.as_bytes()).into();
    let legacy: bool = digest_legacy(body)
        .as_bytes()
        .ct_eq(header.as_bytes())
        .into();

    rfc9530 | legacy
}
