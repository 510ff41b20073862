//!
//! HTTP message signatures for fediverse federation
//!
//! Implements both signature schemes found in the wild:
//!
//! - the legacy "draft-cavage" HTTP Signatures most ActivityPub implementations still speak
//! - RFC 9421 HTTP Message Signatures, required by FASP and newer ActivityPub stacks
//!
//! Only asymmetric signing schemes are supported (aka. no HMAC and such)
//!

use http::HeaderName;

pub use ring;

pub mod cavage;
pub mod crypto;
pub mod digest;
pub mod rfc9421;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// `Signature` header name (shared by both schemes)
pub static SIGNATURE_HEADER: HeaderName = HeaderName::from_static("signature");

/// `Signature-Input` header name (RFC 9421 only)
pub static SIGNATURE_INPUT_HEADER: HeaderName = HeaderName::from_static("signature-input");

/// `Content-Digest` header name (RFC 9530)
pub static CONTENT_DIGEST_HEADER: HeaderName = HeaderName::from_static("content-digest");

/// Legacy `Digest` header name
pub static DIGEST_HEADER: HeaderName = HeaderName::from_static("digest");
