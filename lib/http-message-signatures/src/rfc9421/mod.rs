//!
//! RFC 9421 HTTP Message Signatures
//!
//! The scheme FASP requires and newer ActivityPub implementations prefer.
//! Signatures travel in a `Signature-Input`/`Signature` header pair, the
//! canonical signature base is rebuilt from derived components (`@method`,
//! `@target-uri`, `@status`) and covered headers.
//!

mod parse;
mod serialise;

pub mod easy;
pub mod signature_base;

pub use self::parse::{ParseError, SignatureInput, parse_signature, parse_signature_input};
pub use self::serialise::{signature_header, signature_input_header, signature_params_value};

/// Label this library attaches to its own signatures
///
/// Verification accepts any label as long as `Signature-Input` and
/// `Signature` agree on it.
pub const SIGNATURE_LABEL: &str = "sig1";

/// Parameters of a single signing/verification attempt
///
/// Immutable once constructed; one instance per attempt.
#[derive(Clone)]
pub struct SignatureParams<'a> {
    /// Ordered list of covered component identifiers
    pub components: Vec<&'a str>,

    /// Unix timestamp the signature was created at
    pub created: u64,

    /// Identifier of the signing key
    pub key_id: &'a str,
}
