use thiserror::Error;

/// Reasons an inbound request fails authentication
///
/// The taxonomy only ever surfaces through logs; the boundary itself
/// collapses every variant into a rejection.
#[derive(Debug, Error)]
pub enum Error {
    /// The digest header doesn't match the request body
    #[error("Digest header does not match the request body")]
    DigestMismatch,

    /// Fetching the remote signing key failed
    #[error("Failed to fetch the signing key")]
    KeyFetchFailed,

    /// A signature header is missing or unparseable
    #[error("Malformed signature header")]
    MalformedHeader,

    /// The signature doesn't verify against the resolved key
    #[error("Signature verification failed")]
    SignatureMismatch,

    /// The key ID resolves to nothing
    #[error("Unknown key ID")]
    UnknownKey,

    /// The signature names an algorithm we don't speak
    #[error("Unsupported signature algorithm")]
    UnsupportedAlgorithm,
}
