//!
//! Inbound federation request authentication
//!
//! Decides whether a request hitting an inbox or FASP endpoint is accepted.
//! Detects which of the two signature schemes the sender used, resolves the
//! claimed key (remote actor key documents for URL key IDs, the injected
//! [`PeerKeyStore`] for registered peers) and verifies signature and digest.
//!
//! The outcome is a plain `bool`. Whatever goes wrong on the way counts as
//! a rejection, never as a panic or an escaped error.
//!

use http::{Method, Request, request::Parts};
use http_message_signatures::{
    CONTENT_DIGEST_HEADER, DIGEST_HEADER, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER, cavage,
    crypto::parse::{self, KeyMaterial},
    digest, rfc9421,
    ring::signature::UnparsedPublicKey,
};
use shisa_core::error::BoxError;
use shisa_http_client::Client;
use std::future::Future;
use tracing::{debug, instrument};
use typed_builder::TypedBuilder;

mod error;
mod remote_key;

pub use self::error::Error;

/// Registry of public keys for peers authenticated by bare key IDs
///
/// FASP providers register their Ed25519 key out-of-band; the key ID in their
/// signatures is an opaque identifier, not a URL. The store hands back the
/// raw key material, or `None` for unregistered IDs.
pub trait PeerKeyStore: Send + Sync {
    /// Look up the raw public key material registered for a key ID
    fn public_key(
        &self,
        key_id: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, BoxError>> + Send;
}

fn is_url(key_id: &str) -> bool {
    key_id.starts_with("https://") || key_id.starts_with("http://")
}

fn collapse_rfc9421(error: rfc9421::easy::Error) -> Error {
    match error {
        rfc9421::easy::Error::GetKey(source) => source
            .downcast::<Error>()
            .map_or(Error::KeyFetchFailed, |boxed| *boxed),
        _ => Error::MalformedHeader,
    }
}

fn collapse_cavage(error: cavage::easy::Error) -> Error {
    match error {
        cavage::easy::Error::GetKey(source) => source
            .downcast::<Error>()
            .map_or(Error::KeyFetchFailed, |boxed| *boxed),
        cavage::easy::Error::InvalidKey(..) => Error::UnsupportedAlgorithm,
        _ => Error::MalformedHeader,
    }
}

/// Authenticator for inbound federation requests
#[derive(Clone, TypedBuilder)]
pub struct Authenticator<S> {
    client: Client,
    key_store: S,
}

impl<S> Authenticator<S>
where
    S: PeerKeyStore,
{
    /// Authenticate an inbound request against its raw body bytes
    ///
    /// `raw_body` has to be the bytes exactly as received, before any
    /// deserialisation, since the digest binds them.
    #[instrument(skip_all, fields(method = %parts.method, uri = %parts.uri))]
    pub async fn authenticate(&self, parts: &Parts, raw_body: &[u8]) -> bool {
        match self.verify(parts, raw_body).await {
            Ok(()) => true,
            Err(error) => {
                debug!(%error, "rejecting request");
                false
            }
        }
    }

    async fn verify(&self, parts: &Parts, raw_body: &[u8]) -> Result<(), Error> {
        let req = Request::from_parts(parts.clone(), ());

        if req.headers().contains_key(&SIGNATURE_INPUT_HEADER) {
            self.verify_rfc9421(&req, raw_body).await
        } else if req.headers().contains_key(&SIGNATURE_HEADER) {
            self.verify_cavage(&req, raw_body).await
        } else {
            Err(Error::MalformedHeader)
        }
    }

    async fn verify_rfc9421(&self, req: &Request<()>, raw_body: &[u8]) -> Result<(), Error> {
        // The signature only proves the digest header, the digest proves the body
        if let Some(value) = req.headers().get(&CONTENT_DIGEST_HEADER) {
            let value = value.to_str().map_err(|_| Error::MalformedHeader)?;
            if !digest::verify(raw_body, value) {
                return Err(Error::DigestMismatch);
            }
        }

        let valid = rfc9421::easy::verify(req, |key_id| self.resolve_candidates(key_id))
            .await
            .map_err(collapse_rfc9421)?;

        if valid { Ok(()) } else { Err(Error::SignatureMismatch) }
    }

    async fn verify_cavage(&self, req: &Request<()>, raw_body: &[u8]) -> Result<(), Error> {
        if *req.method() == Method::POST {
            let value = req
                .headers()
                .get(&DIGEST_HEADER)
                .or_else(|| req.headers().get(&CONTENT_DIGEST_HEADER))
                .ok_or(Error::DigestMismatch)?
                .to_str()
                .map_err(|_| Error::MalformedHeader)?;

            if !digest::verify_any(raw_body, value) {
                return Err(Error::DigestMismatch);
            }
        }

        let valid = cavage::easy::verify(req, |key_id| self.resolve_pem(key_id))
            .await
            .map_err(collapse_cavage)?;

        if valid { Ok(()) } else { Err(Error::SignatureMismatch) }
    }

    /// Resolve a key ID into its ordered verification key candidates
    async fn resolve_candidates(
        &self,
        key_id: &str,
    ) -> Result<Vec<UnparsedPublicKey<Vec<u8>>>, Error> {
        if is_url(key_id) {
            let pem = remote_key::fetch(&self.client, key_id).await?;
            let key = parse::public_key(&pem).map_err(|error| {
                debug!(?error, "failed to import remote key");
                Error::UnsupportedAlgorithm
            })?;

            return Ok(vec![key]);
        }

        let material = self
            .key_store
            .public_key(key_id)
            .await
            .map_err(|error| {
                debug!(?error, "peer key store lookup failed");
                Error::KeyFetchFailed
            })?
            .ok_or(Error::UnknownKey)?;

        parse::candidate_keys(KeyMaterial::Raw(&material)).map_err(|error| {
            debug!(?error, "failed to import peer key");
            Error::UnsupportedAlgorithm
        })
    }

    /// Cavage key IDs are actor key URLs; a bare ID has nothing to dereference
    async fn resolve_pem(&self, key_id: &str) -> Result<String, Error> {
        if !is_url(key_id) {
            return Err(Error::UnknownKey);
        }

        remote_key::fetch(&self.client, key_id).await
    }
}
