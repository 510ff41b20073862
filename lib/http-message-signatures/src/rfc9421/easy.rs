//!
//! Easy and fool-proof RFC 9421 signature handling
//!

use crate::{
    BoxError, CONTENT_DIGEST_HEADER, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER,
    crypto::{self, parse::SigningKey},
    digest,
    rfc9421::SignatureParams,
};
use http::{HeaderMap, HeaderValue, StatusCode};
use ring::signature::UnparsedPublicKey;
use std::{
    future::Future,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tracing::{debug, instrument};

/// Components this library covers when signing a request
const REQUEST_COMPONENTS: &[&str] = &["@method", "@target-uri", "content-digest"];

/// Components this library covers when signing a response
const RESPONSE_COMPONENTS: &[&str] = &["@status", "content-digest"];

/// Easy module error
#[derive(Debug, Error)]
pub enum Error {
    /// Couldn't get keys from user-provided closure
    #[error(transparent)]
    GetKey(BoxError),

    /// Invalid HTTP header value (non UTF-8 value)
    #[error(transparent)]
    InvalidHeaderValue(#[from] http::header::ToStrError),

    /// Signature header parsing failed
    #[error(transparent)]
    InvalidSignatureHeader(#[from] super::ParseError),

    /// One of `Signature-Input`/`Signature` is missing
    #[error("Missing signature")]
    MissingSignature,

    /// Signature base construction failure
    #[error(transparent)]
    SignatureBase(#[from] super::signature_base::Error),
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("[Bug] System time set before the Unix epoch")
        .as_secs()
}

/// Sign an HTTP request using opinionated defaults
///
/// Sets/overwrites the `Content-Digest` header computed over `body` (an empty
/// body is digested like any other) and covers
/// `@method`/`@target-uri`/`content-digest`. The request URI has to be
/// absolute, otherwise the `@target-uri` component the receiver reconstructs
/// won't match.
///
/// # Errors
///
/// Signature base construction failed
#[instrument(skip_all)]
pub fn sign<B>(
    mut req: http::Request<B>,
    body: &[u8],
    key_id: &str,
    key: &SigningKey,
) -> Result<http::Request<B>, Error> {
    let digest_header_value = HeaderValue::from_str(&digest::digest(body))
        .expect("[Bug] Digest is not a valid header value");
    req.headers_mut()
        .insert(&CONTENT_DIGEST_HEADER, digest_header_value);

    let params = SignatureParams {
        components: REQUEST_COMPONENTS.to_vec(),
        created: unix_now(),
        key_id,
    };

    let base = super::signature_base::construct_request(&req, &params)?;
    let signature = crypto::sign(base.as_bytes(), key);

    req.headers_mut().insert(
        &SIGNATURE_INPUT_HEADER,
        HeaderValue::from_str(&super::signature_input_header(&params))
            .expect("[Bug] Signature-Input is not a valid header value"),
    );
    req.headers_mut().insert(
        &SIGNATURE_HEADER,
        HeaderValue::from_str(&super::signature_header(&signature))
            .expect("[Bug] Signature is not a valid header value"),
    );

    Ok(req)
}

/// Headers to attach to an outbound signed response
pub struct SignedResponseHeaders {
    /// `Content-Digest` header value
    pub content_digest: String,

    /// `Signature-Input` header value
    pub signature_input: String,

    /// `Signature` header value
    pub signature: String,
}

/// Sign a response body, covering `@status` and `content-digest`
///
/// Used whenever this server answers a FASP request with a signed response.
///
/// # Errors
///
/// Signature base construction failed
#[instrument(skip_all)]
pub fn sign_response(
    status: StatusCode,
    body: &[u8],
    key_id: &str,
    key: &SigningKey,
) -> Result<SignedResponseHeaders, Error> {
    let content_digest = digest::digest(body);

    let mut headers = HeaderMap::new();
    headers.insert(
        &CONTENT_DIGEST_HEADER,
        HeaderValue::from_str(&content_digest)
            .expect("[Bug] Digest is not a valid header value"),
    );

    let params = SignatureParams {
        components: RESPONSE_COMPONENTS.to_vec(),
        created: unix_now(),
        key_id,
    };

    let base = super::signature_base::construct_response(status, &headers, &params)?;
    let signature = crypto::sign(base.as_bytes(), key);

    Ok(SignedResponseHeaders {
        content_digest,
        signature_input: super::signature_input_header(&params),
        signature: super::signature_header(&signature),
    })
}

/// Verify an HTTP request using opinionated defaults
///
/// `get_keys` resolves the claimed key ID into the ordered list of
/// verification key candidates to try; the signature is valid if any
/// candidate verifies. The claimed parameters only decide which components
/// get canonicalised, the base itself is rebuilt from the actual request.
///
/// # Errors
///
/// - The `Signature-Input`/`Signature` headers are missing or unparseable
/// - The keys couldn't be resolved
#[instrument(skip_all)]
pub async fn verify<'r, B, F, Fut, E>(req: &'r http::Request<B>, get_keys: F) -> Result<bool, Error>
where
    F: FnOnce(&'r str) -> Fut,
    Fut: Future<Output = Result<Vec<UnparsedPublicKey<Vec<u8>>>, E>>,
    E: Into<BoxError>,
{
    let Some(input_header) = req.headers().get(&SIGNATURE_INPUT_HEADER) else {
        debug!("Missing 'Signature-Input' header");
        return Err(Error::MissingSignature);
    };
    let Some(signature_header) = req.headers().get(&SIGNATURE_HEADER) else {
        debug!("Missing 'Signature' header");
        return Err(Error::MissingSignature);
    };

    let signature_input = super::parse_signature_input(input_header.to_str()?)?;
    let (label, encoded_signature) = super::parse_signature(signature_header.to_str()?)?;

    if label != signature_input.label {
        debug!("'Signature-Input' and 'Signature' labels disagree");
        return Ok(false);
    }

    let base = super::signature_base::construct_request(req, &signature_input.params)?;

    let keys = get_keys(signature_input.params.key_id)
        .await
        .map_err(|err| Error::GetKey(err.into()))?;

    let is_valid = keys
        .iter()
        .any(|key| crypto::verify(base.as_bytes(), encoded_signature, key));

    Ok(is_valid)
}

/// Verify a signed response against its status, headers and a set of key candidates
///
/// # Errors
///
/// - The `Signature-Input`/`Signature` headers are missing or unparseable
pub fn verify_response(
    status: StatusCode,
    headers: &HeaderMap,
    keys: &[UnparsedPublicKey<Vec<u8>>],
) -> Result<bool, Error> {
    let Some(input_header) = headers.get(&SIGNATURE_INPUT_HEADER) else {
        return Err(Error::MissingSignature);
    };
    let Some(signature_header) = headers.get(&SIGNATURE_HEADER) else {
        return Err(Error::MissingSignature);
    };

    let signature_input = super::parse_signature_input(input_header.to_str()?)?;
    let (label, encoded_signature) = super::parse_signature(signature_header.to_str()?)?;

    if label != signature_input.label {
        return Ok(false);
    }

    let base = super::signature_base::construct_response(status, headers, &signature_input.params)?;

    let is_valid = keys
        .iter()
        .any(|key| crypto::verify(base.as_bytes(), encoded_signature, key));

    Ok(is_valid)
}
