//!
//! Easy and fool-proof cavage signature handling
//!
//! Opinionated sign/verify entry points for callers that don't want to wire
//! the individual pieces together themselves
//!

use crate::{
    BoxError, DIGEST_HEADER, SIGNATURE_HEADER,
    cavage::SignatureHeader,
    crypto::{
        self,
        parse::{Algorithm, KeyMaterial, SigningKey},
    },
    digest,
};
use http::{HeaderValue, Method, header::DATE};
use std::{future::Future, time::SystemTime};
use thiserror::Error;
use tracing::{debug, instrument};

const GET_HEADERS: &[&str] = &["host", "date"];
const POST_HEADERS: &[&str] = &["host", "date", "digest"];

/// Easy module error
#[derive(Debug, Error)]
pub enum Error {
    /// Couldn't get key from user-provided closure
    #[error(transparent)]
    GetKey(BoxError),

    /// Invalid HTTP header value (non UTF-8 value)
    #[error(transparent)]
    InvalidHeaderValue(#[from] http::header::ToStrError),

    /// Public key failed to parse
    #[error(transparent)]
    InvalidKey(#[from] crate::crypto::parse::Error),

    /// Signature header parsing failed
    #[error(transparent)]
    InvalidSignatureHeader(#[from] super::ParseError),

    /// Signature header is missing
    #[error("Missing signature")]
    MissingSignature,

    /// Signature string construction failure
    #[error(transparent)]
    SignatureStringConstruction(#[from] super::signature_string::Error),

    /// HTTP method is unsupported
    #[error("Unsupported HTTP method")]
    UnsupportedHttpMethod,
}

/// Sign an HTTP request using the provided signing key using opinionated defaults
///
/// Sets/overwrites the `Date` header, and for POST requests the legacy
/// `Digest` header computed over `body`.
///
/// # Errors
///
/// - The HTTP method is neither GET nor POST
#[instrument(skip_all)]
pub fn sign<B>(
    mut req: http::Request<B>,
    body: &[u8],
    key_id: &str,
    key: &SigningKey,
) -> Result<http::Request<B>, Error> {
    let date_header_value = HeaderValue::from_str(&httpdate::fmt_http_date(SystemTime::now()))
        .expect("[Bug] HTTP date is not a valid header value");
    req.headers_mut().insert(DATE, date_header_value);

    let headers = match *req.method() {
        Method::GET => GET_HEADERS,
        Method::POST => {
            let digest_header_value = HeaderValue::from_str(&digest::digest_legacy(body))
                .expect("[Bug] Digest is not a valid header value");
            req.headers_mut().insert(&DIGEST_HEADER, digest_header_value);

            POST_HEADERS
        }
        _ => return Err(Error::UnsupportedHttpMethod),
    };

    let mut signature_header = SignatureHeader {
        key_id,
        algorithm: Some(key.algorithm().as_str()),
        headers: headers.to_vec(),
        signature: "",
        created: None,
        expires: None,
    };

    debug_assert!(super::is_safe(&req, &signature_header).is_ok());

    let signature_string = super::signature_string::construct(&req, &signature_header)?;
    let signature = crypto::sign(signature_string.as_bytes(), key);
    signature_header.signature = &signature;

    let signature_header_value = HeaderValue::from_str(&super::serialise(&signature_header))
        .expect("[Bug] Signature header is not a valid header value");

    req.headers_mut()
        .insert(&SIGNATURE_HEADER, signature_header_value);

    Ok(req)
}

/// Verify an HTTP request using opinionated defaults
///
/// `get_key` resolves a key ID to the SPKI PEM representation of the signer's
/// public key. When the signature header declares a concrete algorithm the key
/// is imported for exactly that algorithm; an absent or `hs2019` algorithm
/// field falls back to the algorithm encoded in the PEM document itself.
///
/// # Errors
///
/// - The `Signature` header is missing or unparseable
/// - The key couldn't be resolved or imported
#[instrument(skip_all)]
pub async fn verify<'r, B, F, Fut, E>(req: &'r http::Request<B>, get_key: F) -> Result<bool, Error>
where
    F: FnOnce(&'r str) -> Fut,
    Fut: Future<Output = Result<String, E>>,
    E: Into<BoxError>,
{
    let Some(header) = req.headers().get(&SIGNATURE_HEADER) else {
        debug!("Missing 'Signature' header");
        return Err(Error::MissingSignature);
    };

    let signature_header = super::parse(header.to_str()?)?;
    if let Err(error) = super::is_safe(req, &signature_header) {
        debug!(?error, "Rejecting signature on safety grounds");
        return Ok(false);
    }

    let signature_string = super::signature_string::construct(req, &signature_header)?;
    let pem_key = get_key(signature_header.key_id)
        .await
        .map_err(|err| Error::GetKey(err.into()))?;

    let public_key = match signature_header.algorithm {
        None | Some("hs2019") => crypto::parse::public_key(&pem_key)?,
        Some(name) => {
            let algorithm: Algorithm = name.parse()?;
            crypto::parse::verification_key(algorithm, KeyMaterial::Pem(&pem_key))?
        }
    };

    let is_valid = crypto::verify(
        signature_string.as_bytes(),
        signature_header.signature,
        &public_key,
    );

    Ok(is_valid)
}
