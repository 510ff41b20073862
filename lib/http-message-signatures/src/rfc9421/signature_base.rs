//!
//! Canonical signature base construction
//!
//! The base is rebuilt from the *actual* message data on the verification
//! path; the only thing the claimed parameters decide is which components get
//! canonicalised. Everything else is bound cryptographically.
//!

use super::SignatureParams;
use http::{HeaderMap, StatusCode};
use miette::Diagnostic;
use std::fmt::Write;
use thiserror::Error;

/// Signature base error
#[derive(Debug, Diagnostic, Error)]
pub enum Error {
    /// Header had an invalid value (non-UTF8 value)
    #[error(transparent)]
    InvalidHeaderValue(#[from] http::header::ToStrError),

    /// A covered component is missing from the message
    #[error("Missing covered component")]
    MissingComponent,

    /// A derived component doesn't exist for this message type
    #[error("Unsupported component: {0}")]
    UnsupportedComponent(String),
}

fn header_line(buffer: &mut String, headers: &HeaderMap, name: &str) -> Result<(), Error> {
    let value = headers
        .get(name)
        .ok_or(Error::MissingComponent)?
        .to_str()?;
    let _ = writeln!(buffer, "\"{}\": {}", name.to_lowercase(), value);

    Ok(())
}

fn params_line(buffer: &mut String, params: &SignatureParams<'_>) {
    let _ = write!(
        buffer,
        "\"@signature-params\": {}",
        super::signature_params_value(params)
    );
}

/// Construct the signature base of a request
///
/// `@target-uri` is taken verbatim from the request URI, so the caller has to
/// hand in the absolute form the signer saw.
pub fn construct_request<B>(
    request: &http::Request<B>,
    params: &SignatureParams<'_>,
) -> Result<String, Error> {
    let mut base = String::new();

    for component in &params.components {
        match *component {
            "@method" => {
                let _ = writeln!(
                    base,
                    "\"@method\": {}",
                    request.method().as_str().to_lowercase()
                );
            }
            "@target-uri" => {
                let _ = writeln!(base, "\"@target-uri\": {}", request.uri());
            }
            derived if derived.starts_with('@') => {
                return Err(Error::UnsupportedComponent(derived.to_string()));
            }
            header => header_line(&mut base, request.headers(), header)?,
        }
    }

    params_line(&mut base, params);

    Ok(base)
}

/// Construct the signature base of a response
pub fn construct_response(
    status: StatusCode,
    headers: &HeaderMap,
    params: &SignatureParams<'_>,
) -> Result<String, Error> {
    let mut base = String::new();

    for component in &params.components {
        match *component {
            "@status" => {
                let _ = writeln!(base, "\"@status\": {}", status.as_u16());
            }
            derived if derived.starts_with('@') => {
                return Err(Error::UnsupportedComponent(derived.to_string()));
            }
            header => header_line(&mut base, headers, header)?,
        }
    }

    params_line(&mut base, params);

    Ok(base)
}
