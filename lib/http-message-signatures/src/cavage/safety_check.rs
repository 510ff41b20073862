use super::SignatureHeader;
use http::{Method, Request, header::DATE};
use std::{
    cmp::min,
    time::{Duration, SystemTime, SystemTimeError},
};
use thiserror::Error;

/// 15 minutes
const MAX_ACCEPTED_SIGNATURE_AGE: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error)]
pub enum SafetyCheckError {
    #[error(transparent)]
    InvalidDateHeader(#[from] httpdate::Error),

    #[error(transparent)]
    InvalidHeaderValue(#[from] http::header::ToStrError),

    #[error(transparent)]
    InvalidSystemTime(#[from] SystemTimeError),

    #[error("Missing required headers")]
    MissingRequiredHeaders,

    #[error("Signature too old")]
    SignatureTooOld,

    #[error("Unsupported HTTP method")]
    UnsupportedHttpMethod,
}

/// Check that a signature header covers enough of the request to be worth trusting
///
/// - GET signatures have to cover `host`
/// - POST signatures additionally have to cover the digest header
///   (either spelling)
/// - every signature has to cover `date` or carry a `(created)` timestamp,
///   and neither may lie outside the accepted age window
pub fn is_safe<B>(
    req: &Request<B>,
    signature_header: &SignatureHeader<'_>,
) -> Result<(), SafetyCheckError> {
    let covered = &signature_header.headers;

    let has_required = match *req.method() {
        Method::GET => covered.contains(&"host"),
        Method::POST => {
            covered.contains(&"host")
                && (covered.contains(&"digest") || covered.contains(&"content-digest"))
        }
        _ => return Err(SafetyCheckError::UnsupportedHttpMethod),
    };

    if !has_required {
        return Err(SafetyCheckError::MissingRequiredHeaders);
    }

    // The signature has to be bound to some timestamp
    if !covered.contains(&"date") && !covered.contains(&"(created)") {
        return Err(SafetyCheckError::MissingRequiredHeaders);
    }

    let signature_valid_duration = if let Some(expires) = signature_header.expires {
        min(Duration::from_secs(expires), MAX_ACCEPTED_SIGNATURE_AGE)
    } else {
        MAX_ACCEPTED_SIGNATURE_AGE
    };

    if let Some(created) = signature_header.created {
        let created_time = SystemTime::UNIX_EPOCH + Duration::from_secs(created);
        if SystemTime::now().duration_since(created_time)? > signature_valid_duration {
            return Err(SafetyCheckError::SignatureTooOld);
        }
    }

    if let Some(date_header) = req.headers().get(DATE) {
        let date_header_time = httpdate::parse_http_date(date_header.to_str()?)?;
        if SystemTime::now().duration_since(date_header_time)? > signature_valid_duration {
            return Err(SafetyCheckError::SignatureTooOld);
        }
    }

    Ok(())
}
