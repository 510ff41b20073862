//!
//! Legacy draft-cavage HTTP Signatures
//!
//! Request-only scheme. The signature travels in a single `Signature` header
//! of comma-separated `key="value"` pairs, the signing string is rebuilt from
//! the headers named in the `headers` field.
//!

mod parse;

pub mod easy;
pub mod safety_check;
pub mod signature_string;

pub use self::parse::{ParseError, parse};
pub use self::safety_check::is_safe;

/// Parsed (or to-be-serialised) cavage `Signature` header
#[derive(Clone)]
pub struct SignatureHeader<'a> {
    /// Identifier of the signing key
    pub key_id: &'a str,

    /// Value of the `algorithm` field, if the signer sent one
    ///
    /// `hs2019` is an opaque "derive it from the key" marker and treated the
    /// same as an absent field.
    pub algorithm: Option<&'a str>,

    /// Ordered list of covered header names
    pub headers: Vec<&'a str>,

    /// Base64-encoded signature
    pub signature: &'a str,

    /// `(created)` timestamp
    pub created: Option<u64>,

    /// `(expires)` timestamp
    pub expires: Option<u64>,
}

/// Serialise a signature header into its wire representation
#[must_use]
pub fn serialise(header: &SignatureHeader<'_>) -> String {
    use std::fmt::Write;

    let mut buffer = String::new();

    let _ = write!(buffer, "keyId=\"{}\"", header.key_id);

    if let Some(algorithm) = header.algorithm {
        let _ = write!(buffer, ",algorithm=\"{algorithm}\"");
    }

    buffer.push_str(",headers=\"");
    for item in itertools::intersperse(header.headers.iter().copied(), " ") {
        buffer.push_str(item);
    }
    buffer.push('"');

    let _ = write!(buffer, ",signature=\"{}\"", header.signature);

    if let Some(created) = header.created {
        let _ = write!(buffer, ",created={created}");
    }

    if let Some(expires) = header.expires {
        let _ = write!(buffer, ",expires={expires}");
    }

    buffer
}

#[cfg(test)]
mod test {
    use super::SignatureHeader;

    #[test]
    fn serialise_wire_format() {
        let header = SignatureHeader {
            key_id: "https://example.com/users/alice#main-key",
            algorithm: Some("rsa-sha256"),
            headers: vec!["(request-target)", "host", "date", "digest"],
            signature: "c2lnbmF0dXJl",
            created: None,
            expires: None,
        };

        assert_eq!(
            super::serialise(&header),
            "keyId=\"https://example.com/users/alice#main-key\",algorithm=\"rsa-sha256\",headers=\"(request-target) host date digest\",signature=\"c2lnbmF0dXJl\"",
        );
    }
}
