//!
//! Parse and import cryptographic keys for use in the signature engines
//!
//! Key material arrives in two shapes: SPKI-encoded PEM documents (ActivityPub
//! actor keys) and raw 32-byte Ed25519 public keys (FASP provider keys).
//! Which `ring` verification algorithm a key is bound to is decided
//! deterministically from the key material itself, never from call-site
//! history: a PEM document carries its algorithm OID, raw material is
//! classified by length.
//!

use super::SigningKey as SigningKeyTrait;
use const_oid::db::{rfc5912::RSA_ENCRYPTION, rfc8410::ID_ED_25519};
use miette::Diagnostic;
use pkcs8::{Document, PrivateKeyInfo, SecretDocument, SubjectPublicKeyInfoRef};
use ring::signature::{
    ED25519, Ed25519KeyPair, RSA_PKCS1_2048_8192_SHA256, RSA_PSS_2048_8192_SHA256, RsaKeyPair,
    UnparsedPublicKey, VerificationAlgorithm,
};
use std::str::FromStr;
use thiserror::Error;

/// Raw length of an Ed25519 public key
const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Key parsing error
#[derive(Debug, Diagnostic, Error)]
pub enum Error {
    /// Malformed DER structure
    #[error(transparent)]
    Der(#[from] pkcs8::der::Error),

    /// Key rejected
    #[error(transparent)]
    KeyRejected(#[from] ring::error::KeyRejected),

    /// Malformed key
    #[error("Malformed key")]
    MalformedKey,

    /// Malformed PKCS#8 document
    #[error(transparent)]
    Pkcs8(#[from] pkcs8::Error),

    /// Algorithm identifier names nothing we support
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Signature algorithm identifier
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Algorithm {
    /// Ed25519 (EdDSA over Curve25519)
    Ed25519,

    /// RSASSA-PKCS1-v1.5 with SHA-256
    RsaSha256,

    /// RSASSA-PSS with SHA-256
    RsaPssSha256,
}

impl Algorithm {
    /// Wire name of the algorithm as it appears in signature headers
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::RsaSha256 => "rsa-sha256",
            Self::RsaPssSha256 => "rsa-pss-sha256",
        }
    }

    fn verification(self) -> &'static dyn VerificationAlgorithm {
        match self {
            Self::Ed25519 => &ED25519,
            Self::RsaSha256 => &RSA_PKCS1_2048_8192_SHA256,
            Self::RsaPssSha256 => &RSA_PSS_2048_8192_SHA256,
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let algorithm = match value {
            "ed25519" => Self::Ed25519,
            "rsa-sha256" => Self::RsaSha256,
            "rsa-pss-sha256" => Self::RsaPssSha256,
            unknown => return Err(Error::UnsupportedAlgorithm(unknown.to_string())),
        };

        Ok(algorithm)
    }
}

/// Verification key material in one of its accepted shapes
#[derive(Clone, Copy)]
pub enum KeyMaterial<'a> {
    /// SPKI-encoded PEM document
    Pem(&'a str),

    /// Raw public key bytes
    Raw(&'a [u8]),
}

fn spki_bytes(pem: &str) -> Result<(pkcs8::ObjectIdentifier, Vec<u8>), Error> {
    let (_pem_tag, document) = Document::from_pem(pem)?;
    let spki: SubjectPublicKeyInfoRef<'_> = document.decode_msg()?;

    let raw_bytes = spki
        .subject_public_key
        .as_bytes()
        .ok_or(Error::MalformedKey)?
        .to_vec();

    Ok((spki.algorithm.oid, raw_bytes))
}

/// Parse a public key from its SPKI PEM form, deciding the algorithm from the document's OID
///
/// Currently supported algorithms:
///
/// - RSA
/// - Ed25519
#[inline]
pub fn public_key(pem: &str) -> Result<UnparsedPublicKey<Vec<u8>>, Error> {
    let (oid, raw_bytes) = spki_bytes(pem)?;

    let verify_algo: &'static dyn VerificationAlgorithm = if oid == RSA_ENCRYPTION {
        &RSA_PKCS1_2048_8192_SHA256
    } else if oid == ID_ED_25519 {
        &ED25519
    } else {
        return Err(Error::UnsupportedAlgorithm(oid.to_string()));
    };

    Ok(UnparsedPublicKey::new(verify_algo, raw_bytes))
}

/// Import a verification key with an explicitly declared algorithm
///
/// Used when the signature scheme names its algorithm (the cavage `algorithm`
/// field, or a FASP peer registration which is Ed25519 by definition).
pub fn verification_key(
    algorithm: Algorithm,
    material: KeyMaterial<'_>,
) -> Result<UnparsedPublicKey<Vec<u8>>, Error> {
    let raw_bytes = match material {
        KeyMaterial::Pem(pem) => spki_bytes(pem)?.1,
        KeyMaterial::Raw(bytes) => {
            if algorithm == Algorithm::Ed25519 && bytes.len() != ED25519_PUBLIC_KEY_LEN {
                return Err(Error::MalformedKey);
            }

            bytes.to_vec()
        }
    };

    Ok(UnparsedPublicKey::new(algorithm.verification(), raw_bytes))
}

/// Build the ordered list of verification key candidates for key material with no declared algorithm
///
/// A PEM document yields exactly one candidate (its OID decides). Raw 32-byte
/// material is an Ed25519 key, any other raw material is tried as RSA,
/// PKCS1-v1.5 before PSS.
pub fn candidate_keys(material: KeyMaterial<'_>) -> Result<Vec<UnparsedPublicKey<Vec<u8>>>, Error> {
    let candidates = match material {
        KeyMaterial::Pem(pem) => vec![public_key(pem)?],
        KeyMaterial::Raw(bytes) if bytes.len() == ED25519_PUBLIC_KEY_LEN => {
            vec![UnparsedPublicKey::new(&ED25519, bytes.to_vec())]
        }
        KeyMaterial::Raw(bytes) => vec![
            UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, bytes.to_vec()),
            UnparsedPublicKey::new(&RSA_PSS_2048_8192_SHA256, bytes.to_vec()),
        ],
    };

    Ok(candidates)
}

/// Enum dispatch over various signing keys
#[non_exhaustive]
pub enum SigningKey {
    /// Ed25519
    Ed25519(Ed25519KeyPair),

    /// RSA
    Rsa(RsaKeyPair),
}

impl SigningKey {
    /// Algorithm this key signs with
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Ed25519(..) => Algorithm::Ed25519,
            Self::Rsa(..) => Algorithm::RsaSha256,
        }
    }
}

impl SigningKeyTrait for SigningKey {
    fn sign(&self, msg: &[u8]) -> Vec<u8> {
        match self {
            Self::Ed25519(key) => SigningKeyTrait::sign(key, msg),
            Self::Rsa(key) => SigningKeyTrait::sign(key, msg),
        }
    }
}

/// Parse a private key from its PKCS#8 PEM form
///
/// Currently supported algorithms:
///
/// - RSA
/// - Ed25519
#[inline]
pub fn private_key(pem: &str) -> Result<SigningKey, Error> {
    let (_tag_line, document) = SecretDocument::from_pem(pem)?;
    let key_info: PrivateKeyInfo<'_> = document.decode_msg()?;

    let signing_key = if key_info.algorithm.oid == RSA_ENCRYPTION {
        SigningKey::Rsa(RsaKeyPair::from_pkcs8(document.as_bytes())?)
    } else if key_info.algorithm.oid == ID_ED_25519 {
        // `maybe_unchecked` since the common v1 documents lack the public key component
        SigningKey::Ed25519(Ed25519KeyPair::from_pkcs8_maybe_unchecked(
            document.as_bytes(),
        )?)
    } else {
        return Err(Error::UnsupportedAlgorithm(
            key_info.algorithm.oid.to_string(),
        ));
    };

    Ok(signing_key)
}

#[cfg(test)]
mod test {
    use super::Algorithm;

    #[test]
    fn unknown_algorithm_rejected() {
        assert!(matches!(
            "hmac-sha256".parse::<Algorithm>(),
            Err(super::Error::UnsupportedAlgorithm(..))
        ));
        assert!(matches!(
            "".parse::<Algorithm>(),
            Err(super::Error::UnsupportedAlgorithm(..))
        ));
    }

    #[test]
    fn wire_names_round_trip() {
        for algorithm in [
            Algorithm::Ed25519,
            Algorithm::RsaSha256,
            Algorithm::RsaPssSha256,
        ] {
            assert_eq!(algorithm.as_str().parse::<Algorithm>().unwrap(), algorithm);
        }
    }
}
