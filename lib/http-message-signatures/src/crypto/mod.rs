//!
//! Signing and verification primitives shared by both engines
//!
//! The engines hand in the exact bytes of their signature base/string, this
//! module deals with the raw cryptography and the Base64 wire encoding.
//!

use ring::{
    rand::SystemRandom,
    signature::{Ed25519KeyPair, RSA_PKCS1_SHA256, RsaKeyPair, UnparsedPublicKey},
};

pub mod parse;

/// Anything that can produce raw signature bytes over a message
pub trait SigningKey {
    /// Sign a message, returning the raw signature bytes
    fn sign(&self, msg: &[u8]) -> Vec<u8>;
}

impl SigningKey for Ed25519KeyPair {
    #[inline]
    fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.sign(msg).as_ref().to_vec()
    }
}

impl SigningKey for RsaKeyPair {
    #[inline]
    fn sign(&self, msg: &[u8]) -> Vec<u8> {
        let mut buf = vec![0; self.public().modulus_len()];

        let rng = SystemRandom::new();
        self.sign(&RSA_PKCS1_SHA256, &rng, msg, &mut buf)
            .expect("[Bug] RSA signing failed");

        buf
    }
}

/// Sign a payload and encode the signature the way it travels in headers (Base64)
#[inline]
pub fn sign<SK>(payload: &[u8], key: &SK) -> String
where
    SK: SigningKey + ?Sized,
{
    base64_simd::STANDARD.encode_to_string(key.sign(payload))
}

/// Check a Base64-encoded signature against the message it claims to cover
///
/// A signature that doesn't decode counts as a failed verification, neither
/// engine distinguishes the two cases.
#[must_use]
pub fn verify<B>(msg: &[u8], encoded_signature: &str, key: &UnparsedPublicKey<B>) -> bool
where
    B: AsRef<[u8]>,
{
    let Ok(signature) = base64_simd::STANDARD.decode_to_vec(encoded_signature) else {
        return false;
    };

    key.verify(msg, &signature).is_ok()
}

#[cfg(test)]
mod test {
    use ring::{
        rand::SystemRandom,
        signature::{ED25519, Ed25519KeyPair, KeyPair, UnparsedPublicKey},
    };

    fn key_pair() -> Ed25519KeyPair {
        let rng = SystemRandom::new();
        let document = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
        Ed25519KeyPair::from_pkcs8(document.as_ref()).unwrap()
    }

    #[test]
    fn sign_verify_round_trip() {
        let key = key_pair();
        let public = UnparsedPublicKey::new(&ED25519, key.public_key().as_ref().to_vec());

        let encoded = super::sign(b"payload", &key);

        assert!(super::verify(b"payload", &encoded, &public));
        assert!(!super::verify(b"other payload", &encoded, &public));
    }

    #[test]
    fn undecodable_signature_fails() {
        let key = key_pair();
        let public = UnparsedPublicKey::new(&ED25519, key.public_key().as_ref().to_vec());

        assert!(!super::verify(b"payload", "%%% not base64 %%%", &public));
    }
}
