use http_message_signatures::{cavage, digest};
use std::{convert::Infallible, future};

mod data;

const BODY: &[u8] = br#"{"type":"Create","actor":"https://example.com/users/alice"}"#;

#[tokio::test]
async fn rsa_round_trip() {
    let signed = cavage::easy::sign(
        self::data::post_request(),
        BODY,
        "https://example.com/users/alice#main-key",
        &self::data::rsa_private_key(),
    )
    .unwrap();

    // The legacy digest header was attached by the signer
    let digest_header = signed.headers().get("digest").unwrap().to_str().unwrap();
    assert!(digest::verify_any(BODY, digest_header));

    let is_valid = cavage::easy::verify(&signed, |key_id| {
        assert_eq!(key_id, "https://example.com/users/alice#main-key");
        future::ready(Ok::<_, Infallible>(data::RSA_PUBLIC_KEY.to_string()))
    })
    .await
    .unwrap();

    assert!(is_valid);
}

#[tokio::test]
async fn ed25519_round_trip() {
    let signed = cavage::easy::sign(
        self::data::get_request(),
        &[],
        "https://example.com/users/alice#main-key",
        &self::data::ed25519_private_key(),
    )
    .unwrap();

    let is_valid = cavage::easy::verify(&signed, |_key_id| {
        future::ready(Ok::<_, Infallible>(data::ED25519_PUBLIC_KEY.to_string()))
    })
    .await
    .unwrap();

    assert!(is_valid);
}

#[tokio::test]
async fn tampered_signature_rejected() {
    let signed = cavage::easy::sign(
        self::data::post_request(),
        BODY,
        "Test",
        &self::data::rsa_private_key(),
    )
    .unwrap();

    // Flip a byte inside the base64 payload of the signature field
    let header = signed
        .headers()
        .get("signature")
        .unwrap()
        .to_str()
        .unwrap();
    let start = header.find("signature=\"").unwrap() + "signature=\"".len();
    let mut tampered = header.to_string();
    let flipped = if &tampered[start..=start] == "A" { "B" } else { "A" };
    tampered.replace_range(start..=start, flipped);

    let (mut parts, body) = signed.into_parts();
    parts.headers.insert("signature", tampered.parse().unwrap());
    let tampered_request = http::Request::from_parts(parts, body);

    let is_valid = cavage::easy::verify(&tampered_request, |_key_id| {
        future::ready(Ok::<_, Infallible>(data::RSA_PUBLIC_KEY.to_string()))
    })
    .await
    .unwrap();

    assert!(!is_valid);
}

#[tokio::test]
async fn wrong_key_rejected() {
    let signed = cavage::easy::sign(
        self::data::post_request(),
        BODY,
        "Test",
        &self::data::rsa_private_key(),
    )
    .unwrap();

    let is_valid = cavage::easy::verify(&signed, |_key_id| {
        future::ready(Ok::<_, Infallible>(data::ED25519_PUBLIC_KEY.to_string()))
    })
    .await
    .unwrap();

    assert!(!is_valid);
}

#[tokio::test]
async fn cavage_does_not_verify_as_rfc9421() {
    let signed = cavage::easy::sign(
        self::data::post_request(),
        BODY,
        "Test",
        &self::data::rsa_private_key(),
    )
    .unwrap();

    // No `Signature-Input` header, so the RFC 9421 verifier has to refuse outright
    let result = http_message_signatures::rfc9421::easy::verify(&signed, |_key_id| {
        future::ready(Ok::<_, Infallible>(vec![]))
    })
    .await;

    assert!(matches!(
        result,
        Err(http_message_signatures::rfc9421::easy::Error::MissingSignature)
    ));
}
