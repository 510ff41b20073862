use http::{Request, StatusCode};
use http_message_signatures::{
    crypto::parse::{self, KeyMaterial},
    digest, rfc9421,
};
use std::{convert::Infallible, future};

mod data;

const BODY: &[u8] = br#"{"capability":"data_sharing","version":"v0"}"#;

fn ed25519_candidates() -> Vec<http_message_signatures::ring::signature::UnparsedPublicKey<Vec<u8>>> {
    let raw = base64_simd::STANDARD
        .decode_to_vec(data::ED25519_PUBLIC_KEY_RAW_B64)
        .unwrap();
    parse::candidate_keys(KeyMaterial::Raw(&raw)).unwrap()
}

#[tokio::test]
async fn ed25519_round_trip() {
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("https://fasp.example.com/registration")
        .body(())
        .unwrap();

    let signed = rfc9421::easy::sign(request, BODY, "fasp-key-1", &data::ed25519_private_key())
        .unwrap();

    // Digest header in the RFC 9530 spelling
    let digest_header = signed
        .headers()
        .get("content-digest")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(digest::verify(BODY, digest_header));

    let is_valid = rfc9421::easy::verify(&signed, |key_id| {
        assert_eq!(key_id, "fasp-key-1");
        future::ready(Ok::<_, Infallible>(ed25519_candidates()))
    })
    .await
    .unwrap();

    assert!(is_valid);
}

#[tokio::test]
async fn rsa_round_trip() {
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("https://example.com/inbox")
        .body(())
        .unwrap();

    let signed = rfc9421::easy::sign(
        request,
        BODY,
        "https://example.com/users/alice#main-key",
        &data::rsa_private_key(),
    )
    .unwrap();

    let is_valid = rfc9421::easy::verify(&signed, |_key_id| {
        future::ready(Ok::<_, Infallible>(vec![
            parse::public_key(data::RSA_PUBLIC_KEY).unwrap(),
        ]))
    })
    .await
    .unwrap();

    assert!(is_valid);
}

#[tokio::test]
async fn tampered_target_uri_rejected() {
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("https://fasp.example.com/registration")
        .body(())
        .unwrap();

    let signed = rfc9421::easy::sign(request, BODY, "fasp-key-1", &data::ed25519_private_key())
        .unwrap();

    // Replay the signed headers against a different target
    let (parts, body) = signed.into_parts();
    let mut replayed = Request::builder()
        .method(parts.method)
        .uri("https://attacker.example.com/registration")
        .body(body)
        .unwrap();
    *replayed.headers_mut() = parts.headers;

    let is_valid = rfc9421::easy::verify(&replayed, |_key_id| {
        future::ready(Ok::<_, Infallible>(ed25519_candidates()))
    })
    .await
    .unwrap();

    assert!(!is_valid);
}

#[tokio::test]
async fn tampered_digest_rejected() {
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("https://fasp.example.com/registration")
        .body(())
        .unwrap();

    let mut signed =
        rfc9421::easy::sign(request, BODY, "fasp-key-1", &data::ed25519_private_key()).unwrap();

    // Swap in the digest of a different body
    let forged_digest = digest::digest(b"something else entirely");
    signed
        .headers_mut()
        .insert("content-digest", forged_digest.parse().unwrap());

    let is_valid = rfc9421::easy::verify(&signed, |_key_id| {
        future::ready(Ok::<_, Infallible>(ed25519_candidates()))
    })
    .await
    .unwrap();

    assert!(!is_valid);
}

#[tokio::test]
async fn rfc9421_does_not_verify_as_cavage() {
    let request = Request::builder()
        .method(http::Method::POST)
        .uri("https://example.com/inbox")
        .header("Host", "example.com")
        .body(())
        .unwrap();

    let signed =
        rfc9421::easy::sign(request, BODY, "fasp-key-1", &data::ed25519_private_key()).unwrap();

    // The RFC 9421 `Signature` header is not a cavage header
    let result = http_message_signatures::cavage::easy::verify(&signed, |_key_id| {
        future::ready(Ok::<_, Infallible>(data::ED25519_PUBLIC_KEY.to_string()))
    })
    .await;

    assert!(result.is_err());
}

#[test]
fn response_round_trip() {
    let signed = rfc9421::easy::sign_response(
        StatusCode::OK,
        BODY,
        "fasp-key-1",
        &data::ed25519_private_key(),
    )
    .unwrap();

    let mut headers = http::HeaderMap::new();
    headers.insert("content-digest", signed.content_digest.parse().unwrap());
    headers.insert("signature-input", signed.signature_input.parse().unwrap());
    headers.insert("signature", signed.signature.parse().unwrap());

    let is_valid =
        rfc9421::easy::verify_response(StatusCode::OK, &headers, &ed25519_candidates()).unwrap();
    assert!(is_valid);

    // A different status has to break the signature
    let is_valid =
        rfc9421::easy::verify_response(StatusCode::CREATED, &headers, &ed25519_candidates())
            .unwrap();
    assert!(!is_valid);
}
