//!
//! Remote actor key fetching
//!
//! An ActivityPub `keyId` is the URL of the actor's key document. The key
//! lives either at the top level or nested under `publicKey`, depending on
//! the implementation on the other side.
//!

use crate::Error;
use http::{Request, header::ACCEPT};
use serde::Deserialize;
use shisa_http_client::{Body, Client};
use tracing::{debug, instrument};

#[derive(Deserialize)]
struct PublicKeyObject {
    #[serde(rename = "publicKeyPem")]
    public_key_pem: String,
}

#[derive(Deserialize)]
struct KeyDocument {
    #[serde(rename = "publicKeyPem")]
    public_key_pem: Option<String>,

    #[serde(rename = "publicKey")]
    public_key: Option<PublicKeyObject>,
}

/// Fetch the PEM-encoded public key the key ID points at
///
/// The fragment is stripped before dereferencing, `https://example.com/actor#main-key`
/// fetches `https://example.com/actor`.
#[instrument(skip(client))]
pub async fn fetch(client: &Client, key_id: &str) -> Result<String, Error> {
    let url = key_id.split_once('#').map_or(key_id, |(base, _fragment)| base);

    let request = Request::builder()
        .uri(url)
        .header(ACCEPT, "application/activity+json")
        .body(Body::empty())
        .map_err(|_| Error::KeyFetchFailed)?;

    let response = client.execute(request).await.map_err(|error| {
        debug!(?error, "key document request failed");
        Error::KeyFetchFailed
    })?;

    if !response.status().is_success() {
        debug!(status = %response.status(), "key document request denied");
        return Err(Error::KeyFetchFailed);
    }

    let document: KeyDocument = response.json().await.map_err(|error| {
        debug!(?error, "key document failed to deserialise");
        Error::KeyFetchFailed
    })?;

    document
        .public_key_pem
        .or_else(|| document.public_key.map(|key| key.public_key_pem))
        .ok_or(Error::KeyFetchFailed)
}
