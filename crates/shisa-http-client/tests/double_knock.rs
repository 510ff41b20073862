use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use shisa_http_client::{Body, Client, Error, SchemeCache};
use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
    time::Duration,
};
use tower::service_fn;

mod data;

const KEY_ID: &str = "https://origin.example/actor#main-key";

/// Mock peer that records, per call, whether the request was signed with
/// RFC 9421 (`Signature-Input` present) and answers based on the scheme
fn peer(
    log: Arc<Mutex<Vec<bool>>>,
    accepts_rfc9421: bool,
    accepts_cavage: bool,
) -> impl tower::Service<
    Request<Body>,
    Response = Response<Full<Bytes>>,
    Error = Infallible,
    Future = impl Send,
> + Clone
+ Send
+ Sync
+ 'static {
    service_fn(move |req: Request<Body>| {
        let log = Arc::clone(&log);
        async move {
            let is_rfc9421 = req.headers().contains_key("signature-input");
            assert!(req.headers().contains_key("signature"));
            log.lock().unwrap().push(is_rfc9421);

            let accepted = if is_rfc9421 {
                accepts_rfc9421
            } else {
                accepts_cavage
            };
            let status = if accepted {
                StatusCode::ACCEPTED
            } else {
                StatusCode::UNAUTHORIZED
            };

            Ok::<_, Infallible>(
                Response::builder()
                    .status(status)
                    .body(Full::new(Bytes::new()))
                    .unwrap(),
            )
        }
    })
}

fn post_request(host: &str) -> Request<Bytes> {
    Request::builder()
        .method(http::Method::POST)
        .uri(format!("https://{host}/inbox"))
        .header("Content-Type", "application/activity+json")
        .body(Bytes::from_static(b"{\"type\":\"Follow\"}"))
        .unwrap()
}

#[tokio::test]
async fn rfc9421_is_tried_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = Client::builder().service(peer(Arc::clone(&log), true, false));
    let key = data::ed25519_private_key();

    let response = client
        .execute_signed(post_request("modern.example"), KEY_ID, &key)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(*log.lock().unwrap(), [true]);
}

#[tokio::test]
async fn falls_back_to_cavage_and_remembers() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = Client::builder().service(peer(Arc::clone(&log), false, true));
    let key = data::ed25519_private_key();

    let response = client
        .execute_signed(post_request("legacy.example"), KEY_ID, &key)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Second delivery goes straight to cavage, no extra knock
    let response = client
        .execute_signed(post_request("legacy.example"), KEY_ID, &key)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    assert_eq!(*log.lock().unwrap(), [true, false, false]);
}

#[tokio::test]
async fn both_schemes_rejected() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = Client::builder().service(peer(Arc::clone(&log), false, false));
    let key = data::ed25519_private_key();

    let error = client
        .execute_signed(post_request("denied.example"), KEY_ID, &key)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        Error::SchemeExhausted { host } if host == "denied.example"
    ));
    assert_eq!(*log.lock().unwrap(), [true, false]);
}

#[tokio::test]
async fn expired_cache_entry_renegotiates() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let client = Client::builder()
        .scheme_cache(Arc::new(SchemeCache::new(Duration::ZERO)))
        .service(peer(Arc::clone(&log), false, true));
    let key = data::ed25519_private_key();

    for _ in 0..2 {
        let response = client
            .execute_signed(post_request("legacy.example"), KEY_ID, &key)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    // Every entry expires immediately, so both calls knock twice
    assert_eq!(*log.lock().unwrap(), [true, false, true, false]);
}
