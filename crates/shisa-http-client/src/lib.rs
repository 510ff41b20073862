//!
//! An opinionated HTTP client for federation traffic
//!
//! Wraps a hyper/tower stack (decompression, redirect-following, timeouts,
//! response size limits) and implements the outbound half of federation
//! authentication: every request is signed, and which of the two signature
//! schemes a remote host accepts is negotiated by "double knocking" and
//! remembered per host in a [`SchemeCache`].
//!

use bytes::Bytes;
use http::{
    HeaderMap, HeaderValue, StatusCode, Uri,
    header::{HOST, HeaderName, USER_AGENT},
    request::Parts,
};
use http_body::Body as HttpBody;
use http_body_util::{BodyExt, Limited};
use http_message_signatures::{cavage, crypto::parse::SigningKey, rfc9421};
use hyper::{Request, Response as HyperResponse};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::{client::legacy::Client as HyperClient, rt::TokioExecutor};
use serde::de::DeserializeOwned;
use std::{error::Error as StdError, sync::Arc, time::Duration};
use thiserror::Error;
use tower::{
    BoxError, Layer, Service, ServiceBuilder, ServiceExt, timeout::TimeoutLayer,
    util::BoxCloneSyncService,
};
use tower_http::{
    decompression::DecompressionLayer, follow_redirect::FollowRedirectLayer,
    map_response_body::MapResponseBodyLayer,
};
use tracing::{debug, instrument};

mod body;
mod scheme_cache;

pub use self::body::Body;
pub use self::scheme_cache::{SchemeCache, SignatureScheme};

type BoxBody<E = BoxError> = http_body_util::combinators::BoxBody<Bytes, E>;
type Result<T, E = Error> = std::result::Result<T, E>;

/// Default body limit of 1MB
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Default request timeout of 30s
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body type
pub type ResponseBody = BoxBody;

/// Client error type
#[derive(Debug, Error)]
pub enum Error {
    /// Building the HTTP request failed
    #[error(transparent)]
    Http(#[from] http::Error),

    /// Request URI misses a host component
    #[error("Missing host")]
    MissingHost,

    /// The request failed in the underlying transport
    #[error(transparent)]
    Request(BoxError),

    /// The remote host rejected both signature schemes
    #[error("{host} rejected both signature schemes")]
    SchemeExhausted {
        /// Host that turned us down twice
        host: String,
    },

    /// Signing the request failed
    #[error(transparent)]
    Sign(BoxError),
}

fn is_scheme_rejection(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Builder for the HTTP client
pub struct ClientBuilder {
    content_length_limit: Option<usize>,
    default_headers: HeaderMap,
    scheme_cache: Option<Arc<SchemeCache>>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Set the content length limit
    ///
    /// This is enforced at the body level, regardless of whether the `Content-Type` header is set or not.
    ///
    /// Defaults to 1MB
    #[must_use]
    pub fn content_length_limit(self, content_length_limit: Option<usize>) -> Self {
        Self {
            content_length_limit,
            ..self
        }
    }

    /// Set a default header
    ///
    /// These headers are added to every HTTP request that is sent via this client
    ///
    /// # Errors
    ///
    /// - The header name failed to convert
    /// - The header value failed to convert
    pub fn default_header<K, V>(mut self, key: K, value: V) -> Result<Self>
    where
        K: TryInto<HeaderName>,
        K::Error: Into<BoxError>,
        V: TryInto<HeaderValue>,
        V::Error: Into<BoxError>,
    {
        self.default_headers.insert(
            key.try_into().map_err(|err| Error::Request(err.into()))?,
            value.try_into().map_err(|err| Error::Request(err.into()))?,
        );

        Ok(self)
    }

    /// Inject the scheme cache shared with other clients
    ///
    /// Defaults to a fresh in-process cache with a one hour TTL. Tests inject
    /// a zero-TTL cache to disable negotiation memory.
    #[must_use]
    pub fn scheme_cache(mut self, cache: Arc<SchemeCache>) -> Self {
        self.scheme_cache = Some(cache);
        self
    }

    /// Set the User-Agent header
    ///
    /// Defaults to `shisa/<version>`
    ///
    /// # Errors
    ///
    /// - The header value failed to convert
    pub fn user_agent<V>(self, value: V) -> Result<Self>
    where
        V: TryInto<HeaderValue>,
        V::Error: Into<BoxError>,
    {
        self.default_header(USER_AGENT, value)
    }

    /// Set a timeout
    ///
    /// By default there is no timeout
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    /// Build the HTTP client
    ///
    /// Yes, this operation is infallible
    #[must_use]
    pub fn build(self) -> Client {
        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .expect("Failed to fetch native certificates")
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client = HyperClient::builder(TokioExecutor::new())
            .build(connector)
            .map_response(|resp| {
                let (parts, body) = resp.into_parts();
                let body = body.map_err(BoxError::from).boxed();
                HyperResponse::from_parts(parts, body)
            });

        self.service(client)
    }

    /// Build the HTTP client by wrapping another HTTP client service
    #[must_use]
    pub fn service<S, B>(self, client: S) -> Client
    where
        S: Service<Request<Body>, Response = HyperResponse<B>> + Clone + Send + Sync + 'static,
        S::Error: StdError + Send + Sync + 'static,
        S::Future: Send,
        B: HttpBody<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError> + Send + Sync,
    {
        // Box the body and the error into one concrete shape before the
        // optional stages, which keeps each stage's service type nameable.
        let mut inner = BoxCloneSyncService::new(
            ServiceBuilder::new()
                .layer(MapResponseBodyLayer::new(BoxBody::new))
                .layer(FollowRedirectLayer::new())
                .layer(DecompressionLayer::default())
                .service(client)
                .map_err(BoxError::from),
        );

        if let Some(duration) = self.timeout {
            inner = BoxCloneSyncService::new(TimeoutLayer::new(duration).layer(inner));
        }

        if let Some(limit) = self.content_length_limit {
            inner = BoxCloneSyncService::new(
                MapResponseBodyLayer::new(move |body| BoxBody::new(Limited::new(body, limit)))
                    .layer(inner),
            );
        }

        Client {
            default_headers: self.default_headers,
            inner,
            scheme_cache: self
                .scheme_cache
                .unwrap_or_else(|| Arc::new(SchemeCache::default())),
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        let builder = ClientBuilder {
            content_length_limit: Some(DEFAULT_BODY_LIMIT),
            default_headers: HeaderMap::default(),
            scheme_cache: None,
            timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        };

        builder
            .user_agent(shisa_core::consts::USER_AGENT)
            .unwrap()
    }
}

/// An opinionated HTTP client
#[derive(Clone)]
pub struct Client {
    default_headers: HeaderMap,
    inner: BoxCloneSyncService<Request<Body>, HyperResponse<BoxBody>, BoxError>,
    scheme_cache: Arc<SchemeCache>,
}

impl Client {
    /// Build a new client
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    fn prepare_request(&self, mut req: Request<Body>) -> Request<Body> {
        req.headers_mut().extend(self.default_headers.clone());
        req
    }

    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// - The inner client service isn't ready
    /// - The request failed
    pub async fn execute(&self, req: Request<Body>) -> Result<Response> {
        let req = self.prepare_request(req);

        let ready_svc = self.inner.clone();
        let response = ready_svc.oneshot(req).await.map_err(Error::Request)?;

        Ok(Response { inner: response })
    }

    /// Sign an HTTP request and execute it, negotiating the signature scheme with the remote host
    ///
    /// The first contact with a host is signed with RFC 9421; a 401/403
    /// answer triggers exactly one retry signed with the legacy cavage scheme
    /// ("double knocking"). Whichever scheme got through is remembered for
    /// the host until its cache entry expires, so a well-behaved peer costs
    /// one request per call after the first negotiation. A host rejecting
    /// both schemes yields [`Error::SchemeExhausted`].
    ///
    /// The appropriate digest header for the scheme in play is computed over
    /// the exact body bytes as part of signing.
    ///
    /// # Errors
    ///
    /// - The request URI has no host component
    /// - Signing failed
    /// - The transport failed
    /// - Both schemes were rejected
    #[instrument(skip_all, fields(uri = %req.uri()))]
    pub async fn execute_signed(
        &self,
        req: Request<Bytes>,
        key_id: &str,
        key: &SigningKey,
    ) -> Result<Response> {
        let (parts, body) = req.into_parts();
        let host = parts.uri.host().ok_or(Error::MissingHost)?.to_string();

        let scheme = self
            .scheme_cache
            .get(&host)
            .unwrap_or(SignatureScheme::Rfc9421);

        let response = self.execute_with_scheme(&parts, &body, scheme, key_id, key).await?;
        if !is_scheme_rejection(response.status()) {
            self.scheme_cache.set(&host, scheme);
            return Ok(response);
        }

        debug!(%host, ?scheme, "scheme rejected, knocking with the other one");
        self.scheme_cache.evict(&host);

        let fallback = scheme.other();
        let response = self
            .execute_with_scheme(&parts, &body, fallback, key_id, key)
            .await?;
        if is_scheme_rejection(response.status()) {
            return Err(Error::SchemeExhausted { host });
        }

        self.scheme_cache.set(&host, fallback);
        Ok(response)
    }

    async fn execute_with_scheme(
        &self,
        parts: &Parts,
        body: &Bytes,
        scheme: SignatureScheme,
        key_id: &str,
        key: &SigningKey,
    ) -> Result<Response> {
        let mut req = Request::builder()
            .method(parts.method.clone())
            .uri(parts.uri.clone())
            .body(Body::data(body.clone()))?;
        *req.headers_mut() = parts.headers.clone();

        // The cavage signing string covers the `Host` header, which otherwise
        // only materialises at the transport layer
        if scheme == SignatureScheme::Cavage && !req.headers().contains_key(HOST) {
            let authority = parts.uri.authority().ok_or(Error::MissingHost)?;
            let host_value = HeaderValue::from_str(authority.as_str())
                .map_err(|err| Error::Sign(err.into()))?;
            req.headers_mut().insert(HOST, host_value);
        }

        let signed = match scheme {
            SignatureScheme::Rfc9421 => rfc9421::easy::sign(req, body, key_id, key)
                .map_err(|err| Error::Sign(err.into()))?,
            SignatureScheme::Cavage => cavage::easy::sign(req, body, key_id, key)
                .map_err(|err| Error::Sign(err.into()))?,
        };

        self.execute(signed).await
    }

    /// Shorthand for creating a GET request
    ///
    /// # Errors
    ///
    /// - Creating the request with the provided URL failed
    /// - Request execution failed
    pub async fn get<U>(&self, uri: U) -> Result<Response>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        let req = Request::builder().uri(uri).body(Body::empty())?;

        self.execute(req).await
    }
}

impl Default for Client {
    fn default() -> Self {
        ClientBuilder::default().build()
    }
}

/// HTTP response
#[derive(Debug)]
pub struct Response {
    inner: HyperResponse<BoxBody>,
}

impl Response {
    /// Convert the response into its inner `hyper` representation
    #[must_use]
    pub fn into_inner(self) -> HyperResponse<BoxBody> {
        self.inner
    }

    /// Read the body into a `Bytes`
    ///
    /// # Errors
    ///
    /// Reading the body from the remote failed
    pub async fn bytes(self) -> Result<Bytes> {
        Ok(self
            .inner
            .collect()
            .await
            .map_err(Error::Request)?
            .to_bytes())
    }

    /// Get a reference to the headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Status code of the response
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Read the body and attempt to interpret it as a UTF-8 encoded string
    ///
    /// # Errors
    ///
    /// - Reading the body from the remote failed
    /// - The body isn't a UTF-8 encoded string
    pub async fn text(self) -> Result<String> {
        let body = self.bytes().await?;
        simdutf8::basic::from_utf8(&body)
            .map(ToOwned::to_owned)
            .map_err(|err| Error::Request(err.into()))
    }

    /// Read the body and deserialise it as JSON into a `serde` enabled structure
    ///
    /// # Errors
    ///
    /// - Reading the body from the remote failed
    /// - Deserialising the body into the structure failed
    pub async fn json<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let bytes = self.bytes().await?;
        sonic_rs::from_slice(&bytes).map_err(|err| Error::Request(err.into()))
    }
}
