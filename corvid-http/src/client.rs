//! [`Client`]: the REST dispatch engine (spec.md §4.3 "RestEngine").
//!
//! Composes route-key derivation → bucket gate → circuit gate → connection
//! acquire → send → parse headers → refresh bucket → classify → retry, the
//! way `twilight_http::Client::request` does, but generalized to the
//! priority/circuit-breaker/connection-pool policy this client layers on
//! top of Discord's plain rate-limit headers.

use crate::{
    compression,
    error::{Error, ErrorContext, ErrorKind},
    middleware::{Middleware, MiddlewareStack},
    pool::{ConnectionPool, PoolConfig},
    request::Request,
    response::Response,
};
use bytes::Bytes;
use corvid_ratelimiting::{
    CircuitBreaker, HeaderParsingError, InMemoryRatelimiter, RatelimitHeaders, RouteKey,
};
use http::{
    header::{HeaderName, HeaderValue, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    Method, StatusCode, Uri,
};
use http_body_util::{BodyExt, Full};
use hyper_util::{client::legacy::Client as LegacyClient, rt::TokioExecutor};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};
use tracing::{debug, warn};

#[cfg(feature = "rustls-native-roots")]
type Connector = hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
#[cfg(not(feature = "rustls-native-roots"))]
type Connector = hyper_util::client::legacy::connect::HttpConnector;

type Transport = LegacyClient<Connector, Full<Bytes>>;

const AUDIT_LOG_REASON: &str = "x-audit-log-reason";
const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";

/// Authentication scheme used for the `Authorization` header.
#[derive(Clone, Debug)]
pub enum Auth {
    Bot(String),
    Bearer(String),
}

impl Auth {
    fn header_value(&self) -> String {
        match self {
            Self::Bot(token) => format!("Bot {token}"),
            Self::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

/// The REST dispatch engine: one per bot process, shared across tasks.
pub struct Client {
    base_url: String,
    auth: Auth,
    user_agent: String,
    transport: Transport,
    ratelimiter: InMemoryRatelimiter,
    circuits: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    pool: ConnectionPool,
    middleware: MiddlewareStack,
}

impl Client {
    #[must_use]
    pub fn new(auth: Auth) -> Self {
        Self::with_base_url(auth, DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(auth: Auth, base_url: impl Into<String>) -> Self {
        #[cfg(feature = "rustls-native-roots")]
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .expect("native TLS roots available")
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        #[cfg(not(feature = "rustls-native-roots"))]
        let connector = hyper_util::client::legacy::connect::HttpConnector::new();

        let transport = LegacyClient::builder(TokioExecutor::new()).build(connector);

        Self {
            base_url: base_url.into(),
            auth,
            user_agent: format!(
                "DiscordBot ({}, {})",
                "https://corvid.rs",
                env!("CARGO_PKG_VERSION")
            ),
            transport,
            ratelimiter: InMemoryRatelimiter::default(),
            circuits: Mutex::new(HashMap::new()),
            pool: ConnectionPool::new(PoolConfig::default()),
            middleware: MiddlewareStack::default(),
        }
    }

    /// Register a [`Middleware`] to run on every request dispatched through
    /// this client, in ascending `order()` (spec.md §3/§4.3 step 6 "per-request
    /// middleware overlay").
    #[must_use]
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Convenience verb constructors (spec.md §4.3 "typed verbs").
    #[must_use]
    pub fn get(&self, path: impl Into<String>) -> Request {
        Request::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(&self, path: impl Into<String>) -> Request {
        Request::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(&self, path: impl Into<String>) -> Request {
        Request::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(&self, path: impl Into<String>) -> Request {
        Request::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(&self, path: impl Into<String>) -> Request {
        Request::new(Method::DELETE, path)
    }

    /// Run `request` to completion, retrying per its [`crate::request::RetryPolicy`]
    /// (spec.md §4.3 steps 1-10).
    ///
    /// # Errors
    ///
    /// Returns the final [`Error`] once retries are exhausted or a
    /// non-retryable classification is reached.
    pub async fn execute(&self, mut request: Request) -> Result<Response, Error> {
        self.middleware.apply_all(&mut request);

        let host_port = self.host_port();
        let mut route_key = RouteKey::new(request.method.clone(), &request.path);

        loop {
            if request.is_cancelled() {
                return Err(Error::new(ErrorKind::Cancelled, "request cancelled before send"));
            }

            let attempt = request.attempt();

            if !self.circuit_for(&host_port).can_execute() {
                return Err(Error::new(ErrorKind::CircuitOpen, "host circuit breaker is open")
                    .with_context(ErrorContext {
                        route: Some(route_key.to_string()),
                        attempt,
                        retry_after: None,
                    }));
            }

            let ticket = self
                .ratelimiter
                .ticket(route_key.clone(), request.priority)
                .await
                .map_err(|e| Error::new(ErrorKind::RateLimit, "failed to queue ticket").with_source(e))?;

            let sender = match ticket.await {
                Ok(sender) => sender,
                Err(_) => {
                    return Err(Error::new(ErrorKind::Cancelled, "ticket cancelled before grant"));
                }
            };

            if request.is_cancelled() {
                let _ = sender.headers(None);
                return Err(Error::new(ErrorKind::Cancelled, "request cancelled while queued"));
            }

            let Some(_lease) = self.pool.acquire(&host_port, request.priority) else {
                let _ = sender.headers(None);
                return Err(Error::new(ErrorKind::PoolExhausted, "connection pool exhausted"));
            };

            let started = Instant::now();
            let outcome = self.send_once(&request).await;

            match outcome {
                Ok((response, headers)) => {
                    let _ = sender.headers(headers.clone());
                    if let Some(headers) = &headers {
                        self.ratelimiter.apply_headers(&route_key, headers);
                    }

                    match self.classify(&response, &route_key, attempt, &request, started).await {
                        Classification::Done(result) => {
                            let breaker = self.circuit_for(&host_port);
                            if response.is_success() || response.status.is_client_error() {
                                breaker.record_success();
                            } else {
                                breaker.record_failure();
                            }
                            return result;
                        }
                        Classification::RetryAfter(delay) => {
                            // A 429 re-queue doesn't count against the
                            // caller's retry budget (spec.md §4.3 step 9).
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        Classification::Retry => {
                            self.circuit_for(&host_port).record_failure();
                            if attempt + 1 >= request.retry.max_attempts {
                                return Err(Error::new(ErrorKind::Network, "retries exhausted")
                                    .with_status(response.status));
                            }
                            request.advance_attempt();
                            tokio::time::sleep(request.retry.delay_for(attempt)).await;
                            continue;
                        }
                        Classification::Redirect(location) => {
                            if !request.follow_redirects
                                || request.redirects_followed() >= request.max_redirects
                            {
                                return Err(Error::new(ErrorKind::Redirect, "redirect not followed")
                                    .with_status(response.status)
                                    .with_context(ErrorContext {
                                        route: Some(route_key.to_string()),
                                        attempt,
                                        retry_after: None,
                                    }));
                            }

                            let Some(path) = redirect_path(&self.base_url, &location) else {
                                return Err(Error::new(
                                    ErrorKind::Redirect,
                                    "redirect target is outside the configured base URL",
                                )
                                .with_status(response.status));
                            };

                            request.advance_redirect();
                            request.path = path;
                            route_key = RouteKey::new(request.method.clone(), &request.path);
                            continue;
                        }
                    }
                }
                Err(err) => {
                    let _ = sender.headers(None);
                    self.circuit_for(&host_port).record_failure();

                    if err.is_retryable() && attempt + 1 < request.retry.max_attempts {
                        request.advance_attempt();
                        tokio::time::sleep(request.retry.delay_for(attempt)).await;
                        continue;
                    }

                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        request: &Request,
    ) -> Result<(Response, Option<RatelimitHeaders>), Error> {
        let uri: Uri = format!("{}{}", self.base_url, request.path_and_query())
            .parse()
            .map_err(|e| Error::new(ErrorKind::Validation, "invalid request path").with_source(e))?;

        let body = request.body.clone().unwrap_or_default();
        let mut builder = http::Request::builder().method(request.method.clone()).uri(uri);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = builder
            .header(AUTHORIZATION, self.auth.header_value())
            .header(USER_AGENT, &self.user_agent)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT_ENCODING, "gzip, deflate");

        if let Some(reason) = &request.audit_log_reason {
            let encoded = percent_encoding::utf8_percent_encode(
                reason,
                percent_encoding::NON_ALPHANUMERIC,
            )
            .to_string();

            if encoded.len() <= 512 {
                builder = builder.header(
                    HeaderName::from_static(AUDIT_LOG_REASON),
                    HeaderValue::from_str(&encoded)
                        .map_err(|e| Error::new(ErrorKind::Validation, "invalid audit log reason").with_source(e))?,
                );
            } else {
                return Err(Error::new(ErrorKind::Validation, "audit log reason exceeds 512 characters"));
            }
        }

        let http_request = builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| Error::new(ErrorKind::Validation, "failed to build request").with_source(e))?;

        let started = Instant::now();

        let response = tokio::time::timeout(request.timeouts.total, self.transport.request(http_request))
            .await
            .map_err(|_| Error::new(ErrorKind::Timeout, "request exceeded total timeout"))?
            .map_err(|e| Error::new(ErrorKind::Network, "transport error").with_source(e))?;

        let status = response.status();
        let header_map = response.headers().clone();

        let ratelimit_headers = RatelimitHeaders::from_headers(&header_map).ok();

        let collected = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::new(ErrorKind::Network, "failed reading response body").with_source(e))?
            .to_bytes()
            .to_vec();

        let encoding = header_map
            .get(http::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok());
        let body = compression::decode(encoding, collected)?;

        Ok((
            Response {
                status,
                headers: header_map,
                body,
                duration: started.elapsed(),
                from_cache: false,
            },
            ratelimit_headers,
        ))
    }

    async fn classify(
        &self,
        response: &Response,
        route_key: &RouteKey,
        attempt: u32,
        request: &Request,
        started: Instant,
    ) -> Classification {
        let _ = started;

        match response.status {
            status if status.is_success() => Classification::Done(Ok(Response {
                status: response.status,
                headers: response.headers.clone(),
                body: response.body.clone(),
                duration: response.duration,
                from_cache: false,
            })),
            StatusCode::TOO_MANY_REQUESTS => {
                let headers = RatelimitHeaders::from_headers(&response.headers).ok();
                let retry_after = headers.as_ref().and_then(|h| h.retry_after).unwrap_or(1.0);

                warn!(route = %route_key, retry_after, "rate limited, re-queueing");

                Classification::RetryAfter(std::time::Duration::from_secs_f64(retry_after.max(0.0)))
            }
            StatusCode::UNAUTHORIZED => Classification::Done(Err(
                Error::new(ErrorKind::Auth, "invalid or missing credentials").with_status(response.status)
            )),
            status if status.is_client_error() => {
                Classification::Done(Err(Error::new(ErrorKind::Validation, "request rejected")
                    .with_status(status)
                    .with_context(ErrorContext {
                        route: Some(route_key.to_string()),
                        attempt,
                        retry_after: None,
                    })))
            }
            status if status.is_server_error() => Classification::Retry,
            status if status.is_redirection() => match response.header("location") {
                Some(location) => Classification::Redirect(location.to_owned()),
                None => Classification::Done(Err(Error::new(
                    ErrorKind::Redirect,
                    "redirect response missing a Location header",
                )
                .with_status(status))),
            },
            status => {
                debug!(%status, "unclassified status, treating as non-retryable");
                Classification::Done(Err(Error::new(ErrorKind::Network, "unexpected status")
                    .with_status(status)))
            }
        }
    }

    fn circuit_for(&self, host_port: &str) -> Arc<CircuitBreaker> {
        let mut circuits = self.circuits.lock().expect("circuits poisoned");
        Arc::clone(
            circuits
                .entry(host_port.to_owned())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(5, 3, std::time::Duration::from_secs(30)))),
        )
    }

    fn host_port(&self) -> String {
        self.base_url
            .parse::<Uri>()
            .ok()
            .and_then(|uri| uri.authority().map(ToString::to_string))
            .unwrap_or_else(|| "discord.com:443".to_owned())
    }
}

/// Resolve a `Location` header into a path this client can re-request,
/// rejecting anything that points outside `base_url` (spec.md §4.3 step 9).
fn redirect_path(base_url: &str, location: &str) -> Option<String> {
    if let Some(path) = location.strip_prefix(base_url) {
        return Some(path.to_owned());
    }

    if location.starts_with('/') {
        return Some(location.to_owned());
    }

    None
}

enum Classification {
    Done(Result<Response, Error>),
    RetryAfter(std::time::Duration),
    Retry,
    Redirect(String),
}

#[cfg(test)]
mod client_tests {
    use super::{Auth, Classification, CircuitBreaker, Client, HeaderParsingError};
    use crate::{request::Request, response::Response};
    use corvid_ratelimiting::RouteKey;
    use http::{HeaderMap, Method, StatusCode};
    use std::time::{Duration, Instant};

    #[test]
    fn header_parsing_error_is_send_sync() {
        static_assertions::assert_impl_all!(HeaderParsingError: Send, Sync);
    }

    #[test]
    fn client_and_circuit_breaker_are_send_sync() {
        static_assertions::assert_impl_all!(Client: Send, Sync);
        static_assertions::assert_impl_all!(CircuitBreaker: Send, Sync);
    }

    fn response_with_status(status: StatusCode) -> Response {
        Response {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
            duration: Duration::ZERO,
            from_cache: false,
        }
    }

    #[tokio::test]
    async fn too_many_requests_classifies_as_retry_after_not_retry() {
        let client = Client::new(Auth::Bot("test-token".to_owned()));
        let route_key = RouteKey::new(Method::GET, "/users/@me");
        let request = Request::new(Method::GET, "/users/@me");
        let response = response_with_status(StatusCode::TOO_MANY_REQUESTS);

        let classification = client
            .classify(&response, &route_key, request.attempt(), &request, Instant::now())
            .await;

        // A 429 must re-queue via `RetryAfter`, never the `Retry` path that
        // `execute` counts against the retry budget (spec.md §4.3 step 9).
        assert!(matches!(classification, Classification::RetryAfter(_)));
    }

    #[test]
    fn attempt_is_unchanged_until_advance_attempt_is_called() {
        let request = Request::new(Method::GET, "/users/@me");
        assert_eq!(request.attempt(), 0);
        assert_eq!(request.attempt(), 0);

        request.advance_attempt();
        assert_eq!(request.attempt(), 1);
    }

    #[tokio::test]
    async fn redirect_with_location_header_classifies_as_redirect() {
        let client = Client::new(Auth::Bot("test-token".to_owned()));
        let route_key = RouteKey::new(Method::GET, "/users/@me");
        let request = Request::new(Method::GET, "/users/@me");

        let mut response = response_with_status(StatusCode::FOUND);
        response.headers.insert(
            "location",
            http::HeaderValue::from_static("https://discord.com/api/v10/users/12345"),
        );

        let classification = client
            .classify(&response, &route_key, request.attempt(), &request, Instant::now())
            .await;

        match classification {
            Classification::Redirect(location) => {
                assert_eq!(location, "https://discord.com/api/v10/users/12345");
            }
            _ => panic!("expected a Redirect classification"),
        }
    }

    #[test]
    fn redirect_path_rejects_locations_outside_base_url() {
        assert_eq!(
            super::redirect_path("https://discord.com/api/v10", "https://discord.com/api/v10/users/12345"),
            Some("/users/12345".to_owned())
        );
        assert_eq!(
            super::redirect_path("https://discord.com/api/v10", "/users/12345"),
            Some("/users/12345".to_owned())
        );
        assert_eq!(
            super::redirect_path("https://discord.com/api/v10", "https://evil.example/steal"),
            None
        );
    }
}
