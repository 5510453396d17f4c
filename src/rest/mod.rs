//! REST endpoint dispatch: route matching, authentication and rate limiting.
//!
//! [`RestDispatcher`] is a concrete [`Handler`](crate::Handler) that owns a
//! table of [`Endpoint`]s and a [`CredentialStore`], and can be dropped
//! straight into [`Server::builder().handler(...)`](crate::Server::builder).

pub mod error;
mod rate_limit;

pub use error::RestError;
pub use rate_limit::RateLimit;

use crate::{
    credentials::CredentialStore, rest::rate_limit::RateLimiter, Handled, Handler, Method,
    Request, Response,
};
use std::{future::Future, pin::Pin, sync::Arc};
use tracing::instrument;

/// Bitmask of authentication methods an [`Endpoint`] accepts.
///
/// Flags combine: `KEY | SIGN` requires both an `API-Key` header and an
/// `API-Signature` header covering the request body; `KEY` alone accepts
/// the key without a signature.
pub mod auth {
    pub const NONE: u8 = 0;
    /// Bearer access token in the `Authorization` header.
    pub const TOKEN: u8 = 1 << 0;
    /// `API-Key` header, verified against the user's stored keys.
    pub const KEY: u8 = 1 << 1;
    /// `API-Signature` header, verified against the key's paired secret.
    pub const SIGN: u8 = 1 << 2;
}

type EndpointFuture<'a> = Pin<Box<dyn Future<Output = Handled> + Send + 'a>>;
type EndpointHandler = Box<
    dyn for<'a> Fn(Option<&'a str>, &'a Request, &'a mut Response) -> EndpointFuture<'a>
        + Sync
        + Send,
>;

/// A single routable endpoint: method, path, required auth and rate limit.
pub struct Endpoint {
    method: Method,
    path: &'static str,
    auth: u8,
    rate_limiter: RateLimiter,
    handler: EndpointHandler,
}

impl Endpoint {
    /// Creates a new endpoint.
    ///
    /// `handler` receives the authenticated username (`None` when `auth` is
    /// [`auth::NONE`]), the parsed request and the response to fill in. It is
    /// async so it can call back into a [`CredentialStore`] directly (e.g. a
    /// signup endpoint creating a user, or a login endpoint minting a token);
    /// capture an `Arc<CredentialStore>` in the closure for that.
    pub fn new<F, Fut>(
        method: Method,
        path: &'static str,
        auth: u8,
        rate_limit: RateLimit,
        handler: F,
    ) -> Self
    where
        F: for<'a> Fn(Option<&'a str>, &'a Request, &'a mut Response) -> Fut + Sync + Send + 'static,
        Fut: Future<Output = Handled> + Send + 'static,
    {
        Self {
            method,
            path,
            auth,
            rate_limiter: RateLimiter::new(rate_limit),
            handler: Box::new(move |username, request, response| {
                Box::pin(handler(username, request, response))
            }),
        }
    }

    #[inline]
    fn matches(&self, request: &Request) -> bool {
        self.method == request.method() && self.path.as_bytes() == request.url().path()
    }
}

/// Routes requests to [`Endpoint`]s, enforcing per-endpoint rate limits and
/// the access-token / API-key(+signature) authentication chain before
/// invoking the matched handler.
pub struct RestDispatcher {
    credentials: Arc<CredentialStore>,
    endpoints: Vec<Endpoint>,
    json_errors: bool,
}

impl RestDispatcher {
    /// Creates a dispatcher backed by `credentials`, with no endpoints registered.
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            credentials,
            endpoints: Vec::new(),
            json_errors: true,
        }
    }

    /// Registers an endpoint. Endpoints are matched in registration order.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Controls whether errors are rendered as a JSON body (the default) or
    /// as a bare status line with an empty body.
    pub fn json_errors(mut self, json_errors: bool) -> Self {
        self.json_errors = json_errors;
        self
    }

    #[instrument(skip(self, request, response), fields(method = ?request.method()), level = "debug")]
    async fn dispatch(&self, request: &Request, response: &mut Response) -> Result<Handled, RestError> {
        let endpoint = self
            .endpoints
            .iter()
            .find(|e| e.matches(request))
            .ok_or(RestError::InvalidEndpoint)?;

        if !endpoint.rate_limiter.check(request.client_addr().ip()) {
            tracing::warn!(addr = %request.client_addr(), path = endpoint.path, "rate limit exceeded");
            return Err(RestError::RateLimitExceeded);
        }

        let username = match endpoint.auth {
            auth::NONE => None,
            mask => Some(self.authenticate(mask, request).await?),
        };

        Ok((endpoint.handler)(username.as_deref(), request, response).await)
    }

    #[instrument(skip(self, request), level = "trace")]
    async fn authenticate(&self, mask: u8, request: &Request) -> Result<String, RestError> {
        if mask & auth::TOKEN != 0 {
            if let Some(token) = header_str(request, b"authorization") {
                if let Ok(username) = CredentialStore::username_of(token) {
                    if self
                        .credentials
                        .verify_access_token(username, token)
                        .await
                        .is_ok()
                    {
                        return Ok(username.to_string());
                    }
                }
            }
        }

        if mask & auth::SIGN != 0 {
            if let (Some(body), Some(key), Some(signature)) = (
                request.body(),
                header_str(request, b"api-key"),
                header_str(request, b"api-signature"),
            ) {
                if let Ok(username) = CredentialStore::username_of(key) {
                    if self
                        .credentials
                        .verify_signature(username, key, signature, body)
                        .await
                        .is_ok()
                    {
                        return Ok(username.to_string());
                    }
                }
            }
        }

        // Body-less requests (nothing to sign) or endpoints that don't
        // require SIGN fall back to a bare API-key check.
        if mask & auth::KEY != 0 && (request.body().is_none() || mask & auth::SIGN == 0) {
            if let Some(key) = header_str(request, b"api-key") {
                if let Ok(username) = CredentialStore::username_of(key) {
                    if self.credentials.verify_api_key(username, key).await.is_ok() {
                        return Ok(username.to_string());
                    }
                }
            }
        }

        tracing::debug!(addr = %request.client_addr(), "authentication failed");
        Err(RestError::InvalidAuth)
    }
}

#[inline]
fn header_str<'a>(request: &'a Request, name: &[u8]) -> Option<&'a str> {
    std::str::from_utf8(request.header(name)?).ok()
}

impl Handler<()> for RestDispatcher {
    async fn handle(&self, _: &mut (), request: &Request, response: &mut Response) -> Handled {
        match self.dispatch(request, response).await {
            Ok(handled) => handled,
            Err(err) => err.respond(response, self.json_errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{server::connection::HttpConnection, tools::str_op, StatusCode};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use std::time::Duration;

    async fn store() -> (Arc<CredentialStore>, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = CredentialStore::open(dir.path()).await.unwrap();
        (Arc::new(store), dir)
    }

    fn parsed(raw: &str) -> HttpConnection<impl Handler<()>, ()> {
        let mut conn = HttpConnection::from_req(raw);
        conn.parse().expect("well-formed test request");
        conn
    }

    fn signature(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        mac.finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    // Scenario 1: hello-world GET, no auth.
    #[tokio::test]
    async fn unauthenticated_get_reaches_handler() {
        let (credentials, _dir) = store().await;
        let dispatcher = RestDispatcher::new(credentials).endpoint(Endpoint::new(
            Method::Get,
            "/hello_world",
            auth::NONE,
            RateLimit::default(),
            |_username, _request, response| async move {
                response.status(StatusCode::Ok).body(r#"{"msg":"Hello, Daan"}"#)
            },
        ));

        let mut conn = parsed("GET /hello_world HTTP/1.1\r\nHost: localhost\r\n\r\n");
        dispatcher.handle(&mut (), &conn.request, &mut conn.response).await;

        let body = str_op(conn.response.buffer());
        assert!(body.contains("200 OK"), "{body}");
        assert!(body.contains(r#"{"msg":"Hello, Daan"}"#), "{body}");
    }

    // Scenario 2: unknown endpoint.
    #[tokio::test]
    async fn unknown_endpoint_returns_404_json_error() {
        let (credentials, _dir) = store().await;
        let dispatcher = RestDispatcher::new(credentials);

        let mut conn = parsed("GET /nope HTTP/1.1\r\nHost: localhost\r\n\r\n");
        dispatcher.handle(&mut (), &conn.request, &mut conn.response).await;

        let body = str_op(conn.response.buffer());
        assert!(body.contains("404"), "{body}");
        assert!(body.contains(r#"{"error":"Invalid endpoint."}"#), "{body}");
    }

    // Scenario 3: rate limit, max=2 within the window.
    #[tokio::test]
    async fn rate_limit_rejects_the_third_request() {
        let (credentials, _dir) = store().await;
        let dispatcher = RestDispatcher::new(credentials).endpoint(Endpoint::new(
            Method::Get,
            "/limited",
            auth::NONE,
            RateLimit::new(2, Duration::from_secs(60)),
            |_username, _request, response| async move { response.status(StatusCode::Ok).body("") },
        ));

        for expect_ok in [true, true, false] {
            let mut conn = parsed("GET /limited HTTP/1.1\r\nHost: localhost\r\n\r\n");
            dispatcher.handle(&mut (), &conn.request, &mut conn.response).await;

            let body = str_op(conn.response.buffer());
            if expect_ok {
                assert!(body.contains("200 OK"), "{body}");
            } else {
                assert!(body.contains("429"), "{body}");
                assert!(body.contains(r#"{"error":"Rate limit exceeded."}"#), "{body}");
            }
        }
    }

    // Scenario 4: API key + signature success.
    #[tokio::test]
    async fn key_and_signature_authenticate_the_caller() {
        let (credentials, _dir) = store().await;
        credentials
            .create_user("alice", "pw", serde_json::json!({}))
            .await
            .unwrap();
        let (key, secret) = credentials.create_api_key("alice").await.unwrap();

        let dispatcher = RestDispatcher::new(credentials.clone()).endpoint(Endpoint::new(
            Method::Post,
            "/signed",
            auth::KEY | auth::SIGN,
            RateLimit::default(),
            |username, _request, response| {
                let username = username.unwrap_or("none").to_string();
                async move { response.status(StatusCode::Ok).body(format!(r#"{{"username":"{username}"}}"#)) }
            },
        ));

        let payload = b"payload";
        let sig = signature(&secret, payload);
        let raw = format!(
            "POST /signed HTTP/1.1\r\nHost: localhost\r\nAPI-Key: {key}\r\nAPI-Signature: {sig}\r\nContent-Length: {}\r\n\r\n{}",
            payload.len(),
            std::str::from_utf8(payload).unwrap(),
        );

        let mut conn = parsed(&raw);
        dispatcher.handle(&mut (), &conn.request, &mut conn.response).await;

        let body = str_op(conn.response.buffer());
        assert!(body.contains("200 OK"), "{body}");
        assert!(body.contains(r#"{"username":"alice"}"#), "{body}");
    }

    // A SIGN-required endpoint still authenticates a body-less request by
    // key alone (gate 3: "KEY, for body-less requests or when SIGN isn't
    // required").
    #[tokio::test]
    async fn body_less_request_falls_back_to_key_only() {
        let (credentials, _dir) = store().await;
        credentials
            .create_user("alice", "pw", serde_json::json!({}))
            .await
            .unwrap();
        let (key, _secret) = credentials.create_api_key("alice").await.unwrap();

        let dispatcher = RestDispatcher::new(credentials).endpoint(Endpoint::new(
            Method::Get,
            "/whoami",
            auth::KEY | auth::SIGN,
            RateLimit::default(),
            |username, _request, response| {
                let username = username.unwrap_or("none").to_string();
                async move { response.status(StatusCode::Ok).body(username) }
            },
        ));

        let raw = format!("GET /whoami HTTP/1.1\r\nHost: localhost\r\nAPI-Key: {key}\r\n\r\n");

        let mut conn = parsed(&raw);
        dispatcher.handle(&mut (), &conn.request, &mut conn.response).await;

        let body = str_op(conn.response.buffer());
        assert!(body.contains("200 OK"), "{body}");
        assert!(body.contains("alice"), "{body}");
    }

    // Invalid/missing credentials never fall through to a handler.
    #[tokio::test]
    async fn unauthenticated_token_request_is_rejected() {
        let (credentials, _dir) = store().await;
        let dispatcher = RestDispatcher::new(credentials).endpoint(Endpoint::new(
            Method::Get,
            "/me",
            auth::TOKEN,
            RateLimit::default(),
            |_username, _request, response| async move { response.status(StatusCode::Ok).body("") },
        ));

        let mut conn = parsed("GET /me HTTP/1.1\r\nHost: localhost\r\nAuthorization: bogus+token\r\n\r\n");
        dispatcher.handle(&mut (), &conn.request, &mut conn.response).await;

        let body = str_op(conn.response.buffer());
        assert!(body.contains("401"), "{body}");
        assert!(body.contains(r#"{"error":"Unauthorized."}"#), "{body}");
    }
}
