//! Network side of authentication.
//!
//! `AuthGateway` is the seam between the session controller and HTTP:
//! - `verify` exchanges a token for the profile it belongs to
//! - `send` forwards an arbitrary request, attaching the token only when one
//!   is supplied
//!
//! `HttpAuthGateway` is the reqwest implementation. Single attempt per call,
//! bounded by the client timeout, no retries.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use std::time::Duration;

use super::codec::AuthToken;
use super::error::AuthError;
use super::types::UserProfile;

/// Identity endpoint ("who am I") on the gateway.
pub const ME_PATH: &str = "/api/auth/me";

/// Gateway liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

// ── Requests ─────────────────────────────────────────────────────

/// Outgoing request relative to the gateway base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path beginning with `/`, e.g. `/api/transport/transports/3`.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

// ── Gateway trait ────────────────────────────────────────────────

#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Ask the gateway who `token` belongs to.
    ///
    /// Only a success status with a well-formed profile counts. Any other
    /// status is `AuthError::Authentication`; transport failure is
    /// `AuthError::Network`. No partial profile is ever returned.
    async fn verify(&self, token: &AuthToken) -> Result<UserProfile, AuthError>;

    /// Send `request`, adding `Authorization: Basic <token>` when `token` is
    /// `Some`. With `None` the request goes out without credentials and the
    /// server decides whether that is acceptable.
    async fn send(
        &self,
        token: Option<&AuthToken>,
        request: ApiRequest,
    ) -> Result<reqwest::Response, AuthError>;
}

// ── HTTP implementation ──────────────────────────────────────────

/// reqwest-backed gateway client.
pub struct HttpAuthGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpAuthGateway {
    /// Create a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a gateway-relative path.
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Check if the gateway answers its health endpoint.
    pub async fn health(&self) -> bool {
        matches!(
            self.http.get(self.url(HEALTH_PATH)).send().await,
            Ok(resp) if resp.status().is_success()
        )
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn verify(&self, token: &AuthToken) -> Result<UserProfile, AuthError> {
        let resp = self
            .http
            .get(self.url(ME_PATH))
            .header(AUTHORIZATION, token.authorization_header())
            .send()
            .await
            .map_err(AuthError::Network)?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(%status, "Identity check refused");
            return Err(AuthError::Authentication { status });
        }

        resp.json::<UserProfile>().await.map_err(|e| {
            if e.is_decode() {
                tracing::warn!(error = %e, "Identity check returned a malformed profile");
                AuthError::Authentication { status }
            } else {
                AuthError::Network(e)
            }
        })
    }

    async fn send(
        &self,
        token: Option<&AuthToken>,
        request: ApiRequest,
    ) -> Result<reqwest::Response, AuthError> {
        let ApiRequest {
            method,
            path,
            query,
            body,
        } = request;

        let mut builder = self.http.request(method, self.url(&path));
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, token.authorization_header());
        }

        builder.send().await.map_err(AuthError::Network)
    }
}

// ── Tests ────────────────────────────────────────────────────────
