//! Credentialed API client
//!
//! One client per upstream integration. Client-credential integrations get
//! an OAuth2 bearer token that is cached and refreshed ahead of expiry; key
//! integrations send their key as a header (or query parameter) on every call.
//!
//! Token refresh is single-flight: the cache lock is held across the token
//! request, so concurrent callers on an expired token wait for one fetch.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Timeout for data requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for token requests
pub const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Tokens are treated as expired this long before the server says so
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 1799;

/// Upper bound applied to a server-reported `expires_in`
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

const MAX_ERROR_BODY: usize = 2000;

/// How an integration authenticates
#[derive(Clone)]
pub enum Credentials {
    /// OAuth2 client-credentials grant, token sent as `Authorization: Bearer`
    ClientCredentials {
        /// Token endpoint, absolute or relative to the base URL
        token_url: String,
        /// Client id
        client_id: String,
        /// Client secret
        client_secret: SecretString,
    },
    /// Static API key sent in a header
    ApiKey {
        /// Header name
        header: String,
        /// Key value
        key: SecretString,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCredentials {
                token_url,
                client_id,
                ..
            } => f
                .debug_struct("ClientCredentials")
                .field("token_url", token_url)
                .field("client_id", client_id)
                .field("client_secret", &"****")
                .finish(),
            Self::ApiKey { header, .. } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .field("key", &"****")
                .finish(),
        }
    }
}

/// A bearer token and the instant the client stops trusting it
#[derive(Clone)]
pub struct AuthToken {
    /// Token value
    pub access_token: String,
    /// Server expiry minus the refresh margin
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    /// Whether the token can still be sent at `now`
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"****")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

/// A single upstream call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
    key_param: Option<String>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            key_param: None,
        }
    }

    /// GET request
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request with a JSON body
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(body);
        request
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Add a query parameter when a value is present
    #[must_use]
    pub fn with_optional_query(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.with_query(name, value),
            None => self,
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send an API key as this query parameter instead of its header
    #[must_use]
    pub fn with_key_param(mut self, name: impl Into<String>) -> Self {
        self.key_param = Some(name.into());
        self
    }
}

/// HTTP client bound to one integration's base URL and credentials
pub struct ApiClient {
    service: String,
    base_url: String,
    credentials: Credentials,
    default_headers: Vec<(String, String)>,
    http: Client,
    token: Mutex<Option<AuthToken>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl ApiClient {
    /// Create a client for `service` rooted at `base_url`
    pub fn new(
        service: impl Into<String>,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            service: service.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            default_headers: Vec::new(),
            http,
            token: Mutex::new(None),
        })
    }

    /// Header sent on every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Integration name used in logs and errors
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Current bearer token, fetching a new one when the cached token is stale.
    ///
    /// A failed fetch leaves the cache untouched.
    pub async fn bearer_token(&self) -> Result<AuthToken> {
        let Credentials::ClientCredentials {
            token_url,
            client_id,
            client_secret,
        } = &self.credentials
        else {
            return Err(Error::NotConfigured(format!(
                "{} authenticates with an API key",
                self.service
            )));
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.clone());
        }

        let token = self
            .fetch_token(token_url, client_id, client_secret)
            .await?;
        info!(
            service = %self.service,
            expires_at = %token.expires_at,
            "Obtained access token"
        );
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn fetch_token(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<AuthToken> {
        let response = self
            .http
            .post(self.url_for(token_url))
            .timeout(TOKEN_TIMEOUT)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("{} token request: {}", self.service, e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Auth(e.without_url().to_string()))?;
        if !status.is_success() {
            warn!(service = %self.service, status = %status, "Token request rejected");
            return Err(Error::Auth(format!(
                "{} token endpoint returned HTTP {}: {}",
                self.service,
                status.as_u16(),
                truncate(&body)
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("{} token response: {e}", self.service)))?;
        let expires_at = token_expiry(Utc::now(), parsed.expires_in).ok_or_else(|| {
            Error::Auth(format!(
                "{} token response: unusable expires_in {}",
                self.service, parsed.expires_in
            ))
        })?;
        Ok(AuthToken {
            access_token: parsed.access_token,
            expires_at,
        })
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// GET `path` with query parameters
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |req, (name, value)| {
                req.with_query(*name, value)
            });
        self.send(request).await
    }

    /// POST a JSON body to `path`
    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.send(ApiRequest::post(path, body)).await
    }

    /// Send a request with this client's credentials and return the JSON body.
    ///
    /// Non-2xx replies become [`Error::Upstream`] carrying status and body.
    pub async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = self.url_for(&request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .query(&request.query);

        for (name, value) in self.default_headers.iter().chain(request.headers.iter()) {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &self.credentials {
            Credentials::ClientCredentials { .. } => {
                let token = self.bearer_token().await?;
                builder.bearer_auth(&token.access_token)
            }
            Credentials::ApiKey { header, key } => match &request.key_param {
                Some(param) => builder.query(&[(param.as_str(), key.expose_secret())]),
                None => builder.header(header.as_str(), key.expose_secret()),
            },
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(service = %self.service, method = %request.method, path = %request.path, "Calling upstream API");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(REQUEST_TIMEOUT.as_millis() as u64)
            } else {
                Error::Network(format!("{}: {}", self.service, e.without_url()))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            warn!(service = %self.service, status = %status, path = %request.path, "Upstream API error");
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
            }
            return Err(Error::Upstream {
                service: self.service.clone(),
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::InvalidResponse(format!("{}: {e}", self.service)))
    }
}

/// Instant a token reported as valid for `expires_in` seconds stops being
/// trusted. The reported lifetime is clamped to `0..=MAX_TOKEN_LIFETIME_SECS`.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    let secs = expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS) - TOKEN_REFRESH_MARGIN_SECS;
    now.checked_add_signed(ChronoDuration::try_seconds(secs)?)
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &body[..end])
}

#[cfg(test)]
mod tests;
