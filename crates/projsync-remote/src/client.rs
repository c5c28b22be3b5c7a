//! Remote project store HTTP client
//!
//! Provides a typed HTTP client for the project store API. Handles the
//! session key header, JSON bodies, and the mapping of HTTP failures onto
//! [`RemoteError`] so the sync engine can tell transient failures from
//! permanent ones.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use projsync_remote::client::ApiClient;
//!
//! # fn example() -> Result<(), projsync_core::ports::RemoteError> {
//! let _client = ApiClient::new("https://claude.ai/api", "sk-session", Duration::from_secs(30))?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use projsync_core::ports::RemoteError;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Longest HTTP-date based wait that is taken at face value
const MAX_RETRY_AFTER_DATE: Duration = Duration::from_secs(3600);

/// Longest error body excerpt carried in an error message
const BODY_EXCERPT_LEN: usize = 200;

// ============================================================================
// ApiClient
// ============================================================================

/// HTTP client for the project store API
///
/// Wraps `reqwest::Client` with the session key header and base URL
/// construction.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session_key: String,
}

impl ApiClient {
    /// Creates a client with a per-request timeout
    ///
    /// # Errors
    /// Returns [`RemoteError::Permanent`] if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        session_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("projsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Permanent(format!("could not build HTTP client: {e}")))?;
        Ok(Self::from_parts(client, base_url.into(), session_key.into()))
    }

    /// Creates a client with default settings against a custom base URL
    /// (useful for testing)
    pub fn with_base_url(session_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::from_parts(Client::new(), base_url.into(), session_key.into())
    }

    fn from_parts(client: Client, base_url: String, session_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for `path` under the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.session_key)
    }

    /// Sends a request and decodes the JSON response body
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Could not decode response body");
            RemoteError::InvalidResponse(e.to_string())
        })
    }

    /// Sends a request whose response body is not needed
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<(), RemoteError> {
        self.send(request).await.map(drop)
    }

    /// Sends a request, turning non-success statuses into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "Response received");

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let body = response.text().await.unwrap_or_default();
        let err = status_error(status, retry_after, &body, Utc::now());
        warn!(status = status.as_u16(), error = %err, "Request failed");
        Err(err)
    }
}

// ============================================================================
// Error mapping
// ============================================================================

/// Maps a transport-level failure
fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_decode() {
        RemoteError::InvalidResponse(err.to_string())
    } else if err.is_builder() {
        RemoteError::Permanent(err.to_string())
    } else {
        RemoteError::Network(err.to_string())
    }
}

/// Maps an unsuccessful HTTP status onto a [`RemoteError`]
pub fn status_error(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    now: DateTime<Utc>,
) -> RemoteError {
    let detail = describe(status, body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited {
            retry_after,
            resets_at: retry_after
                .and_then(|d| chrono::Duration::from_std(d).ok())
                .map(|d| now + d),
        },
        StatusCode::FORBIDDEN => RemoteError::Forbidden(detail),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => RemoteError::Unavailable(detail),
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::BadRequest(detail),
        StatusCode::NOT_FOUND => RemoteError::NotFound(detail),
        _ => RemoteError::Permanent(detail),
    }
}

fn describe(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {}", status.as_u16());
    }
    let excerpt: String = body.chars().take(BODY_EXCERPT_LEN).collect();
    format!("HTTP {}: {}", status.as_u16(), excerpt)
}

/// Parses a `Retry-After` header value
///
/// Supports both formats:
/// - Integer seconds: `"120"`
/// - HTTP-date: `"Wed, 21 Oct 2015 07:28:00 GMT"`, counted from `now`
///
/// Dates in the past give a zero wait; dates more than an hour away and
/// unparseable values give `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        let wait = (date.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if wait <= MAX_RETRY_AFTER_DATE {
            return Some(wait);
        }
    }

    warn!(value, "Could not parse Retry-After header");
    None
}
