//! Single-shot HTTP fetching with configurable request identities.
//!
//! One fetch is one GET: the retry/fallback policy lives entirely in the
//! bypass orchestrator. What this module owns is the identity a request
//! presents (user-agent, referrer, header profile), the per-request
//! timeout, and the mapping of failures onto [`FetchErrorKind`].

use std::time::Duration;

use reqwest::{Client, StatusCode, redirect};
use url::Url;

use crate::error::{FetchError, FetchErrorKind};

/// Default desktop-browser user agent presented when no identity override applies.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// The header profile a request presents to the origin server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProfile {
    /// Full desktop-browser fingerprint (Accept, Accept-Language, etc.).
    Browser,
    /// Only the bare minimum reqwest sends; defeats header-fingerprint soft paywalls.
    Minimal,
}

/// A network identity: who the request claims to be.
#[derive(Debug, Clone)]
pub struct FetchIdentity {
    /// User-Agent header, or `None` to send no user agent at all.
    pub user_agent: Option<String>,
    /// Referer header, when impersonating traffic from a known source.
    pub referrer: Option<String>,
    /// Which set of ancillary headers accompanies the request.
    pub profile: HeaderProfile,
}

impl Default for FetchIdentity {
    fn default() -> Self {
        Self::browser()
    }
}

impl FetchIdentity {
    /// Default desktop-browser identity.
    pub fn browser() -> Self {
        Self {
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            referrer: None,
            profile: HeaderProfile::Browser,
        }
    }

    /// Identity with a crawler user-agent (Googlebot, Bingbot, ...).
    pub fn crawler(user_agent: &str) -> Self {
        Self {
            user_agent: Some(user_agent.to_string()),
            referrer: None,
            profile: HeaderProfile::Browser,
        }
    }

    /// Browser identity arriving via the given referrer.
    pub fn with_referrer(referrer: &str) -> Self {
        Self {
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            referrer: Some(referrer.to_string()),
            profile: HeaderProfile::Browser,
        }
    }

    /// Near-empty header set.
    pub fn minimal() -> Self {
        Self { user_agent: None, referrer: None, profile: HeaderProfile::Minimal }
    }
}

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Maximum redirects to follow.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, max_redirects: 10 }
    }
}

/// The body and provenance of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Response body.
    pub html: String,
    /// URL after redirects; relative-link resolution must use this, not the
    /// requested URL.
    pub final_url: String,
    /// Body length in bytes.
    pub content_length: usize,
    /// Content-Type header, if the server sent one.
    pub content_type: Option<String>,
}

/// Maps a non-success HTTP status onto a failure kind.
///
/// 401/403/429/451 are treated as "the identity was rejected" and are the
/// only statuses that escalate to the bypass chain.
pub fn classify_status(status: StatusCode) -> (FetchErrorKind, &'static str) {
    match status.as_u16() {
        401 | 403 => (FetchErrorKind::Blocked, "access denied"),
        429 => (FetchErrorKind::Blocked, "rate limited"),
        451 => (FetchErrorKind::Blocked, "unavailable for legal reasons"),
        404 => (FetchErrorKind::Http, "not found"),
        410 => (FetchErrorKind::Http, "gone"),
        s if s >= 500 => (FetchErrorKind::Http, "server error"),
        _ => (FetchErrorKind::Http, "request failed"),
    }
}

fn build_client(config: &FetchConfig) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .redirect(redirect::Policy::limited(config.max_redirects))
        .build()
        .map_err(|e| FetchError::new(FetchErrorKind::Unknown, format!("client build failed: {e}")))
}

/// Fetches HTML from a URL under the given identity.
///
/// Performs exactly one GET (plus redirect following), bounded by the
/// configured timeout. Non-2xx responses are classified via
/// [`classify_status`]; transport errors via [`FetchError::from_reqwest`].
/// A zero-length body counts as a failed fetch, never as empty success.
pub async fn fetch_url(
    url: &str, identity: &FetchIdentity, config: &FetchConfig,
) -> Result<FetchResult, FetchError> {
    let parsed = Url::parse(url)
        .map_err(|e| FetchError::new(FetchErrorKind::Unknown, format!("invalid URL: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(FetchError::new(
            FetchErrorKind::Unknown,
            format!("unsupported URL scheme: {}", parsed.scheme()),
        ));
    }

    let client = build_client(config)?;
    let mut request = client.get(parsed);

    if let Some(ua) = &identity.user_agent {
        request = request.header("User-Agent", ua);
    }
    if let Some(referrer) = &identity.referrer {
        request = request.header("Referer", referrer);
    }
    if identity.profile == HeaderProfile::Browser {
        request = request
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Upgrade-Insecure-Requests", "1");
    } else {
        request = request.header("Accept", "*/*");
    }

    let response = request
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(&e, config.timeout))?;

    let status = response.status();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    if !status.is_success() {
        let (kind, label) = classify_status(status);
        return Err(FetchError::with_status(
            kind,
            format!("HTTP {}: {label}", status.as_u16()),
            status.as_u16(),
        ));
    }

    let html = response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(&e, config.timeout))?;

    if html.trim().is_empty() {
        return Err(FetchError::with_status(
            FetchErrorKind::Http,
            "empty response body",
            status.as_u16(),
        ));
    }

    let content_length = html.len();
    Ok(FetchResult { html, final_url, content_length, content_type })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert_eq!(config.max_redirects, 10);
    }

    #[test]
    fn test_default_identity_is_browser() {
        let identity = FetchIdentity::default();
        assert!(identity.user_agent.unwrap().contains("Mozilla"));
        assert!(identity.referrer.is_none());
        assert_eq!(identity.profile, HeaderProfile::Browser);
    }

    #[test]
    fn test_minimal_identity_has_no_user_agent() {
        let identity = FetchIdentity::minimal();
        assert!(identity.user_agent.is_none());
        assert_eq!(identity.profile, HeaderProfile::Minimal);
    }

    #[rstest]
    #[case(401, FetchErrorKind::Blocked)]
    #[case(403, FetchErrorKind::Blocked)]
    #[case(429, FetchErrorKind::Blocked)]
    #[case(451, FetchErrorKind::Blocked)]
    #[case(404, FetchErrorKind::Http)]
    #[case(410, FetchErrorKind::Http)]
    #[case(500, FetchErrorKind::Http)]
    #[case(503, FetchErrorKind::Http)]
    #[case(302, FetchErrorKind::Http)]
    fn test_status_classification(#[case] status: u16, #[case] expected: FetchErrorKind) {
        let (kind, _) = classify_status(StatusCode::from_u16(status).unwrap());
        assert_eq!(kind, expected);
    }

    #[tokio::test]
    async fn test_fetch_url_invalid() {
        let result = fetch_url("not-a-url", &FetchIdentity::default(), &FetchConfig::default()).await;
        assert!(matches!(result, Err(FetchError { kind: FetchErrorKind::Unknown, .. })));
    }

    #[tokio::test]
    async fn test_fetch_url_bad_scheme() {
        let result =
            fetch_url("ftp://example.com/x", &FetchIdentity::default(), &FetchConfig::default()).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::Unknown);
        assert!(err.message.contains("scheme"));
    }
}
