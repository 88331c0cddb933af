//! Error types for Evado operations.
//!
//! Two layers: [`FetchError`] is the structured failure of a single HTTP
//! attempt (its [`FetchErrorKind`] drives bypass escalation), while
//! [`ExtractError`] is the caller-visible taxonomy for the whole pipeline.

use thiserror::Error;

/// Classification of a single fetch failure.
///
/// Only [`FetchErrorKind::Blocked`] (401/403/429/451) triggers the bypass
/// chain; everything else is surfaced to the caller as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// DNS resolution or connection failure.
    Network,
    /// Non-2xx HTTP response that does not indicate blocking (404, 410, 5xx, ...).
    Http,
    /// HTTP response indicating the client identity was rejected (401, 403, 429, 451).
    Blocked,
    /// The request exceeded its deadline and was cancelled.
    Timeout,
    /// Anything the other kinds don't cover.
    Unknown,
}

impl FetchErrorKind {
    /// Stable lowercase identifier, used in logs and aggregated bypass reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::Http => "http",
            FetchErrorKind::Blocked => "blocked",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::Unknown => "unknown",
        }
    }
}

/// A failed HTTP fetch, classified for escalation decisions.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    /// Failure classification.
    pub kind: FetchErrorKind,
    /// Human-readable description.
    pub message: String,
    /// HTTP status code, when the server answered at all.
    pub status: Option<u16>,
}

impl FetchError {
    /// Builds an error with no associated HTTP status.
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), status: None }
    }

    /// Builds an error carrying the HTTP status that produced it.
    pub fn with_status(kind: FetchErrorKind, message: impl Into<String>, status: u16) -> Self {
        Self { kind, message: message.into(), status: Some(status) }
    }

    /// Classifies a reqwest transport error (no HTTP status available).
    pub fn from_reqwest(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::new(
                FetchErrorKind::Timeout,
                format!("request timed out after {timeout_secs} seconds"),
            )
        } else if err.is_connect() || err.is_request() {
            Self::new(FetchErrorKind::Network, format!("connection failed: {err}"))
        } else {
            Self::new(FetchErrorKind::Unknown, err.to_string())
        }
    }

    /// True when this failure should escalate to the bypass chain.
    pub fn is_blocked(&self) -> bool {
        self.kind == FetchErrorKind::Blocked
    }
}

/// Main error type for article extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The initial fetch failed and bypass either was disabled or not warranted.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Every bypass strategy failed; carries one reason per strategy attempted.
    #[error("all bypass strategies failed: {}", attempts.join("; "))]
    BypassExhausted {
        /// `strategy: reason` entries in attempt order.
        attempts: Vec<String>,
    },

    /// URL could not be parsed or is missing a scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML could not be parsed or a selector was invalid.
    #[error("failed to parse HTML: {0}")]
    HtmlParse(String),

    /// The page does not look like an article (score below threshold).
    ///
    /// Distinct from a generic failure so callers can offer "try anyway"
    /// (re-run with the pre-check skipped and force extraction on).
    #[error("content is not readable (score {score:.1} below threshold {threshold:.1})")]
    NotReadable { score: f64, threshold: f64 },

    /// Extraction ran but produced no usable text.
    #[error("no content could be extracted from the document")]
    EmptyContent,

    /// The Markdown converter failed; callers should fall back to raw HTML.
    #[error("markdown conversion failed: {0}")]
    MarkdownConversion(String),

    /// File I/O errors (site-config overrides, CLI inputs).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Site configuration file errors.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for [`ExtractError`].
pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::with_status(FetchErrorKind::Blocked, "HTTP 403 Forbidden", 403);
        assert_eq!(err.to_string(), "HTTP 403 Forbidden");
        assert_eq!(err.status, Some(403));
        assert!(err.is_blocked());
    }

    #[test]
    fn test_kind_identifiers() {
        assert_eq!(FetchErrorKind::Network.as_str(), "network");
        assert_eq!(FetchErrorKind::Blocked.as_str(), "blocked");
        assert_eq!(FetchErrorKind::Timeout.as_str(), "timeout");
    }

    #[test]
    fn test_bypass_exhausted_joins_reasons() {
        let err = ExtractError::BypassExhausted {
            attempts: vec![
                "googlebot-ua: HTTP 403".to_string(),
                "wayback: no snapshot available".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("googlebot-ua: HTTP 403"));
        assert!(msg.contains("; wayback: no snapshot available"));
    }

    #[test]
    fn test_not_readable_carries_scores() {
        let err = ExtractError::NotReadable { score: 12.5, threshold: 20.0 };
        assert!(err.to_string().contains("12.5"));
        assert!(err.to_string().contains("20.0"));
    }
}
