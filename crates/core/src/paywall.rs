//! Soft-paywall detection over extracted text.
//!
//! A page can answer 200 OK and still deliver only preview content. This
//! detector looks for the language such pages use, but only on hosts known
//! to paywall — ordinary short pages elsewhere must not trip it. It is a
//! secondary defense: the pipeline runs it after a nominally successful
//! fetch and parse, and a positive signal triggers one bypass round.

use regex::Regex;
use url::Url;

/// Domains known to serve paywalled content. Subdomains match too.
const PAYWALLED_DOMAINS: &[&str] = &[
    "nytimes.com",
    "wsj.com",
    "washingtonpost.com",
    "ft.com",
    "economist.com",
    "bloomberg.com",
    "newyorker.com",
    "theatlantic.com",
    "wired.com",
    "businessinsider.com",
    "medium.com",
    "latimes.com",
    "bostonglobe.com",
    "telegraph.co.uk",
    "thetimes.co.uk",
    "seattletimes.com",
    "theathletic.com",
    "barrons.com",
    "hbr.org",
    "foreignpolicy.com",
];

/// Linguistic markers of truncated preview content, tested in order.
const PAYWALL_MARKERS: &[&str] = &[
    r"(?i)subscribe (now )?to (continue reading|keep reading|read more)",
    r"(?i)to continue reading[,.]? (please )?(subscribe|sign in|log in)",
    r"(?i)this (article|story|content) is (for|reserved for|exclusive to) subscribers",
    r"(?i)already a subscriber\?",
    r"(?i)you('| ha)ve reached your (free )?(article|story|monthly) limit",
    r"(?i)verify (your )?access",
    r"(?i)you are (viewing|reading) a preview",
    r"(?i)continue reading your article with",
    r"(?i)create a free account to (continue|keep) reading",
    r"(?i)unlock this (article|story)",
    r"(?i)sign in to continue reading",
    r"(?i)thank you for reading your \d+ free articles",
];

/// Configuration for paywall text detection.
#[derive(Debug, Clone)]
pub struct PaywallConfig {
    /// Hostname allowlist; detection short-circuits to negative elsewhere.
    pub domains: Vec<String>,
    /// Ordered regex markers.
    pub markers: Vec<String>,
}

impl Default for PaywallConfig {
    fn default() -> Self {
        Self {
            domains: PAYWALLED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            markers: PAYWALL_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Outcome of a paywall probe.
#[derive(Debug, Clone, Default)]
pub struct PaywallSignal {
    /// Whether the text reads like paywalled preview content.
    pub is_paywalled: bool,
    /// The marker pattern that matched, when one did.
    pub matched_pattern: Option<String>,
}

/// Whether the URL's host is on the known-paywalled allowlist.
pub fn is_known_paywalled_host(url: &str, config: &PaywallConfig) -> bool {
    let Ok(parsed) = Url::parse(url) else { return false };
    let Some(host) = parsed.host_str() else { return false };
    config
        .domains
        .iter()
        .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
}

/// Tests extracted text for paywall language.
///
/// Returns a negative signal immediately unless the host is allowlisted;
/// otherwise reports the first marker that matches.
pub fn detect_paywall(text: &str, url: &str, config: &PaywallConfig) -> PaywallSignal {
    if !is_known_paywalled_host(url, config) {
        return PaywallSignal::default();
    }

    for marker in &config.markers {
        let Ok(re) = Regex::new(marker) else {
            tracing::warn!(pattern = %marker, "invalid paywall marker, skipping");
            continue;
        };
        if re.is_match(text) {
            return PaywallSignal { is_paywalled: true, matched_pattern: Some(marker.clone()) };
        }
    }

    PaywallSignal::default()
}
