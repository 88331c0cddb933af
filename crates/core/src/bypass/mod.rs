//! Blocked-page bypass orchestration.
//!
//! When the origin rejects our default identity, an ordered chain of
//! alternative identities and snapshot services is tried until one yields
//! usable HTML. The order is deliberate: cheap identity swaps against the
//! live origin first, third-party archive services last, so latency and
//! third-party load stay low for the common case. Strategies run
//! sequentially, never concurrently — request volume against other
//! people's infrastructure is part of the contract.
//!
//! Per-strategy failures are recovered locally and logged; only total
//! exhaustion is surfaced, carrying one reason per strategy tried.

pub mod archive;
pub mod strategies;

use serde::Serialize;

use crate::fetch::FetchResult;

/// Identifies which strategy produced a bypassed page. Surfaced to the
/// caller as provenance ("via Wayback Machine" and the like).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategySource {
    /// Googlebot crawler identity against the live origin.
    GooglebotUa,
    /// Bingbot crawler identity against the live origin.
    BingbotUa,
    /// Browser identity arriving from a social-media referrer.
    SocialReferrer,
    /// Re-fetch with a near-empty header set.
    MinimalRefetch,
    /// Newest snapshot from the archive.today mirror family.
    ArchiveToday,
    /// Closest snapshot from the Wayback Machine availability API.
    Wayback,
    /// Already-rendered HTML supplied by an external browser-tab channel.
    /// Never produced here; exists so callers can label that provenance.
    BrowserTab,
    /// No bypass was involved (or none succeeded).
    None,
}

impl StrategySource {
    /// Stable identifier used in provenance fields and failure reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategySource::GooglebotUa => "googlebot-ua",
            StrategySource::BingbotUa => "bingbot-ua",
            StrategySource::SocialReferrer => "social-referrer",
            StrategySource::MinimalRefetch => "minimal-refetch",
            StrategySource::ArchiveToday => "archive-today",
            StrategySource::Wayback => "wayback",
            StrategySource::BrowserTab => "browser-tab",
            StrategySource::None => "none",
        }
    }
}

impl std::fmt::Display for StrategySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed attempt order. Cheapest and most likely to succeed first.
pub const ATTEMPT_ORDER: &[StrategySource] = &[
    StrategySource::GooglebotUa,
    StrategySource::BingbotUa,
    StrategySource::SocialReferrer,
    StrategySource::MinimalRefetch,
    StrategySource::ArchiveToday,
    StrategySource::Wayback,
];

/// Endpoints, timeouts, and gates for the bypass chain.
///
/// Everything that names a third-party service lives here so tests can
/// point the chain at a local mock server.
#[derive(Debug, Clone)]
pub struct BypassConfig {
    /// Timeout for crawler-identity and social-referrer fetches, seconds.
    pub crawler_timeout: u64,
    /// Timeout for archive-service fetches, seconds.
    pub archive_timeout: u64,
    /// Minimum body length before a response counts as usable HTML.
    pub min_html_length: usize,
    /// Referrer URLs tried in sequence by the social-referrer strategy.
    pub social_referrers: Vec<String>,
    /// Base URLs of the newest-snapshot mirror family, tried in sequence.
    pub archive_mirrors: Vec<String>,
    /// Wayback-style availability API endpoint.
    pub availability_endpoint: String,
}

impl Default for BypassConfig {
    fn default() -> Self {
        Self {
            crawler_timeout: 15,
            archive_timeout: 45,
            min_html_length: 500,
            social_referrers: strategies::SOCIAL_REFERRERS.iter().map(|r| r.to_string()).collect(),
            archive_mirrors: archive::ARCHIVE_MIRRORS.iter().map(|m| m.to_string()).collect(),
            availability_endpoint: archive::WAYBACK_AVAILABILITY_ENDPOINT.to_string(),
        }
    }
}

/// Outcome of a bypass run.
#[derive(Debug, Clone)]
pub struct BypassResult {
    /// Whether any strategy produced usable HTML.
    pub success: bool,
    /// The bypassed page, on success.
    pub html: Option<String>,
    /// Final URL of the successful fetch.
    pub final_url: Option<String>,
    /// Which strategy succeeded, or [`StrategySource::None`].
    pub source: StrategySource,
    /// Snapshot URL when an archive service supplied the page.
    pub archive_url: Option<String>,
    /// Snapshot timestamp when the archive service reports one.
    pub snapshot_timestamp: Option<String>,
    /// Aggregated failure reasons when every strategy failed.
    pub error: Option<String>,
    /// One `strategy: reason` entry per failed attempt, in order.
    pub attempts: Vec<String>,
}

/// What a successful strategy hands back to the orchestrator.
#[derive(Debug, Clone)]
pub(crate) struct StrategyOutcome {
    pub html: String,
    pub final_url: String,
    pub archive_url: Option<String>,
    pub snapshot_timestamp: Option<String>,
}

impl StrategyOutcome {
    pub(crate) fn from_fetch(result: FetchResult) -> Self {
        Self {
            html: result.html,
            final_url: result.final_url,
            archive_url: None,
            snapshot_timestamp: None,
        }
    }
}

/// Gate that rejects token responses (error interstitials, empty shells)
/// before they can masquerade as a successful bypass.
pub(crate) fn ensure_usable(html: &str, config: &BypassConfig) -> Result<(), String> {
    if html.len() < config.min_html_length {
        return Err(format!(
            "response too short to be an article ({} bytes)",
            html.len()
        ));
    }
    if !html.contains('<') {
        return Err("response is not HTML".to_string());
    }
    Ok(())
}

/// Runs the bypass chain for one URL.
#[derive(Debug, Clone, Default)]
pub struct BypassOrchestrator {
    config: BypassConfig,
}

impl BypassOrchestrator {
    /// Orchestrator with default endpoints and timeouts.
    pub fn new() -> Self {
        Self { config: BypassConfig::default() }
    }

    /// Orchestrator with custom endpoints/timeouts (tests, self-hosted mirrors).
    pub fn with_config(config: BypassConfig) -> Self {
        Self { config }
    }

    /// Tries each strategy in [`ATTEMPT_ORDER`], stopping at the first that
    /// returns usable HTML.
    pub async fn try_bypass(&self, url: &str) -> BypassResult {
        let mut attempts = Vec::new();

        for source in ATTEMPT_ORDER {
            tracing::debug!(strategy = source.as_str(), url, "attempting bypass strategy");
            match self.attempt(*source, url).await {
                Ok(outcome) => {
                    tracing::debug!(strategy = source.as_str(), "bypass strategy succeeded");
                    return BypassResult {
                        success: true,
                        html: Some(outcome.html),
                        final_url: Some(outcome.final_url),
                        source: *source,
                        archive_url: outcome.archive_url,
                        snapshot_timestamp: outcome.snapshot_timestamp,
                        error: None,
                        attempts,
                    };
                }
                Err(reason) => {
                    tracing::warn!(strategy = source.as_str(), %reason, "bypass strategy failed");
                    attempts.push(format!("{}: {reason}", source.as_str()));
                }
            }
        }

        BypassResult {
            success: false,
            html: None,
            final_url: None,
            source: StrategySource::None,
            archive_url: None,
            snapshot_timestamp: None,
            error: Some(attempts.join("; ")),
            attempts,
        }
    }

    async fn attempt(&self, source: StrategySource, url: &str) -> Result<StrategyOutcome, String> {
        match source {
            StrategySource::GooglebotUa => {
                strategies::crawler_fetch(url, strategies::GOOGLEBOT_UA, &self.config).await
            }
            StrategySource::BingbotUa => {
                strategies::crawler_fetch(url, strategies::BINGBOT_UA, &self.config).await
            }
            StrategySource::SocialReferrer => {
                strategies::social_referrer_fetch(url, &self.config).await
            }
            StrategySource::MinimalRefetch => strategies::minimal_refetch(url, &self.config).await,
            StrategySource::ArchiveToday => archive::newest_snapshot(url, &self.config).await,
            StrategySource::Wayback => archive::wayback_snapshot(url, &self.config).await,
            StrategySource::BrowserTab | StrategySource::None => {
                Err("not a network strategy".to_string())
            }
        }
    }
}
