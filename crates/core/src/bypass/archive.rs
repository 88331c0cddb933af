//! Snapshot-service bypass strategies.
//!
//! Two services of last resort: the archive.today mirror family, reached
//! through its newest-snapshot redirect endpoint, and the Wayback Machine,
//! reached through its JSON availability API. Wayback snapshots proxy every
//! embedded resource through `web.archive.org`; those URLs are rewritten
//! back to the live origin so images and styles still resolve once the
//! article is re-rendered.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, redirect};
use serde::Deserialize;
use url::Url;

use crate::bypass::{BypassConfig, StrategyOutcome, ensure_usable};
use crate::fetch::{DEFAULT_USER_AGENT, FetchConfig, FetchIdentity, fetch_url};

/// Mirror domains of the newest-snapshot redirect service, tried in order.
pub const ARCHIVE_MIRRORS: &[&str] = &[
    "https://archive.ph",
    "https://archive.today",
    "https://archive.is",
    "https://archive.li",
];

/// Wayback Machine availability API.
pub const WAYBACK_AVAILABILITY_ENDPOINT: &str = "https://archive.org/wayback/available";

/// Fetches the newest snapshot of `url` from the mirror family.
///
/// Each mirror's `/newest/<url>` endpoint redirects to the most recent
/// snapshot page. A mirror that answers the redirect chain with 429 has
/// still told us where the snapshot lives, so one direct follow-up fetch of
/// that snapshot URL is attempted before moving on.
pub(crate) async fn newest_snapshot(
    url: &str, config: &BypassConfig,
) -> Result<StrategyOutcome, String> {
    let mut last_reason = "no mirrors configured".to_string();

    for mirror in &config.archive_mirrors {
        let newest_url = format!("{}/newest/{}", mirror.trim_end_matches('/'), url);

        let client = match snapshot_client(config.archive_timeout) {
            Ok(c) => c,
            Err(e) => return Err(e),
        };

        let response = match client
            .get(&newest_url)
            .header("User-Agent", DEFAULT_USER_AGENT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                last_reason = format!("{mirror}: {e}");
                continue;
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if status.as_u16() == 429 && is_snapshot_url(&final_url, mirror) {
            // rate limited after the redirect: the snapshot URL is known,
            // one direct retry is allowed
            match direct_snapshot_fetch(&final_url, config).await {
                Ok(outcome) => return Ok(outcome),
                Err(reason) => {
                    last_reason = format!("{mirror}: rate limited, retry failed ({reason})");
                    continue;
                }
            }
        }

        if !status.is_success() {
            last_reason = format!("{mirror}: HTTP {}", status.as_u16());
            continue;
        }

        if !is_snapshot_url(&final_url, mirror) {
            last_reason = format!("{mirror}: no snapshot redirect");
            continue;
        }

        match response.text().await {
            Ok(html) => match ensure_usable(&html, config) {
                Ok(()) => {
                    return Ok(StrategyOutcome {
                        html,
                        final_url: final_url.clone(),
                        archive_url: Some(final_url),
                        snapshot_timestamp: None,
                    });
                }
                Err(reason) => last_reason = format!("{mirror}: {reason}"),
            },
            Err(e) => last_reason = format!("{mirror}: {e}"),
        }
    }

    Err(last_reason)
}

fn snapshot_client(timeout: u64) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .redirect(redirect::Policy::limited(10))
        .build()
        .map_err(|e| format!("client build failed: {e}"))
}

/// A URL is a snapshot page when it lives on the mirror but is no longer
/// the `/newest/` endpoint we asked for.
fn is_snapshot_url(final_url: &str, mirror: &str) -> bool {
    let Ok(parsed) = Url::parse(final_url) else { return false };
    let Ok(mirror_parsed) = Url::parse(mirror) else { return false };
    parsed.host_str() == mirror_parsed.host_str() && !parsed.path().contains("/newest/")
}

async fn direct_snapshot_fetch(
    snapshot_url: &str, config: &BypassConfig,
) -> Result<StrategyOutcome, String> {
    let fetch_config = FetchConfig { timeout: config.archive_timeout, ..Default::default() };
    let result = fetch_url(snapshot_url, &FetchIdentity::browser(), &fetch_config)
        .await
        .map_err(|e| e.to_string())?;
    ensure_usable(&result.html, config)?;

    Ok(StrategyOutcome {
        html: result.html,
        final_url: result.final_url,
        archive_url: Some(snapshot_url.to_string()),
        snapshot_timestamp: None,
    })
}

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    #[serde(default)]
    available: bool,
    url: String,
    #[serde(default)]
    timestamp: String,
}

/// Fetches the closest Wayback snapshot of `url`.
pub(crate) async fn wayback_snapshot(
    url: &str, config: &BypassConfig,
) -> Result<StrategyOutcome, String> {
    let endpoint = Url::parse_with_params(&config.availability_endpoint, &[("url", url)])
        .map_err(|e| format!("bad availability endpoint: {e}"))?;

    let client = snapshot_client(config.archive_timeout)?;
    let availability: AvailabilityResponse = client
        .get(endpoint)
        .header("User-Agent", DEFAULT_USER_AGENT)
        .send()
        .await
        .map_err(|e| format!("availability query failed: {e}"))?
        .json()
        .await
        .map_err(|e| format!("availability response malformed: {e}"))?;

    let closest = availability
        .archived_snapshots
        .closest
        .filter(|c| c.available)
        .ok_or_else(|| "no snapshot available".to_string())?;

    // the API reports http:// URLs for its own snapshots; they are served
    // over https
    let snapshot_url = if closest.url.starts_with("http://web.archive.org/") {
        closest.url.replacen("http://", "https://", 1)
    } else {
        closest.url.clone()
    };

    let fetch_config = FetchConfig { timeout: config.archive_timeout, ..Default::default() };
    let result = fetch_url(&snapshot_url, &FetchIdentity::browser(), &fetch_config)
        .await
        .map_err(|e| e.to_string())?;
    ensure_usable(&result.html, config)?;

    Ok(StrategyOutcome {
        html: rewrite_snapshot_urls(&result.html),
        final_url: result.final_url,
        archive_url: Some(snapshot_url),
        snapshot_timestamp: Some(closest.timestamp).filter(|t| !t.is_empty()),
    })
}

/// Rewrites Wayback resource-proxy URLs back to the live origin.
///
/// Snapshot pages embed resources as
/// `https://web.archive.org/web/<timestamp><flag>/<original-url>`; stripping
/// the proxy prefix leaves the original absolute URL in place.
pub(crate) fn rewrite_snapshot_urls(html: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"https?://web\.archive\.org/web/\d+(?:im_|js_|cs_|if_|id_)?/")
            .unwrap_or_else(|_| Regex::new("$^").unwrap())
    });
    re.replace_all(html, "").to_string()
}
