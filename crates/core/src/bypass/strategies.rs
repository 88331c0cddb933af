//! Identity-swap bypass strategies against the live origin.
//!
//! Three families: crawler user-agents (many sites serve indexing bots the
//! full article), social-media referrers (metered paywalls often wave
//! through traffic from link aggregators), and a minimal-header re-fetch
//! (client-side-only soft paywalls key on browser fingerprint headers).

use crate::bypass::{BypassConfig, StrategyOutcome, ensure_usable};
use crate::fetch::{FetchConfig, FetchIdentity, fetch_url};

/// Googlebot desktop user agent.
pub const GOOGLEBOT_UA: &str = "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; \
     Googlebot/2.1; +http://www.google.com/bot.html) Chrome/131.0.0.0 Safari/537.36";

/// Bingbot desktop user agent.
pub const BINGBOT_UA: &str = "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; \
     bingbot/2.0; +http://www.bing.com/bingbot.htm) Chrome/131.0.0.0 Safari/537.36";

/// Referrers tried in sequence by the social-referrer strategy.
pub const SOCIAL_REFERRERS: &[&str] = &[
    "https://t.co/",
    "https://www.facebook.com/",
    "https://www.reddit.com/",
    "https://news.ycombinator.com/",
];

/// Fetches the URL presenting a crawler identity.
pub(crate) async fn crawler_fetch(
    url: &str, user_agent: &str, config: &BypassConfig,
) -> Result<StrategyOutcome, String> {
    let fetch_config = FetchConfig { timeout: config.crawler_timeout, ..Default::default() };
    let identity = FetchIdentity::crawler(user_agent);

    let result = fetch_url(url, &identity, &fetch_config)
        .await
        .map_err(|e| e.to_string())?;
    ensure_usable(&result.html, config)?;

    Ok(StrategyOutcome::from_fetch(result))
}

/// Re-fetches the URL presenting each configured social referrer in turn,
/// returning on the first usable response.
pub(crate) async fn social_referrer_fetch(
    url: &str, config: &BypassConfig,
) -> Result<StrategyOutcome, String> {
    let fetch_config = FetchConfig { timeout: config.crawler_timeout, ..Default::default() };
    let mut last_reason = "no referrers configured".to_string();

    for referrer in &config.social_referrers {
        let identity = FetchIdentity::with_referrer(referrer);
        match fetch_url(url, &identity, &fetch_config).await {
            Ok(result) => match ensure_usable(&result.html, config) {
                Ok(()) => return Ok(StrategyOutcome::from_fetch(result)),
                Err(reason) => last_reason = reason,
            },
            Err(e) => last_reason = e.to_string(),
        }
    }

    Err(format!("no referrer accepted ({last_reason})"))
}

/// Re-fetches the URL with a near-empty header set.
pub(crate) async fn minimal_refetch(
    url: &str, config: &BypassConfig,
) -> Result<StrategyOutcome, String> {
    let fetch_config = FetchConfig { timeout: config.crawler_timeout, ..Default::default() };

    let result = fetch_url(url, &FetchIdentity::minimal(), &fetch_config)
        .await
        .map_err(|e| e.to_string())?;
    ensure_usable(&result.html, config)?;

    Ok(StrategyOutcome::from_fetch(result))
}
