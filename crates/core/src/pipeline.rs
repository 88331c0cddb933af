//! The single entry point: URL in, article out.
//!
//! One request runs strictly sequentially: fetch with the default browser
//! identity; on a blocked response, escalate through the bypass chain;
//! parse whatever HTML arrived; then run the soft-paywall check and — on a
//! positive signal — give the bypass chain one more chance, keeping its
//! result only when it is meaningfully longer than what we already have.
//! Abandoning the returned future cancels everything in flight; no state
//! outlives the request.

use crate::article::{ArchiveSource, ArticleContent};
use crate::bypass::{BypassConfig, BypassOrchestrator, BypassResult};
use crate::clean::CleanConfig;
use crate::error::{ExtractError, Result};
use crate::extract::ExtractConfig;
use crate::fetch::{FetchConfig, FetchIdentity, fetch_url};
use crate::paywall::{PaywallConfig, detect_paywall};
use crate::readability::{Readability, ReadabilityOptions};
use crate::siteconfig::SiteConfigTable;
use crate::sites::ExtractorRegistry;

/// End-to-end pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// HTTP settings for the initial fetch.
    pub fetch: FetchConfig,
    /// Bypass chain endpoints and timeouts.
    pub bypass: BypassConfig,
    /// Whether blocked fetches escalate to the bypass chain.
    pub enable_bypass: bool,
    /// Soft-paywall detection settings.
    pub paywall: PaywallConfig,
    /// Parse options.
    pub readability: ReadabilityOptions,
    /// Pre-cleaner thresholds.
    pub clean: CleanConfig,
    /// Generic extraction thresholds.
    pub extract: ExtractConfig,
    /// Minimum relative text-length gain before a soft-paywall re-bypass
    /// replaces already-extracted content (0.2 = 20% longer).
    pub improvement_ratio: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            bypass: BypassConfig::default(),
            enable_bypass: true,
            paywall: PaywallConfig::default(),
            readability: ReadabilityOptions::default(),
            clean: CleanConfig::default(),
            extract: ExtractConfig::default(),
            improvement_ratio: 0.2,
        }
    }
}

impl PipelineConfig {
    /// Creates a builder for the pipeline configuration.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Builder seeded with defaults.
    pub fn new() -> Self {
        Self { config: PipelineConfig::default() }
    }

    /// Enables or disables the bypass chain.
    pub fn enable_bypass(mut self, value: bool) -> Self {
        self.config.enable_bypass = value;
        self
    }

    /// Sets the initial fetch timeout in seconds.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.fetch.timeout = seconds;
        self
    }

    /// Sets the soft-paywall replacement gain threshold.
    pub fn improvement_ratio(mut self, ratio: f64) -> Self {
        self.config.improvement_ratio = ratio;
        self
    }

    /// Sets the bypass endpoints/timeouts.
    pub fn bypass(mut self, bypass: BypassConfig) -> Self {
        self.config.bypass = bypass;
        self
    }

    /// Skips the readability pre-check and forces extraction fallbacks.
    pub fn force(mut self, value: bool) -> Self {
        self.config.readability.skip_pre_check = value;
        self.config.readability.force_parse = value || self.config.readability.force_parse;
        self
    }

    /// Builds the config.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts a readable article from a URL.
///
/// This is the sole inbound interface of the pipeline. On a blocked fetch
/// (401/403/429/451) the bypass chain runs; on a soft paywall detected in
/// the extracted text, the chain runs once more and its result replaces
/// the original only when meaningfully longer.
///
/// # Errors
///
/// [`ExtractError::Fetch`] when the initial fetch fails without bypass,
/// [`ExtractError::BypassExhausted`] when every strategy failed, and the
/// parse-stage errors of [`Readability::parse_article`].
pub async fn extract_article(url: &str, config: &PipelineConfig) -> Result<ArticleContent> {
    let reader = build_reader(config);

    let mut archive: Option<ArchiveSource> = None;
    let (html, final_url) = match fetch_url(url, &FetchIdentity::browser(), &config.fetch).await {
        Ok(result) => {
            tracing::debug!(url, bytes = result.content_length, "direct fetch succeeded");
            (result.html, result.final_url)
        }
        Err(err) if err.is_blocked() && config.enable_bypass => {
            tracing::debug!(url, status = ?err.status, "blocked, escalating to bypass chain");
            let orchestrator = BypassOrchestrator::with_config(config.bypass.clone());
            match orchestrator.try_bypass(url).await {
                BypassResult {
                    success: true,
                    html: Some(html),
                    final_url,
                    source,
                    archive_url,
                    snapshot_timestamp,
                    ..
                } => {
                    archive = Some(ArchiveSource {
                        service: source,
                        url: archive_url,
                        timestamp: snapshot_timestamp,
                    });
                    (html, final_url.unwrap_or_else(|| url.to_string()))
                }
                failed => return Err(ExtractError::BypassExhausted { attempts: failed.attempts }),
            }
        }
        Err(err) => return Err(ExtractError::Fetch(err)),
    };

    let mut article = reader.parse_article(&html, &final_url, &config.readability)?;
    article.source_url = Some(url.to_string());
    article.archive_source = archive;

    // a 200 response can still be a truncated preview; one bypass round may
    // recover the full text
    if article.archive_source.is_none() && config.enable_bypass {
        let signal = detect_paywall(&article.text_content, url, &config.paywall);
        if signal.is_paywalled {
            tracing::debug!(
                url,
                pattern = signal.matched_pattern.as_deref().unwrap_or_default(),
                "soft paywall detected, attempting re-bypass"
            );
            article = rebypass_soft_paywall(url, article, &reader, config).await;
        }
    }

    Ok(article)
}

fn build_reader(config: &PipelineConfig) -> Readability {
    let site_configs = SiteConfigTable::with_user_overrides().unwrap_or_else(|e| {
        tracing::warn!("ignoring site-config overrides: {e}");
        SiteConfigTable::builtin()
    });

    Readability::with_config(
        config.clean.clone(),
        config.extract.clone(),
        ExtractorRegistry::with_defaults(),
        site_configs,
    )
}

/// Runs the bypass chain against a soft paywall and keeps the longer text.
///
/// Failures here are absorbed: a truncated article still beats no article.
async fn rebypass_soft_paywall(
    url: &str, original: ArticleContent, reader: &Readability, config: &PipelineConfig,
) -> ArticleContent {
    let orchestrator = BypassOrchestrator::with_config(config.bypass.clone());
    let result = orchestrator.try_bypass(url).await;

    let BypassResult {
        success: true,
        html: Some(html),
        final_url,
        source,
        archive_url,
        snapshot_timestamp,
        ..
    } = result
    else {
        tracing::debug!(url, "soft-paywall re-bypass failed, keeping original content");
        return original;
    };

    let parse_url = final_url.unwrap_or_else(|| url.to_string());
    match reader.parse_article(&html, &parse_url, &config.readability) {
        Ok(mut bypassed) => {
            let required = original.length as f64 * (1.0 + config.improvement_ratio);
            if (bypassed.length as f64) >= required {
                tracing::debug!(
                    url,
                    original = original.length,
                    bypassed = bypassed.length,
                    "re-bypass recovered longer content"
                );
                bypassed.source_url = Some(url.to_string());
                bypassed.archive_source = Some(ArchiveSource {
                    service: source,
                    url: archive_url,
                    timestamp: snapshot_timestamp,
                });
                bypassed
            } else {
                tracing::debug!(
                    url,
                    original = original.length,
                    bypassed = bypassed.length,
                    "re-bypass did not improve content enough, keeping original"
                );
                original
            }
        }
        Err(e) => {
            tracing::debug!(url, "re-bypassed page failed to parse ({e}), keeping original");
            original
        }
    }
}
