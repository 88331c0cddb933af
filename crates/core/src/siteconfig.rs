//! Per-site extraction overrides.
//!
//! A [`SiteConfig`] tunes the pre-cleaner for one site family: an explicit
//! article selector, extra removal selectors, text-gated removals, block
//! elements that should render inline, and caption formatting. Entries are
//! matched by hostname regex; the first match wins and entries are never
//! merged.
//!
//! The builtin table is data compiled into the crate. Users can prepend
//! their own entries via `sites.json` in the platform config directory
//! (first match wins, so user entries override builtins).

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{ExtractError, Result};

/// Removal gated on element text: the element matching `selector` is removed
/// only when its text content matches `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPattern {
    /// CSS selector for candidate elements.
    pub selector: String,
    /// Regex tested against the element's text content.
    pub pattern: String,
}

/// Caption formatting rules for a site's figure markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    /// Selector for the caption text element; its content is wrapped in
    /// emphasis and given terminal punctuation.
    pub text_selector: String,
    /// Selector for the photo-credit element; its content is prefixed with a
    /// space so it doesn't run into the caption.
    #[serde(default)]
    pub credit_selector: Option<String>,
}

/// Extraction overrides for one site family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display name of the site.
    pub name: String,
    /// Regex matched against the page hostname.
    pub host_pattern: String,
    /// CSS selector (possibly comma-separated alternatives) for the article
    /// body; also feeds the protected set and force extraction.
    #[serde(default)]
    pub article_selector: Option<String>,
    /// Extra selectors removed before the generic negative catalog runs.
    #[serde(default)]
    pub remove_selectors: Vec<String>,
    /// Text-gated removals.
    #[serde(default)]
    pub remove_text_patterns: Vec<TextPattern>,
    /// Block elements converted to inline wrappers (class preserved) to
    /// avoid spurious Markdown line breaks.
    #[serde(default)]
    pub inline_selectors: Vec<String>,
    /// Prefer structured-data metadata over meta tags for this site.
    #[serde(default)]
    pub prefer_structured_data: bool,
    /// Caption formatting rules.
    #[serde(default)]
    pub caption: Option<CaptionConfig>,
}

impl SiteConfig {
    /// Whether this entry applies to the given hostname.
    pub fn matches_host(&self, host: &str) -> bool {
        match Regex::new(&self.host_pattern) {
            Ok(re) => re.is_match(host),
            Err(e) => {
                tracing::warn!(pattern = %self.host_pattern, "invalid host pattern: {e}");
                false
            }
        }
    }
}

/// Ordered site-config table with first-match-wins lookup.
#[derive(Debug, Clone)]
pub struct SiteConfigTable {
    configs: Vec<SiteConfig>,
}

impl SiteConfigTable {
    /// Table containing only the builtin entries.
    pub fn builtin() -> Self {
        Self { configs: builtin_configs() }
    }

    /// Builtin table with user overrides (if any) prepended.
    ///
    /// Looks for `evado/sites.json` under the platform config directory.
    /// A missing file is not an error; a malformed one is.
    pub fn with_user_overrides() -> Result<Self> {
        let mut configs = Vec::new();
        if let Some(path) = user_config_path()
            && path.exists()
        {
            configs.extend(load_config_file(&path)?);
        }
        configs.extend(builtin_configs());
        Ok(Self { configs })
    }

    /// Builds a table from explicit entries (primarily for tests).
    pub fn from_configs(configs: Vec<SiteConfig>) -> Self {
        Self { configs }
    }

    /// First entry whose host pattern matches, if any.
    pub fn lookup(&self, host: &str) -> Option<&SiteConfig> {
        self.configs.iter().find(|c| c.matches_host(host))
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl Default for SiteConfigTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("evado").join("sites.json"))
}

fn load_config_file(path: &Path) -> Result<Vec<SiteConfig>> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| ExtractError::Config(format!("{}: {e}", path.display())))
}

/// The builtin per-site override table.
///
/// Ordering matters only where host patterns overlap; keep more specific
/// patterns first.
fn builtin_configs() -> Vec<SiteConfig> {
    vec![
        SiteConfig {
            name: "The New York Times".to_string(),
            host_pattern: r"(^|\.)nytimes\.com$".to_string(),
            article_selector: Some("section[name=\"articleBody\"]".to_string()),
            remove_selectors: vec![
                "[data-testid=\"inline-message\"]".to_string(),
                "[data-testid=\"brand-bar\"]".to_string(),
                ".ad".to_string(),
            ],
            remove_text_patterns: vec![TextPattern {
                selector: "p".to_string(),
                pattern: r"(?i)^advertisement$".to_string(),
            }],
            inline_selectors: vec![],
            prefer_structured_data: true,
            caption: Some(CaptionConfig {
                text_selector: "figcaption .caption-text".to_string(),
                credit_selector: Some("figcaption .credit".to_string()),
            }),
        },
        SiteConfig {
            name: "The Guardian".to_string(),
            host_pattern: r"(^|\.)theguardian\.com$".to_string(),
            article_selector: Some("#maincontent, .article-body-commercial-selector".to_string()),
            remove_selectors: vec![
                ".submeta".to_string(),
                "figure.element-rich-link".to_string(),
                "aside.element".to_string(),
            ],
            remove_text_patterns: vec![],
            inline_selectors: vec![],
            prefer_structured_data: false,
            caption: Some(CaptionConfig {
                text_selector: "figcaption .caption__text".to_string(),
                credit_selector: Some("figcaption .caption__credit".to_string()),
            }),
        },
        SiteConfig {
            name: "Medium".to_string(),
            host_pattern: r"(^|\.)medium\.com$".to_string(),
            article_selector: Some("article section".to_string()),
            remove_selectors: vec![
                ".speechify-ignore".to_string(),
                "[data-testid=\"audioPlayButton\"]".to_string(),
                "[data-testid=\"headerClapButton\"]".to_string(),
                "[data-testid=\"responsesSection\"]".to_string(),
            ],
            remove_text_patterns: vec![TextPattern {
                selector: "p".to_string(),
                pattern: r"(?i)^(follow|listen|share)$".to_string(),
            }],
            inline_selectors: vec![],
            prefer_structured_data: true,
            caption: None,
        },
        SiteConfig {
            name: "Substack".to_string(),
            host_pattern: r"(^|\.)substack\.com$".to_string(),
            article_selector: Some(".available-content".to_string()),
            remove_selectors: vec![
                ".subscribe-widget".to_string(),
                ".subscription-widget-wrap".to_string(),
                ".button-wrapper".to_string(),
                ".share-dialog".to_string(),
            ],
            remove_text_patterns: vec![],
            inline_selectors: vec![],
            prefer_structured_data: false,
            caption: None,
        },
        SiteConfig {
            name: "Wikipedia".to_string(),
            host_pattern: r"(^|\.)wikipedia\.org$".to_string(),
            article_selector: Some("#mw-content-text .mw-parser-output".to_string()),
            remove_selectors: vec![
                ".mw-editsection".to_string(),
                ".reference".to_string(),
                ".navbox".to_string(),
                ".infobox-below".to_string(),
                "#toc".to_string(),
                ".mw-jump-link".to_string(),
            ],
            remove_text_patterns: vec![TextPattern {
                selector: "div".to_string(),
                pattern: r"(?i)^\s*\[\s*edit\s*\]\s*$".to_string(),
            }],
            inline_selectors: vec![],
            prefer_structured_data: false,
            caption: None,
        },
        SiteConfig {
            name: "BBC".to_string(),
            host_pattern: r"(^|\.)bbc\.(com|co\.uk)$".to_string(),
            article_selector: Some("article [data-component=\"text-block\"], article".to_string()),
            remove_selectors: vec![
                "[data-component=\"links-block\"]".to_string(),
                "[data-component=\"tag-list\"]".to_string(),
                "[data-component=\"topic-list\"]".to_string(),
            ],
            remove_text_patterns: vec![],
            inline_selectors: vec![],
            prefer_structured_data: true,
            caption: Some(CaptionConfig {
                text_selector: "figcaption p".to_string(),
                credit_selector: None,
            }),
        },
        SiteConfig {
            name: "Ars Technica".to_string(),
            host_pattern: r"(^|\.)arstechnica\.com$".to_string(),
            article_selector: Some(".article-content".to_string()),
            remove_selectors: vec![".ars-interlude".to_string(), ".story-sidebar".to_string()],
            remove_text_patterns: vec![],
            inline_selectors: vec![".ars-abstract".to_string()],
            prefer_structured_data: false,
            caption: Some(CaptionConfig {
                text_selector: "figcaption .caption".to_string(),
                credit_selector: Some("figcaption .credit".to_string()),
            }),
        },
        SiteConfig {
            name: "Bloomberg".to_string(),
            host_pattern: r"(^|\.)bloomberg\.com$".to_string(),
            article_selector: Some(".body-content, .body-copy-v2".to_string()),
            remove_selectors: vec![".inline-newsletter".to_string(), ".page-ad".to_string()],
            remove_text_patterns: vec![],
            inline_selectors: vec![],
            prefer_structured_data: true,
            caption: None,
        },
    ]
}
