//! The pipeline's terminal artifact.
//!
//! [`ArticleContent`] carries the extracted content in both HTML and plain
//! text, the reconciled metadata, and — when a bypass produced the page —
//! the provenance of the copy the reader is actually looking at.

use serde::Serialize;

use crate::bypass::StrategySource;
use crate::markdown::{MarkdownOptions, MarkdownResult, format_markdown};
use crate::metadata::ExtractedMetadata;
use crate::parse::Document;
use crate::Result;

/// Where a bypassed page came from; shown to the reader as provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSource {
    /// The strategy that produced the page.
    pub service: StrategySource,
    /// Snapshot URL, for archive-service strategies.
    pub url: Option<String>,
    /// Snapshot timestamp as reported by the service.
    pub timestamp: Option<String>,
}

/// A fully extracted article.
///
/// Invariant: `text_content` is derived from `content_html` by tag
/// stripping and is non-empty for any article the pipeline returns —
/// an empty extraction is an error, never a zero-length success.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleContent {
    /// Article title.
    pub title: Option<String>,
    /// Extracted content as clean HTML.
    pub content_html: String,
    /// Plain-text rendering of `content_html`.
    pub text_content: String,
    /// Short excerpt or description of the content.
    pub excerpt: Option<String>,
    /// Byline as printed on the page.
    pub byline: Option<String>,
    /// Publishing site name.
    pub site_name: Option<String>,
    /// Author from metadata.
    pub author: Option<String>,
    /// Publication date from metadata.
    pub published: Option<String>,
    /// Lead image URL.
    pub image: Option<String>,
    /// Page description from metadata.
    pub description: Option<String>,
    /// Site favicon URL.
    pub favicon: Option<String>,
    /// Length of the plain text in characters.
    pub length: usize,
    /// Word count of the plain text.
    pub word_count: usize,
    /// The URL the article was requested from.
    pub source_url: Option<String>,
    /// Set when a bypass strategy supplied the page.
    pub archive_source: Option<ArchiveSource>,
}

impl ArticleContent {
    /// Builds an article from content HTML, deriving the text metrics.
    pub fn new(content_html: String, source_url: Option<String>) -> Self {
        let text_content = html_to_text(&content_html);
        let length = text_content.chars().count();
        let word_count = count_words(&text_content);

        Self {
            title: None,
            content_html,
            text_content,
            excerpt: None,
            byline: None,
            site_name: None,
            author: None,
            published: None,
            image: None,
            description: None,
            favicon: None,
            length,
            word_count,
            source_url,
            archive_source: None,
        }
    }

    /// Fills metadata-derived fields that are still unset.
    ///
    /// Author, published date, image, description, and favicon always come
    /// from metadata; title, excerpt, and site name only when the
    /// extraction didn't supply them.
    pub fn apply_metadata(&mut self, metadata: &ExtractedMetadata) {
        if self.title.is_none() {
            self.title.clone_from(&metadata.title);
        }
        if self.excerpt.is_none() {
            self.excerpt.clone_from(&metadata.description);
        }
        if self.site_name.is_none() {
            self.site_name.clone_from(&metadata.site_name);
        }
        if self.byline.is_none() {
            self.byline.clone_from(&metadata.author);
        }
        self.author.clone_from(&metadata.author);
        self.published.clone_from(&metadata.published);
        self.image.clone_from(&metadata.image);
        self.description.clone_from(&metadata.description);
        self.favicon.clone_from(&metadata.favicon);
    }

    /// Whether the extraction produced no usable text.
    pub fn is_empty(&self) -> bool {
        self.text_content.trim().is_empty()
    }

    /// Renders the article as Markdown with default options (hero image
    /// from metadata, archive annotation when provenance is present).
    pub fn to_markdown(&self) -> Result<MarkdownResult> {
        let options = MarkdownOptions {
            hero_image: self.image.clone(),
            archive_annotation: self.archive_annotation(),
        };
        self.to_markdown_with_options(&options)
    }

    /// Renders the article as Markdown with explicit options.
    pub fn to_markdown_with_options(&self, options: &MarkdownOptions) -> Result<MarkdownResult> {
        format_markdown(self.title.as_deref().unwrap_or(""), &self.content_html, options)
    }

    /// Serializes the whole article as a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| crate::ExtractError::HtmlParse(e.to_string()))
    }

    /// Human-readable provenance line, when the page came through a bypass.
    pub fn archive_annotation(&self) -> Option<String> {
        let source = self.archive_source.as_ref()?;
        let label = match source.service {
            StrategySource::GooglebotUa | StrategySource::BingbotUa => "crawler identity",
            StrategySource::SocialReferrer => "social referrer",
            StrategySource::MinimalRefetch => "minimal headers",
            StrategySource::ArchiveToday => "archive.today",
            StrategySource::Wayback => "Wayback Machine",
            StrategySource::BrowserTab => "open browser tab",
            StrategySource::None => return None,
        };
        Some(match &source.timestamp {
            Some(ts) => format!("Retrieved via {label} (snapshot {ts})"),
            None => format!("Retrieved via {label}"),
        })
    }
}

/// Strips tags by parsing and collecting text nodes.
fn html_to_text(html: &str) -> String {
    let doc = Document::parse(html);
    let mut text = doc.text_content();
    // parsing fragments yields runs of whitespace where tags were
    if text.contains('\u{a0}') {
        text = text.replace('\u{a0}', " ");
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
