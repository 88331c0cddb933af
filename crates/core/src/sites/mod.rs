//! Site-specific content extraction.
//!
//! Some page families carry their content in structures the generic
//! readability pass handles poorly — threaded comment trees, issue
//! timelines, repository READMEs. Each [`SiteExtractor`] handles one such
//! family, building content HTML straight from the DOM. The registry
//! dispatches by hostname plus a per-page `can_extract` probe; a failing
//! extractor falls back to generic extraction, never aborts the pipeline.

mod github;
mod hackernews;
mod reddit;

pub use github::GitHubExtractor;
pub use hackernews::HackerNewsExtractor;
pub use reddit::RedditExtractor;

use url::Url;

use crate::metadata::ExtractedMetadata;
use crate::parse::Document;
use crate::Result;

/// Content produced by a site extractor. Its metadata fields win over
/// generically extracted metadata on merge.
#[derive(Debug, Clone)]
pub struct ExtractorResult {
    /// The article/thread content as HTML.
    pub content_html: String,
    /// Metadata the extractor could determine directly.
    pub metadata: ExtractedMetadata,
}

/// Capability interface for one supported site family.
pub trait SiteExtractor: Send + Sync {
    /// Short identifier for logs and provenance.
    fn site_name(&self) -> &'static str;

    /// Whether this extractor handles pages on the given hostname.
    fn matches(&self, host: &str) -> bool;

    /// Whether this particular page has the structure the extractor needs.
    /// Hostname match alone is not enough — a profile page on a forum site
    /// should fall through to generic extraction.
    fn can_extract(&self, doc: &Document) -> bool;

    /// Builds content from the page DOM.
    fn extract(&self, doc: &Document, url: &Url) -> Result<ExtractorResult>;
}

/// Ordered registry of site extractors; first match wins.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn SiteExtractor>>,
}

impl ExtractorRegistry {
    /// Registry with all built-in extractors.
    pub fn with_defaults() -> Self {
        Self {
            extractors: vec![
                Box::new(HackerNewsExtractor),
                Box::new(RedditExtractor),
                Box::new(GitHubExtractor),
            ],
        }
    }

    /// Empty registry (generic extraction only).
    pub fn empty() -> Self {
        Self { extractors: Vec::new() }
    }

    /// First extractor whose hostname matches and whose probe accepts the
    /// page, if any.
    pub fn get(&self, doc: &Document, url: &Url) -> Option<&dyn SiteExtractor> {
        let host = url.host_str()?;
        self.extractors
            .iter()
            .map(|e| e.as_ref())
            .find(|e| e.matches(host) && e.can_extract(doc))
    }

    /// Runs the matching extractor, recovering its failure as "no extractor".
    pub fn try_extract(&self, doc: &Document, url: &Url) -> Option<ExtractorResult> {
        let extractor = self.get(doc, url)?;
        match extractor.extract(doc, url) {
            Ok(result) if !result.content_html.trim().is_empty() => {
                tracing::debug!(site = extractor.site_name(), "site extractor produced content");
                Some(result)
            }
            Ok(_) => {
                tracing::debug!(site = extractor.site_name(), "site extractor returned empty content");
                None
            }
            Err(e) => {
                tracing::warn!(site = extractor.site_name(), "site extractor failed: {e}");
                None
            }
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// One comment in a flattened thread, ready for tree reconstruction.
#[derive(Debug, Clone)]
pub(crate) struct CommentNode {
    /// Nesting depth; 0 is a top-level comment.
    pub depth: usize,
    /// Comment author, when known.
    pub author: Option<String>,
    /// Comment body as HTML.
    pub body_html: String,
}

/// Renders a flat, document-ordered comment list into nested blockquotes.
///
/// A comment at depth `d` sits inside `d + 1` blockquote levels; the open
/// blockquote stack is adjusted between consecutive comments.
pub(crate) fn render_comment_tree(comments: &[CommentNode]) -> String {
    let mut out = String::new();
    let mut open = 0usize;

    for comment in comments {
        let target = comment.depth + 1;
        while open > target {
            out.push_str("</blockquote>\n");
            open -= 1;
        }
        while open < target {
            out.push_str("<blockquote>\n");
            open += 1;
        }

        if let Some(author) = &comment.author {
            out.push_str(&format!("<p><strong>{author}</strong></p>\n"));
        }
        out.push_str(&comment.body_html);
        out.push('\n');
    }

    while open > 0 {
        out.push_str("</blockquote>\n");
        open -= 1;
    }

    out
}
