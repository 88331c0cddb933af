//! GitHub READMEs, issues, and pull requests.
//!
//! Repository roots contribute the rendered README; issue and pull-request
//! pages contribute the opening body plus the comment timeline. GitHub
//! renders Markdown server-side into `.markdown-body` containers, so the
//! content is already clean HTML.

use url::Url;

use crate::metadata::ExtractedMetadata;
use crate::parse::Document;
use crate::sites::{ExtractorResult, SiteExtractor};
use crate::Result;

pub struct GitHubExtractor;

/// The page sub-types this extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    Readme,
    Issue,
    PullRequest,
}

impl SiteExtractor for GitHubExtractor {
    fn site_name(&self) -> &'static str {
        "github"
    }

    fn matches(&self, host: &str) -> bool {
        host == "github.com" || host == "www.github.com"
    }

    fn can_extract(&self, doc: &Document) -> bool {
        page_kind(doc).is_some()
    }

    fn extract(&self, doc: &Document, url: &Url) -> Result<ExtractorResult> {
        let mut content = String::new();
        let mut metadata = ExtractedMetadata {
            url: Some(url.to_string()),
            site_name: Some("GitHub".to_string()),
            domain: Some("github.com".to_string()),
            ..Default::default()
        };

        match page_kind(doc) {
            Some(PageKind::Readme) => extract_readme(doc, &mut content, &mut metadata)?,
            Some(PageKind::Issue) | Some(PageKind::PullRequest) => {
                extract_discussion(doc, &mut content, &mut metadata)?;
            }
            None => {}
        }

        Ok(ExtractorResult { content_html: content, metadata })
    }
}

fn page_kind(doc: &Document) -> Option<PageKind> {
    if doc.select_first(".js-issue-title, [data-testid=\"issue-title\"]").is_some() {
        // PR pages share the issue header markup but carry a diff tab bar
        if doc.select_first(".pull-request-tab-content, #files_bucket").is_some() {
            return Some(PageKind::PullRequest);
        }
        return Some(PageKind::Issue);
    }
    if doc.select_first("#readme .markdown-body, article.markdown-body").is_some() {
        return Some(PageKind::Readme);
    }
    None
}

fn extract_readme(
    doc: &Document, content: &mut String, metadata: &mut ExtractedMetadata,
) -> Result<()> {
    if let Some(readme) = doc.select_first("#readme .markdown-body, article.markdown-body") {
        content.push_str(&readme.inner_html());
        content.push('\n');
    }

    // "owner/repo" from the repository header
    if let Some(name) = doc.select_first("strong[itemprop=\"name\"] a, .AppHeader-context-full") {
        let title = name.text().trim().to_string();
        if !title.is_empty() {
            metadata.title = Some(title);
        }
    }

    Ok(())
}

fn extract_discussion(
    doc: &Document, content: &mut String, metadata: &mut ExtractedMetadata,
) -> Result<()> {
    if let Some(title) = doc.select_first(".js-issue-title, [data-testid=\"issue-title\"]") {
        let text = title.text().trim().to_string();
        if !text.is_empty() {
            content.push_str(&format!("<h1>{text}</h1>\n"));
            metadata.title = Some(text);
        }
    }

    let bodies = doc.select(".timeline-comment .comment-body, [data-testid=\"comment-body\"]")?;
    let authors = doc.select(".timeline-comment .author, [data-testid=\"comment-author\"]")?;

    for (i, body) in bodies.iter().enumerate() {
        let author = authors.get(i).map(|a| a.text().trim().to_string()).filter(|a| !a.is_empty());

        if i == 0 {
            // the opening body is the article itself
            if let Some(author) = &author {
                metadata.author = Some(author.clone());
            }
            content.push_str(&body.inner_html());
            content.push('\n');
            continue;
        }

        if i == 1 {
            content.push_str("<h2>Comments</h2>\n");
        }
        content.push_str("<blockquote>\n");
        if let Some(author) = &author {
            content.push_str(&format!("<p><strong>{author}</strong></p>\n"));
        }
        content.push_str(&body.inner_html());
        content.push_str("\n</blockquote>\n");
    }

    Ok(())
}
