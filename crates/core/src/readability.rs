//! Article parsing: from raw HTML to [`ArticleContent`].
//!
//! The parse sequence is fixed: absolutize URLs, pre-clean, read metadata
//! from the *original* document (cleaning may remove metadata-bearing
//! elements), give a site extractor first refusal, gate on the
//! readability pre-check, run generic extraction, and only then fall back
//! to selector-based force extraction. Metadata merging follows one rule:
//! extractor fields win, generic metadata fills the gaps.

use url::Url;

use crate::article::ArticleContent;
use crate::clean::{CleanConfig, clean_html};
use crate::extract::{ExtractConfig, extract_content};
use crate::metadata::extract_metadata_with_options;
use crate::parse::Document;
use crate::scoring::{ScoreConfig, calculate_score};
use crate::selectors::GENERIC_CONTENT_SELECTORS;
use crate::siteconfig::{SiteConfig, SiteConfigTable};
use crate::sites::ExtractorRegistry;
use crate::{ExtractError, Result};

/// Per-parse options.
#[derive(Debug, Clone)]
pub struct ReadabilityOptions {
    /// Skip the readability-likelihood pre-check ("try anyway").
    pub skip_pre_check: bool,
    /// On empty generic extraction, fall back to selector-based extraction.
    pub force_parse: bool,
    /// Minimum text length a force-extraction candidate must exceed.
    pub force_min_text_len: usize,
    /// Score threshold for the pre-check.
    pub pre_check_threshold: f64,
}

impl Default for ReadabilityOptions {
    fn default() -> Self {
        Self {
            skip_pre_check: false,
            force_parse: true,
            force_min_text_len: 200,
            pre_check_threshold: 20.0,
        }
    }
}

/// Article parser with its cleaning, extraction, and site knowledge.
pub struct Readability {
    clean: CleanConfig,
    extract: ExtractConfig,
    registry: ExtractorRegistry,
    site_configs: SiteConfigTable,
}

impl Readability {
    /// Parser with default configuration and all built-in site support.
    pub fn new() -> Self {
        Self {
            clean: CleanConfig::default(),
            extract: ExtractConfig::default(),
            registry: ExtractorRegistry::with_defaults(),
            site_configs: SiteConfigTable::builtin(),
        }
    }

    /// Parser with explicit configuration.
    pub fn with_config(
        clean: CleanConfig, extract: ExtractConfig, registry: ExtractorRegistry,
        site_configs: SiteConfigTable,
    ) -> Self {
        Self { clean, extract, registry, site_configs }
    }

    /// Parses a fetched page into an article.
    ///
    /// `url` must be the final URL after redirects; all relative URLs in
    /// the page resolve against it.
    pub fn parse_article(
        &self, html: &str, url: &str, options: &ReadabilityOptions,
    ) -> Result<ArticleContent> {
        let base_url = Url::parse(url).map_err(|e| ExtractError::InvalidUrl(e.to_string()))?;

        // the DOM layer does not resolve relative URLs itself
        let absolutized = absolutize_urls(html, &base_url);

        let site_config = base_url
            .host_str()
            .and_then(|host| self.site_configs.lookup(host));

        let original_doc = Document::parse_with_url(&absolutized, base_url.clone());
        let metadata = extract_metadata_with_options(
            &original_doc,
            Some(&base_url),
            site_config.is_some_and(|c| c.prefer_structured_data),
        );

        // site extractors get first refusal; their failure is recovered as
        // "no extractor available" inside try_extract
        if let Some(result) = self.registry.try_extract(&original_doc, &base_url) {
            let mut merged = result.metadata.clone();
            merged.merge_missing_from(&metadata);

            let mut article = ArticleContent::new(result.content_html, Some(url.to_string()));
            if !article.is_empty() {
                article.title.clone_from(&merged.title);
                article.apply_metadata(&merged);
                return Ok(article);
            }
        }

        let cleaning = clean_html(&absolutized, &self.clean, site_config);
        tracing::debug!(
            removed = cleaning.removed_count,
            link_dense = cleaning.link_dense_removed,
            lazy_images = cleaning.lazy_images_resolved,
            structured = cleaning.structured_article_found,
            "pre-clean finished"
        );
        let cleaned_doc = Document::parse_with_url(&cleaning.html, base_url.clone());

        if !options.skip_pre_check {
            let score = readability_score(&cleaned_doc);
            if score < options.pre_check_threshold {
                return Err(ExtractError::NotReadable {
                    score,
                    threshold: options.pre_check_threshold,
                });
            }
        }

        let content = match extract_content(&cleaned_doc, &self.extract) {
            Ok(extracted) => extracted.content,
            Err(err) if options.force_parse => {
                match force_extract(&cleaned_doc, site_config, options.force_min_text_len) {
                    Some(content) => content,
                    None => return Err(err),
                }
            }
            Err(err) => return Err(err),
        };

        let mut article = ArticleContent::new(content, Some(url.to_string()));
        if article.is_empty() {
            return Err(ExtractError::EmptyContent);
        }
        article.apply_metadata(&metadata);

        Ok(article)
    }

    /// Quick readability-likelihood check without full extraction.
    pub fn is_probably_readable(&self, html: &str, threshold: f64) -> bool {
        readability_score(&Document::parse(html)) >= threshold
    }
}

impl Default for Readability {
    fn default() -> Self {
        Self::new()
    }
}

/// Best element score over the usual content containers. Elements with
/// less than 25 characters of text don't count.
fn readability_score(doc: &Document) -> f64 {
    let score_config = ScoreConfig::default();
    let mut max_score: f64 = 0.0;

    for tag in &["p", "div", "article", "section"] {
        let Ok(elements) = doc.select(tag) else { continue };
        for element in elements {
            if element.text().chars().count() < 25 {
                continue;
            }
            let score = calculate_score(&element, &score_config).final_score;
            if score > max_score {
                max_score = score;
            }
        }
    }

    max_score
}

/// Selector-based fallback when generic extraction comes up empty: the
/// site's configured article selector first, then the generic content
/// containers, first candidate with enough text wins.
fn force_extract(
    doc: &Document, site_config: Option<&SiteConfig>, min_text_len: usize,
) -> Option<String> {
    let mut selectors: Vec<&str> = Vec::new();
    if let Some(article_selector) = site_config.and_then(|c| c.article_selector.as_deref()) {
        selectors.push(article_selector);
    }
    selectors.extend(GENERIC_CONTENT_SELECTORS);

    for selector in selectors {
        let Ok(elements) = doc.select(selector) else { continue };
        for element in elements {
            if element.text().chars().count() > min_text_len {
                tracing::debug!(selector, "force extraction matched");
                return Some(element.outer_html());
            }
        }
    }

    None
}

/// Rewrites relative `href`/`src`/`srcset` attributes to absolute URLs.
pub(crate) fn absolutize_urls(html: &str, base: &Url) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("a[href]", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && !href.starts_with('#')
                        && let Ok(absolute) = base.join(&href)
                    {
                        el.set_attribute("href", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
                lol_html::element!("link[href]", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && let Ok(absolute) = base.join(&href)
                    {
                        el.set_attribute("href", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
                lol_html::element!("img", |el| {
                    if let Some(src) = el.get_attribute("src")
                        && let Ok(absolute) = base.join(&src)
                    {
                        el.set_attribute("src", absolute.as_str()).ok();
                    }
                    if let Some(srcset) = el.get_attribute("srcset") {
                        el.set_attribute("srcset", &absolutize_srcset(&srcset, base)).ok();
                    }
                    Ok(())
                }),
                lol_html::element!("source[srcset]", |el| {
                    if let Some(srcset) = el.get_attribute("srcset") {
                        el.set_attribute("srcset", &absolutize_srcset(&srcset, base)).ok();
                    }
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| output.push_str(&String::from_utf8_lossy(c)),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }
    if output.is_empty() { html.to_string() } else { output }
}

/// Rewrites each URL entry of a `srcset` value, keeping the descriptors.
fn absolutize_srcset(srcset: &str, base: &Url) -> String {
    srcset
        .split(',')
        .map(|entry| {
            let entry = entry.trim();
            let mut parts = entry.splitn(2, char::is_whitespace);
            let url = parts.next().unwrap_or_default();
            let descriptor = parts.next().unwrap_or_default().trim();
            let absolute = base
                .join(url)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| url.to_string());
            if descriptor.is_empty() { absolute } else { format!("{absolute} {descriptor}") }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience wrapper: parse with default configuration.
pub fn parse_article(html: &str, url: &str, options: &ReadabilityOptions) -> Result<ArticleContent> {
    Readability::new().parse_article(html, url, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <title>Test Article | Example Site</title>
            <meta property="og:site_name" content="Example Site">
            <meta name="author" content="Test Author">
            <meta property="og:image" content="/hero.jpg">
        </head>
        <body>
            <div class="sidebar"><a href="/a">One</a><a href="/b">Two</a></div>
            <article class="post-content">
                <h1>Article Title</h1>
                <p>This is a long paragraph with plenty of content to pass the scoring
                thresholds, with commas, with clauses, and with enough characters to
                be treated as real article prose by the extraction heuristics.</p>
                <p>Another substantial paragraph with meaningful sentences, several
                commas, and a <a href="/relative/link">relative link</a> that should
                become absolute during parsing.</p>
            </article>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_article_end_to_end() {
        let article =
            parse_article(ARTICLE_HTML, "https://example.com/post", &ReadabilityOptions::default())
                .unwrap();

        assert_eq!(article.title, Some("Test Article".to_string()));
        assert_eq!(article.author, Some("Test Author".to_string()));
        assert!(article.content_html.contains("long paragraph"));
        assert!(!article.content_html.contains("sidebar"));
        assert!(!article.is_empty());
        assert_eq!(article.image, Some("https://example.com/hero.jpg".to_string()));
    }

    #[test]
    fn test_relative_links_absolutized() {
        let article =
            parse_article(ARTICLE_HTML, "https://example.com/post", &ReadabilityOptions::default())
                .unwrap();
        assert!(article.content_html.contains("https://example.com/relative/link"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = parse_article(ARTICLE_HTML, "not a url", &ReadabilityOptions::default());
        assert!(matches!(result, Err(ExtractError::InvalidUrl(_))));
    }

    #[test]
    fn test_nav_page_not_readable() {
        let html = r#"
            <html><body>
                <nav><a href="/1">One</a><a href="/2">Two</a><a href="/3">Three</a></nav>
            </body></html>
        "#;
        let result = parse_article(html, "https://example.com/", &ReadabilityOptions::default());
        assert!(matches!(result, Err(ExtractError::NotReadable { .. })));
    }

    #[test]
    fn test_skip_pre_check_reaches_extraction() {
        let html = r#"
            <html><body>
                <nav><a href="/1">One</a></nav>
            </body></html>
        "#;
        let options = ReadabilityOptions { skip_pre_check: true, ..Default::default() };
        let result = parse_article(html, "https://example.com/", &options);
        // still fails, but past the pre-check
        assert!(matches!(
            result,
            Err(ExtractError::EmptyContent) | Err(ExtractError::NotReadable { .. })
        ));
    }

    #[test]
    fn test_force_extraction_via_generic_selector() {
        // bare <main> with comma-free prose scores below the extraction
        // threshold; force extraction recovers it via the generic selectors
        let prose = "Plain sentence without punctuation or much else going on here ".repeat(16);
        let html = format!(r#"<html><body><main>{prose}</main></body></html>"#);
        let options = ReadabilityOptions { skip_pre_check: true, ..Default::default() };

        let article = parse_article(&html, "https://example.com/x", &options).unwrap();
        assert!(article.text_content.contains("Plain sentence without punctuation"));

        // without force_parse the same page is an error
        let strict = ReadabilityOptions {
            skip_pre_check: true,
            force_parse: false,
            ..Default::default()
        };
        assert!(parse_article(&html, "https://example.com/x", &strict).is_err());
    }

    #[test]
    fn test_site_extractor_takes_precedence() {
        let html = r#"
            <html><body>
            <table class="fatitem">
                <tr class="athing"><td>
                    <span class="titleline"><a href="https://example.com/p">HN Story</a></span>
                </td></tr>
            </table>
            <table class="comment-tree">
            <tr class="athing comtr">
                <td class="ind"><img width="0"></td>
                <td><a class="hnuser">alice</a>
                <div class="commtext"><p>A comment with enough text to register.</p></div></td>
            </tr>
            </table>
            </body></html>
        "#;
        let article = parse_article(
            html,
            "https://news.ycombinator.com/item?id=1",
            &ReadabilityOptions::default(),
        )
        .unwrap();
        assert_eq!(article.title, Some("HN Story".to_string()));
        assert_eq!(article.site_name, Some("Hacker News".to_string()));
        assert!(article.content_html.contains("blockquote"));
    }

    #[test]
    fn test_absolutize_srcset() {
        let base = Url::parse("https://example.com/a/").unwrap();
        let rewritten = absolutize_srcset("img1.jpg 1x, /img2.jpg 2x", &base);
        assert_eq!(
            rewritten,
            "https://example.com/a/img1.jpg 1x, https://example.com/img2.jpg 2x"
        );
    }

    #[test]
    fn test_hash_links_left_alone() {
        let base = Url::parse("https://example.com/post").unwrap();
        let html = r##"<a href="#section">jump</a>"##;
        let rewritten = absolutize_urls(html, &base);
        assert!(rewritten.contains(r##"href="#section""##));
    }
}
