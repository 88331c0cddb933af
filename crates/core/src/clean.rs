//! Boilerplate removal ahead of content extraction.
//!
//! The cleaner runs a fixed sequence of passes over the document:
//! site-config rewrites and removals, protected-set computation, the
//! negative-selector catalog walk, a link-density sweep, and lazy-image
//! resolution. The protected set is computed before any generic removal so
//! that article content matching a negative pattern (say, a body whose
//! class contains "share") survives intact.
//!
//! Structural removal detaches real tree nodes via `scraper`; attribute and
//! tag rewrites stream through `lol_html`.

use std::cell::Cell;
use std::collections::HashSet;

use regex::Regex;
use ego_tree::NodeId;
use scraper::{Html, Selector};

use crate::selectors::{
    LAZY_SRC_ATTRIBUTES, NEGATIVE_SELECTORS, PLACEHOLDER_SRC_PATTERNS, PROTECTED_SELECTORS,
    STRUCTURED_ARTICLE_SELECTORS,
};
use crate::siteconfig::SiteConfig;

/// Tunable thresholds for the cleaning passes.
///
/// The defaults are carried over from heuristic tuning; they are exposed as
/// configuration rather than constants because nothing proves them optimal.
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// Link density above which an element is removed unconditionally.
    pub max_link_density: f64,
    /// Link density above which an element is removed when it also looks
    /// like navigation (tag or class/id heuristics).
    pub nav_link_density: f64,
    /// Minimum text length before the link-density pass considers an element.
    pub min_text_length: usize,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self { max_link_density: 0.5, nav_link_density: 0.25, min_text_length: 50 }
    }
}

/// Diagnostic report of one cleaning run. The `html` field is the product;
/// the counters only feed logs and verbose output.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    /// The cleaned document.
    pub html: String,
    /// Elements removed by site-config and negative-catalog passes.
    pub removed_count: usize,
    /// `<img>` elements whose lazy-load source was promoted.
    pub lazy_images_resolved: usize,
    /// Elements removed by the link-density pass.
    pub link_dense_removed: usize,
    /// Whether a structured article container was present.
    pub structured_article_found: bool,
    /// Whether a site configuration was applied.
    pub site_config_applied: bool,
}

/// Cleans a document for extraction.
///
/// Pass order is load-bearing: site config first (explicit, trusted),
/// then protection, then the generic removal passes, then lazy images.
pub fn clean_html(html: &str, config: &CleanConfig, site_config: Option<&SiteConfig>) -> CleaningResult {
    let rewritten = match site_config {
        Some(site) => apply_siteconfig_rewrites(html, site),
        None => html.to_string(),
    };

    let mut doc = Html::parse_document(&rewritten);
    let structured_article_found = detect_structured_article(&doc);

    let mut removed_count = 0;
    if let Some(site) = site_config {
        removed_count += apply_siteconfig_removals(&mut doc, site);
    }

    let protected = build_protected_set(&doc, site_config);
    removed_count += remove_negative_matches(&mut doc, &protected);
    let link_dense_removed = remove_link_dense(&mut doc, &protected, config);

    let (html, lazy_images_resolved) = resolve_lazy_images(&doc.html());

    CleaningResult {
        html,
        removed_count,
        lazy_images_resolved,
        link_dense_removed,
        structured_article_found,
        site_config_applied: site_config.is_some(),
    }
}

fn detect_structured_article(doc: &Html) -> bool {
    STRUCTURED_ARTICLE_SELECTORS.iter().any(|s| {
        Selector::parse(s)
            .map(|sel| doc.select(&sel).next().is_some())
            .unwrap_or(false)
    })
}

/// Block-to-inline conversion and caption formatting, streamed through
/// lol_html before the document is parsed for structural work.
fn apply_siteconfig_rewrites(html: &str, site: &SiteConfig) -> String {
    if site.inline_selectors.is_empty() && site.caption.is_none() {
        return html.to_string();
    }

    use lol_html::html_content::ContentType;

    let mut handlers = Vec::new();

    for sel in &site.inline_selectors {
        if !lol_selector_ok(sel) {
            continue;
        }
        handlers.push(lol_html::element!(sel.as_str(), |el| {
            // keeps attributes, so the class survives the rename
            el.set_tag_name("span")?;
            Ok(())
        }));
    }

    if let Some(caption) = &site.caption {
        if lol_selector_ok(&caption.text_selector) {
            handlers.push(lol_html::element!(caption.text_selector.as_str(), |el| {
                el.prepend("<em>", ContentType::Html);
                el.append("</em>", ContentType::Html);
                Ok(())
            }));
            handlers.push(lol_html::text!(caption.text_selector.as_str(), |t| {
                if t.last_in_text_node() {
                    let trimmed = t.as_str().trim_end();
                    if let Some(c) = trimmed.chars().last()
                        && c.is_alphanumeric()
                    {
                        t.after(".", ContentType::Text);
                    }
                }
                Ok(())
            }));
        }
        if let Some(credit) = &caption.credit_selector
            && lol_selector_ok(credit)
        {
            handlers.push(lol_html::element!(credit.as_str(), |el| {
                el.prepend(" ", ContentType::Text);
                Ok(())
            }));
        }
    }

    if handlers.is_empty() {
        return html.to_string();
    }

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| output.push_str(&String::from_utf8_lossy(c)),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }
    if output.is_empty() { html.to_string() } else { output }
}

/// Whether lol_html's selector parser accepts this selector; invalid ones
/// are skipped (with a warning) instead of aborting the pass.
fn lol_selector_ok(selector: &str) -> bool {
    let ok = selector.parse::<lol_html::Selector>().is_ok();
    if !ok {
        tracing::warn!(selector, "selector not supported by rewriter, skipping");
    }
    ok
}

fn apply_siteconfig_removals(doc: &mut Html, site: &SiteConfig) -> usize {
    let mut doomed: HashSet<NodeId> = HashSet::new();

    for sel in &site.remove_selectors {
        let Ok(parsed) = Selector::parse(sel) else {
            tracing::warn!(selector = %sel, "invalid site-config selector, skipping");
            continue;
        };
        doomed.extend(doc.select(&parsed).map(|el| el.id()));
    }

    for tp in &site.remove_text_patterns {
        let Ok(parsed) = Selector::parse(&tp.selector) else {
            continue;
        };
        let Ok(re) = Regex::new(&tp.pattern) else {
            tracing::warn!(pattern = %tp.pattern, "invalid site-config text pattern, skipping");
            continue;
        };
        doomed.extend(
            doc.select(&parsed)
                .filter(|el| re.is_match(el.text().collect::<String>().trim()))
                .map(|el| el.id()),
        );
    }

    detach_all(doc, &doomed)
}

/// Elements matching a protected selector, plus all their ancestors and
/// descendants. Single-set membership therefore answers both "is this
/// protected" and "does this have a protected ancestor".
fn build_protected_set(doc: &Html, site_config: Option<&SiteConfig>) -> HashSet<NodeId> {
    let mut protected = HashSet::new();

    let mut selectors: Vec<&str> = PROTECTED_SELECTORS.to_vec();
    if let Some(article_selector) = site_config.and_then(|s| s.article_selector.as_deref()) {
        selectors.push(article_selector);
    }

    for sel in selectors {
        let Ok(parsed) = Selector::parse(sel) else { continue };
        for el in doc.select(&parsed) {
            protected.insert(el.id());
            protected.extend(el.ancestors().map(|n| n.id()));
            protected.extend(el.descendants().map(|n| n.id()));
        }
    }

    protected
}

fn remove_negative_matches(doc: &mut Html, protected: &HashSet<NodeId>) -> usize {
    let mut doomed: HashSet<NodeId> = HashSet::new();

    for sel in NEGATIVE_SELECTORS {
        let Ok(parsed) = Selector::parse(sel) else { continue };
        doomed.extend(
            doc.select(&parsed)
                .map(|el| el.id())
                .filter(|id| !protected.contains(id)),
        );
    }

    detach_all(doc, &doomed)
}

/// Removes containers dominated by link text.
///
/// Elements above `max_link_density` go unconditionally; elements in the
/// middle band only when tag or class/id suggests navigation. Hash-only
/// anchors don't count as link text (in-page footnote/TOC markers).
fn remove_link_dense(doc: &mut Html, protected: &HashSet<NodeId>, config: &CleanConfig) -> usize {
    let Ok(candidates) = Selector::parse("div, section, aside, ul") else {
        return 0;
    };
    let Ok(anchors) = Selector::parse("a") else { return 0 };

    let mut doomed: HashSet<NodeId> = HashSet::new();

    for el in doc.select(&candidates) {
        if protected.contains(&el.id()) || doomed.contains(&el.id()) {
            continue;
        }

        let text = el.text().collect::<String>();
        let text_len = text.chars().count();
        if text_len < config.min_text_length {
            continue;
        }

        let link_len: usize = el
            .select(&anchors)
            .filter(|a| {
                a.value()
                    .attr("href")
                    .is_some_and(|href| !href.starts_with('#'))
            })
            .map(|a| a.text().collect::<String>().chars().count())
            .sum();

        let density = link_len as f64 / text_len as f64;

        if density > config.max_link_density {
            doomed.insert(el.id());
        } else if density > config.nav_link_density && looks_like_navigation(&el) {
            doomed.insert(el.id());
        }
    }

    detach_all(doc, &doomed)
}

fn looks_like_navigation(el: &scraper::ElementRef<'_>) -> bool {
    let tag = el.value().name();
    if tag == "ul" || tag == "aside" {
        return true;
    }

    let hints = ["menu", "nav", "links"];
    let class = el.value().attr("class").unwrap_or_default().to_lowercase();
    let id = el.value().attr("id").unwrap_or_default().to_lowercase();
    hints.iter().any(|h| class.contains(h) || id.contains(h))
}

fn detach_all(doc: &mut Html, ids: &HashSet<NodeId>) -> usize {
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(*id) {
            node.detach();
        }
    }
    ids.len()
}

/// Promotes lazy-load sources on images whose `src` is empty, a data URI,
/// or a known placeholder.
fn resolve_lazy_images(html: &str) -> (String, usize) {
    let resolved = Cell::new(0usize);

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("img", |el| {
                let src = el.get_attribute("src").unwrap_or_default();
                if !is_placeholder_src(&src) {
                    return Ok(());
                }
                for attr in LAZY_SRC_ATTRIBUTES {
                    if let Some(value) = el.get_attribute(attr)
                        && !value.trim().is_empty()
                    {
                        let target = if attr.contains("srcset") { "srcset" } else { "src" };
                        el.set_attribute(target, &value)?;
                        resolved.set(resolved.get() + 1);
                        break;
                    }
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| output.push_str(&String::from_utf8_lossy(c)),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return (html.to_string(), 0);
    }
    if output.is_empty() {
        return (html.to_string(), 0);
    }

    (output, resolved.get())
}

fn is_placeholder_src(src: &str) -> bool {
    let s = src.trim();
    if s.is_empty() || s.starts_with("data:") {
        return true;
    }
    let lower = s.to_lowercase();
    PLACEHOLDER_SRC_PATTERNS.iter().any(|p| lower.contains(p))
}
