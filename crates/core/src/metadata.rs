//! Metadata extraction with ranked source reconciliation.
//!
//! Every field probes its sources in a fixed priority order and takes the
//! first non-empty value; partial values from lower-priority sources are
//! never merged in. The four source families are JSON-LD structured data,
//! Open Graph tags, Twitter Card tags, and plain meta tags with DOM
//! fallbacks. Absence of any field is normal, never an error.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::parse::Document;

/// Structured-data `@type` values recognized as article-like. When several
/// JSON-LD blocks are present, the first block with one of these types is
/// preferred; otherwise the first parseable block is used.
const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "BlogPosting",
    "WebPage",
    "Report",
    "ScholarlyArticle",
];

/// Maximum number of structured-data author names joined into the author field.
const MAX_AUTHORS: usize = 10;

/// Everything we can learn about a page without extracting its content.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub modified: Option<String>,
    pub site_name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub url: Option<String>,
    pub domain: Option<String>,
    /// The preferred JSON-LD block, kept for callers that need fields we
    /// don't reconcile.
    pub structured_data: Option<Value>,
}

impl ExtractedMetadata {
    /// Fills every `None` field from `other`, leaving present values alone.
    pub fn merge_missing_from(&mut self, other: &ExtractedMetadata) {
        fn fill(dst: &mut Option<String>, src: &Option<String>) {
            if dst.is_none() {
                dst.clone_from(src);
            }
        }
        fill(&mut self.title, &other.title);
        fill(&mut self.author, &other.author);
        fill(&mut self.published, &other.published);
        fill(&mut self.modified, &other.modified);
        fill(&mut self.site_name, &other.site_name);
        fill(&mut self.description, &other.description);
        fill(&mut self.image, &other.image);
        fill(&mut self.favicon, &other.favicon);
        fill(&mut self.url, &other.url);
        fill(&mut self.domain, &other.domain);
        if self.structured_data.is_none() {
            self.structured_data.clone_from(&other.structured_data);
        }
    }
}

/// Extracts metadata from a document with default source priorities.
pub fn extract_metadata(doc: &Document, base_url: Option<&Url>) -> ExtractedMetadata {
    extract_metadata_with_options(doc, base_url, false)
}

/// Extracts metadata, optionally promoting structured data above the Open
/// Graph/Twitter sources (per-site override).
pub fn extract_metadata_with_options(
    doc: &Document, base_url: Option<&Url>, prefer_structured_data: bool,
) -> ExtractedMetadata {
    let sd = preferred_structured_data(doc);

    let site_name = extract_site_name(doc, sd.as_ref());
    let title = extract_title(doc, sd.as_ref(), site_name.as_deref(), prefer_structured_data);
    let author = extract_author(doc, sd.as_ref());
    let published = extract_published(doc, sd.as_ref());
    let modified = extract_modified(doc, sd.as_ref());
    let description = extract_description(doc, sd.as_ref(), prefer_structured_data);
    let image = extract_image(doc, sd.as_ref(), base_url);
    let favicon = extract_favicon(doc, base_url);
    let url = extract_canonical_url(doc, base_url);
    let domain = url
        .as_deref()
        .and_then(|u| Url::parse(u).ok())
        .and_then(|u| u.host_str().map(|h| h.to_string()));

    ExtractedMetadata {
        title,
        author,
        published,
        modified,
        site_name,
        description,
        image,
        favicon,
        url,
        domain,
        structured_data: sd,
    }
}

/// All parseable JSON-LD blocks on the page, top-level arrays flattened.
fn structured_data_blocks(doc: &Document) -> Vec<Value> {
    let mut blocks = Vec::new();
    if let Ok(scripts) = doc.select(r#"script[type="application/ld+json"]"#) {
        for script in scripts {
            let raw = script.text();
            let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
                continue;
            };
            match value {
                Value::Array(items) => blocks.extend(items),
                other => blocks.push(other),
            }
        }
    }
    blocks
}

fn preferred_structured_data(doc: &Document) -> Option<Value> {
    let blocks = structured_data_blocks(doc);
    blocks
        .iter()
        .find(|b| has_article_type(b))
        .or_else(|| blocks.first())
        .cloned()
}

fn has_article_type(block: &Value) -> bool {
    match block.get("@type") {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

/// Meta tag content by `name` or `property` attribute.
fn meta_content(doc: &Document, attr: &str) -> Option<String> {
    for kind in ["name", "property"] {
        let selector = format!(r#"meta[{kind}="{attr}"]"#);
        if let Ok(elements) = doc.select(&selector)
            && let Some(el) = elements.first()
            && let Some(content) = el.attr("content")
        {
            if let Some(value) = non_empty(content) {
                return Some(value);
            }
        }
    }
    None
}

fn first_meta(doc: &Document, names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| meta_content(doc, n))
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn sd_str(sd: Option<&Value>, key: &str) -> Option<String> {
    sd.and_then(|v| v.get(key))
        .and_then(Value::as_str)
        .and_then(non_empty)
}

fn extract_title(
    doc: &Document, sd: Option<&Value>, site_name: Option<&str>, prefer_sd: bool,
) -> Option<String> {
    let from_sd = || sd_str(sd, "headline").or_else(|| sd_str(sd, "name"));
    let from_meta = || meta_content(doc, "og:title").or_else(|| meta_content(doc, "twitter:title"));

    let raw = if prefer_sd { from_sd().or_else(from_meta) } else { from_meta().or_else(from_sd) }
        .or_else(|| meta_content(doc, "title"))
        .or_else(|| doc.title())?;

    Some(match site_name {
        Some(site) => strip_site_name(&raw, site),
        None => raw,
    })
}

/// Removes a leading or trailing "Site Name" segment from a title,
/// tolerating the usual separators (`|`, `-`, `–`, `—`, `:`).
fn strip_site_name(title: &str, site_name: &str) -> String {
    let escaped = regex::escape(site_name);
    let separators = r"[|\-–—:]";

    let suffix = regex::Regex::new(&format!(r"(?i)\s*{separators}\s*{escaped}\s*$"));
    let prefix = regex::Regex::new(&format!(r"(?i)^\s*{escaped}\s*{separators}\s*"));

    let mut result = title.to_string();
    if let Ok(re) = suffix {
        result = re.replace(&result, "").to_string();
    }
    if let Ok(re) = prefix {
        result = re.replace(&result, "").to_string();
    }

    let trimmed = result.trim();
    if trimmed.is_empty() { title.to_string() } else { trimmed.to_string() }
}

fn extract_author(doc: &Document, sd: Option<&Value>) -> Option<String> {
    if let Some(author) = first_meta(
        doc,
        &["author", "article:author", "parsely-author", "sailthru.author", "DC.creator"],
    ) {
        return Some(author);
    }

    if let Some(author_value) = sd.and_then(|v| v.get("author")) {
        let mut names = Vec::new();
        collect_author_names(author_value, &mut names);
        names.dedup();
        if !names.is_empty() {
            names.truncate(MAX_AUTHORS);
            return Some(names.join(", "));
        }
    }

    let dom_selectors = [
        r#"[itemprop="author"]"#,
        r#"[rel="author"]"#,
        ".byline__name",
        ".author-name",
        ".byline",
    ];
    for selector in dom_selectors {
        if let Ok(elements) = doc.select(selector) {
            for el in elements.iter().take(3) {
                let text = el.text();
                let text = text.trim();
                if !text.is_empty() && text.len() < 100 {
                    return Some(text.to_string());
                }
            }
        }
    }

    meta_content(doc, "twitter:creator").map(|c| c.trim_start_matches('@').to_string())
}

fn collect_author_names(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if let Some(name) = non_empty(s)
                && !names.contains(&name)
            {
                names.push(name);
            }
        }
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(Value::as_str).and_then(|s| non_empty(s))
                && !names.contains(&name)
            {
                names.push(name);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_author_names(item, names);
            }
        }
        _ => {}
    }
}

fn extract_published(doc: &Document, sd: Option<&Value>) -> Option<String> {
    sd_str(sd, "datePublished")
        .or_else(|| sd_str(sd, "dateCreated"))
        .or_else(|| {
            first_meta(
                doc,
                &["article:published_time", "parsely-pub-date", "date", "DC.date.issued", "sailthru.date"],
            )
        })
        .or_else(|| {
            doc.select("time[datetime]")
                .ok()?
                .first()
                .and_then(|el| el.attr("datetime"))
                .and_then(non_empty)
        })
}

fn extract_modified(doc: &Document, sd: Option<&Value>) -> Option<String> {
    sd_str(sd, "dateModified")
        .or_else(|| first_meta(doc, &["article:modified_time", "og:updated_time"]))
}

fn extract_site_name(doc: &Document, sd: Option<&Value>) -> Option<String> {
    meta_content(doc, "og:site_name")
        .or_else(|| {
            sd.and_then(|v| v.get("publisher"))
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .and_then(non_empty)
        })
        .or_else(|| {
            sd.and_then(|v| v.get("isPartOf"))
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .and_then(non_empty)
        })
        .or_else(|| meta_content(doc, "application-name"))
        .or_else(|| meta_content(doc, "twitter:site").map(|s| s.trim_start_matches('@').to_string()))
}

fn extract_description(doc: &Document, sd: Option<&Value>, prefer_sd: bool) -> Option<String> {
    let from_sd = || sd_str(sd, "description");
    let from_meta =
        || meta_content(doc, "og:description").or_else(|| meta_content(doc, "twitter:description"));

    if prefer_sd { from_sd().or_else(from_meta) } else { from_meta().or_else(from_sd) }
        .or_else(|| meta_content(doc, "description"))
}

/// Structured-data `image` may be a URL string, an object with a nested
/// `url`, or an array of either.
fn value_to_image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).and_then(non_empty),
        Value::Array(items) => items.first().and_then(value_to_image_url),
        _ => None,
    }
}

fn extract_image(doc: &Document, sd: Option<&Value>, base_url: Option<&Url>) -> Option<String> {
    let raw = meta_content(doc, "og:image")
        .or_else(|| meta_content(doc, "twitter:image"))
        .or_else(|| sd.and_then(|v| v.get("image")).and_then(|i| value_to_image_url(i)))
        .or_else(|| {
            doc.select(r#"link[rel="image_src"]"#)
                .ok()?
                .first()
                .and_then(|el| el.attr("href"))
                .and_then(non_empty)
        })?;

    Some(resolve(&raw, base_url))
}

fn extract_favicon(doc: &Document, base_url: Option<&Url>) -> Option<String> {
    let icon_selectors = [
        r#"link[rel="icon"]"#,
        r#"link[rel="shortcut icon"]"#,
        r#"link[rel="apple-touch-icon"]"#,
    ];
    for selector in icon_selectors {
        if let Ok(elements) = doc.select(selector)
            && let Some(href) = elements.first().and_then(|el| el.attr("href")).and_then(non_empty)
        {
            return Some(resolve(&href, base_url));
        }
    }

    base_url.map(|base| {
        let mut origin = base.clone();
        origin.set_path("/favicon.ico");
        origin.set_query(None);
        origin.set_fragment(None);
        origin.to_string()
    })
}

fn extract_canonical_url(doc: &Document, base_url: Option<&Url>) -> Option<String> {
    meta_content(doc, "og:url")
        .or_else(|| {
            doc.select(r#"link[rel="canonical"]"#)
                .ok()?
                .first()
                .and_then(|el| el.attr("href"))
                .and_then(non_empty)
        })
        .map(|raw| resolve(&raw, base_url))
        .or_else(|| base_url.map(|u| u.to_string()))
}

fn resolve(raw: &str, base_url: Option<&Url>) -> String {
    match base_url {
        Some(base) => base.join(raw).map(|u| u.to_string()).unwrap_or_else(|_| raw.to_string()),
        None => raw.to_string(),
    }
}
