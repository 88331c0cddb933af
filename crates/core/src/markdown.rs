//! HTML-to-Markdown formatting.
//!
//! Conversion itself is `htmd`'s job; this module owns what surrounds it:
//! a pre-pass that strips non-content markup and italicizes figure
//! captions, and ordered post-conversion fixups that normalize image
//! syntax and neutralize stray square brackets (a downstream renderer
//! treats `[...]` outside links as math notation). Hero images are
//! de-duplicated against body images by filename before being prepended.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::{ExtractError, Result};

/// Options for one formatting run.
#[derive(Debug, Clone, Default)]
pub struct MarkdownOptions {
    /// Lead image to prepend; body images with the same filename are removed first.
    pub hero_image: Option<String>,
    /// Provenance line rendered in italics under the title
    /// (e.g. "Retrieved via Wayback Machine").
    pub archive_annotation: Option<String>,
}

/// A formatted article.
#[derive(Debug, Clone)]
pub struct MarkdownResult {
    /// The complete Markdown document.
    pub markdown: String,
    /// The title that was rendered.
    pub title: String,
}

/// Converts extracted content HTML to a Markdown document.
///
/// # Errors
///
/// [`ExtractError::MarkdownConversion`] when the conversion library fails;
/// callers are expected to fall back to the raw HTML rather than failing
/// the whole request.
pub fn format_markdown(
    title: &str, content_html: &str, options: &MarkdownOptions,
) -> Result<MarkdownResult> {
    let prepared = prepare_html(content_html);

    let converted = htmd::convert(&prepared)
        .map_err(|e| ExtractError::MarkdownConversion(e.to_string()))?;

    let mut body = postprocess_markdown(&converted);

    if let Some(hero) = &options.hero_image {
        body = remove_matching_images(&body, hero);
        body = format!("![]({hero})\n\n{}", body.trim_start());
    }

    let mut markdown = String::new();
    if !title.trim().is_empty() {
        markdown.push_str(&format!("# {}\n\n", title.trim()));
    }
    if let Some(annotation) = &options.archive_annotation {
        markdown.push_str(&format!("*{annotation}*\n\n"));
    }
    markdown.push_str(body.trim());
    markdown.push('\n');

    Ok(MarkdownResult { markdown, title: title.trim().to_string() })
}

/// Tags with no place in rendered article output.
const STRIP_TAGS: &[&str] = &[
    "script", "style", "nav", "aside", "form", "button", "input", "select", "textarea", "iframe",
    "noscript",
];

/// Strips non-content markup and italicizes captions before conversion.
fn prepare_html(html: &str) -> String {
    use lol_html::html_content::ContentType;

    let mut handlers = Vec::new();
    for tag in STRIP_TAGS {
        handlers.push(lol_html::element!(*tag, |el| {
            el.remove();
            Ok(())
        }));
    }
    for role in ["complementary", "navigation"] {
        let selector = format!("[role=\"{role}\"]");
        handlers.push(lol_html::element!(selector, |el| {
            el.remove();
            Ok(())
        }));
    }
    handlers.push(lol_html::element!("figcaption", |el| {
        el.prepend("<em>", ContentType::Html);
        el.append("</em>", ContentType::Html);
        Ok(())
    }));
    // multi-line captions become one italic run per line
    handlers.push(lol_html::element!("figcaption br", |el| {
        el.replace("</em><br><em>", ContentType::Html);
        Ok(())
    }));

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

/// Text fixups applied to the converted Markdown, in order.
fn postprocess_markdown(markdown: &str) -> String {
    let mut text = markdown.to_string();

    // the converter escapes literal brackets; the rewrite below wants the
    // bare characters
    text = text.replace("\\[", "[").replace("\\]", "]");

    text = collapse_linked_images(&text);
    text = strip_image_titles(&text);
    text = strip_image_alt_text(&text);
    text = unemphasize_bracketed(&text);
    text = rewrite_stray_brackets(&text);

    // collapse runs of blank lines left behind by removals
    static BLANKS: OnceLock<Regex> = OnceLock::new();
    let blanks = BLANKS.get_or_init(|| Regex::new(r"\n{3,}").unwrap_or_else(|_| Regex::new("$^").unwrap()));
    blanks.replace_all(&text, "\n\n").trim().to_string()
}

/// `[![alt](img)](link)` → `![alt](img)`: a photo wrapped in a link reads
/// better as a bare image.
fn collapse_linked_images(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\[(!\[[^\]]*\]\([^)]*\))\]\([^)]*\)").unwrap_or_else(|_| Regex::new("$^").unwrap())
    });
    re.replace_all(text, "$1").to_string()
}

/// `![alt](url "title")` → `![alt](url)`.
fn strip_image_titles(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"!\[([^\]]*)\]\(([^)"\s]+)\s+"[^"]*"\)"#).unwrap_or_else(|_| Regex::new("$^").unwrap())
    });
    re.replace_all(text, "![$1]($2)").to_string()
}

/// `![alt](url)` → `![](url)`: images are rendered by URL only.
fn strip_image_alt_text(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"!\[[^\]]*\]\(").unwrap_or_else(|_| Regex::new("$^").unwrap()));
    re.replace_all(text, "![](").to_string()
}

/// `*[text]*` / `_[text]_` → `[text]`: emphasis markers collide with the
/// bracket rewrite that follows.
fn unemphasize_bracketed(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"[*_]+(\[[^\]]*\])[*_]+").unwrap_or_else(|_| Regex::new("$^").unwrap())
    });
    re.replace_all(text, "$1").to_string()
}

/// Rewrites literal `[text]` (not part of a link or image) to `(text)`.
///
/// The regex crate has no lookaround, so link starts and image markers are
/// matched into capture groups and re-emitted untouched.
fn rewrite_stray_brackets(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(!?)\[([^\[\]]*)\](\()?").unwrap_or_else(|_| Regex::new("$^").unwrap())
    });

    re.replace_all(text, |caps: &Captures| {
        let is_image = !caps[1].is_empty();
        let is_link = caps.get(3).is_some();
        if is_image || is_link {
            caps[0].to_string()
        } else {
            format!("({})", &caps[2])
        }
    })
    .to_string()
}

/// Removes body images whose filename matches the hero image's.
///
/// Comparison uses the last path segment, case-insensitive, ignoring query
/// strings, so the same photo served from a CDN variant still matches.
fn remove_matching_images(text: &str, hero_url: &str) -> String {
    let Some(hero_name) = image_filename(hero_url) else {
        return text.to_string();
    };

    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"!\[[^\]]*\]\(([^)]+)\)").unwrap_or_else(|_| Regex::new("$^").unwrap())
    });

    re.replace_all(text, |caps: &Captures| {
        match image_filename(&caps[1]) {
            Some(name) if name == hero_name => String::new(),
            _ => caps[0].to_string(),
        }
    })
    .to_string()
}

fn image_filename(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query.rsplit('/').next()?.trim().to_lowercase();
    if segment.is_empty() { None } else { Some(segment) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(html: &str) -> String {
        format_markdown("Title", html, &MarkdownOptions::default())
            .unwrap()
            .markdown
    }

    #[test]
    fn test_basic_conversion() {
        let md = format("<h2>Section</h2><p>A <strong>bold</strong> claim.</p>");
        assert!(md.starts_with("# Title\n"));
        assert!(md.contains("## Section"));
        assert!(md.contains("**bold**"));
    }

    #[test]
    fn test_scripts_and_styles_never_leak() {
        let md = format(
            "<p>Text</p><script>alert('x');</script><style>p{color:red}</style><nav><a href=\"/x\">nav</a></nav>",
        );
        assert!(!md.contains("alert"));
        assert!(!md.contains("color:red"));
        assert!(!md.contains("nav"));
    }

    #[test]
    fn test_role_attributes_stripped() {
        let md = format(r#"<p>Keep</p><div role="complementary">Drop this</div>"#);
        assert!(md.contains("Keep"));
        assert!(!md.contains("Drop this"));
    }

    #[test]
    fn test_image_alt_and_title_stripped() {
        let md = format(r#"<p><img src="https://e.com/pic.jpg" alt="A photo" title="hover"></p>"#);
        assert!(md.contains("![](https://e.com/pic.jpg)"));
        assert!(!md.contains("A photo"));
        assert!(!md.contains("hover"));
    }

    #[test]
    fn test_linked_image_collapsed() {
        let md = format(r#"<a href="https://e.com/full"><img src="https://e.com/pic.jpg"></a>"#);
        assert!(md.contains("![](https://e.com/pic.jpg)"));
        assert!(!md.contains("(https://e.com/full)"));
    }

    #[test]
    fn test_stray_brackets_rewritten() {
        let md = format("<p>As noted [by experts] this holds. See [1].</p>");
        assert!(md.contains("(by experts)"));
        assert!(md.contains("(1)"));
        assert!(!md.contains("[by experts]"));
    }

    #[test]
    fn test_real_links_survive_bracket_rewrite() {
        let md = format(r#"<p><a href="https://e.com/x">the report</a> says so.</p>"#);
        assert!(md.contains("[the report](https://e.com/x)"));
    }

    #[test]
    fn test_no_unescaped_brackets_outside_links() {
        let md = format("<p>Raw [math] and a <a href=\"https://e.com\">[bracketed link text]</a>.</p>");
        // every remaining `[` must start a link or image
        let re = Regex::new(r"(!?)\[[^\]]*\](\()?").unwrap();
        for caps in re.captures_iter(&md) {
            assert!(
                !caps[1].is_empty() || caps.get(2).is_some(),
                "stray bracket in output: {}",
                &caps[0]
            );
        }
    }

    #[test]
    fn test_figcaption_italicized() {
        let md = format(
            r#"<figure><img src="https://e.com/p.jpg"><figcaption>A city street</figcaption></figure>"#,
        );
        assert!(md.contains("*A city street*") || md.contains("_A city street_"));
    }

    #[test]
    fn test_multiline_caption_split_into_italic_lines() {
        let md = format(
            r#"<figure><figcaption>First line<br>Second line</figcaption></figure>"#,
        );
        assert!(md.contains("*First line*") || md.contains("_First line_"));
        assert!(md.contains("*Second line*") || md.contains("_Second line_"));
    }

    #[test]
    fn test_hero_image_prepended() {
        let options = MarkdownOptions {
            hero_image: Some("https://e.com/hero.jpg".to_string()),
            ..Default::default()
        };
        let result = format_markdown("T", "<p>Body</p>", &options).unwrap();
        let after_title = result.markdown.strip_prefix("# T\n\n").unwrap();
        assert!(after_title.starts_with("![](https://e.com/hero.jpg)"));
    }

    #[test]
    fn test_hero_deduplicates_body_image() {
        let options = MarkdownOptions {
            hero_image: Some("https://cdn.e.com/images/Hero.JPG?w=1200".to_string()),
            ..Default::default()
        };
        let html = r#"<p><img src="https://e.com/uploads/hero.jpg"></p><p>Body</p>"#;
        let result = format_markdown("T", html, &options).unwrap();
        assert_eq!(result.markdown.matches("![](").count(), 1);
    }

    #[test]
    fn test_hero_prepend_is_idempotent() {
        let options = MarkdownOptions {
            hero_image: Some("https://e.com/hero.jpg".to_string()),
            ..Default::default()
        };
        let first = format_markdown("T", "<p>Body</p>", &options).unwrap();

        // round-trip the produced body back through formatting
        let as_html = "<p><img src=\"https://e.com/hero.jpg\"></p><p>Body</p>";
        let second = format_markdown("T", as_html, &options).unwrap();
        assert_eq!(second.markdown.matches("![](https://e.com/hero.jpg)").count(), 1);
        assert_eq!(first.markdown.matches("![](https://e.com/hero.jpg)").count(), 1);
    }

    #[test]
    fn test_archive_annotation_rendered() {
        let options = MarkdownOptions {
            archive_annotation: Some("Retrieved via Wayback Machine (2024-01-15)".to_string()),
            ..Default::default()
        };
        let result = format_markdown("T", "<p>Body</p>", &options).unwrap();
        assert!(result.markdown.contains("*Retrieved via Wayback Machine (2024-01-15)*"));
    }

    #[test]
    fn test_emphasis_around_brackets_suppressed() {
        let out = unemphasize_bracketed("*[label]* and _[other]_");
        assert_eq!(out, "[label] and [other]");
    }

    #[test]
    fn test_image_filename_normalization() {
        assert_eq!(image_filename("https://e.com/a/B.JPG?x=1"), Some("b.jpg".to_string()));
        assert_eq!(image_filename("https://e.com/a/"), None);
        assert_eq!(image_filename("hero.png"), Some("hero.png".to_string()));
    }

    #[test]
    fn test_empty_title_omits_heading() {
        let result = format_markdown("", "<p>Body</p>", &MarkdownOptions::default()).unwrap();
        assert!(!result.markdown.starts_with("#"));
        assert!(result.markdown.contains("Body"));
    }
}
