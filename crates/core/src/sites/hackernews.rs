//! Hacker News stories and comment threads.
//!
//! HN serves comments as a flat table; nesting is encoded in the width of
//! an indent spacer image (40px per level, also mirrored in an `indent`
//! attribute on newer markup). The extractor distinguishes story pages
//! from single-comment permalinks and rebuilds the thread as nested
//! blockquotes.

use url::Url;

use crate::metadata::ExtractedMetadata;
use crate::parse::{Document, Element};
use crate::sites::{CommentNode, ExtractorResult, SiteExtractor};
use crate::Result;

/// Pixel width of one indentation level in the comment table.
const INDENT_WIDTH_PX: usize = 40;

pub struct HackerNewsExtractor;

impl SiteExtractor for HackerNewsExtractor {
    fn site_name(&self) -> &'static str {
        "hackernews"
    }

    fn matches(&self, host: &str) -> bool {
        host == "news.ycombinator.com"
    }

    fn can_extract(&self, doc: &Document) -> bool {
        doc.select_first("table.fatitem").is_some() || doc.select_first("tr.athing").is_some()
    }

    fn extract(&self, doc: &Document, url: &Url) -> Result<ExtractorResult> {
        let mut content = String::new();
        let mut metadata = ExtractedMetadata { url: Some(url.to_string()), ..Default::default() };
        metadata.site_name = Some("Hacker News".to_string());
        metadata.domain = Some("news.ycombinator.com".to_string());

        // story pages carry a .titleline; single-comment permalinks don't
        if let Some(title_link) = doc.select_first(".fatitem .titleline a, .athing .titleline a") {
            let title = title_link.text().trim().to_string();
            if !title.is_empty() {
                content.push_str(&format!("<h1>{title}</h1>\n"));
                metadata.title = Some(title);
            }
            if let Some(href) = title_link.attr("href")
                && !href.starts_with("item?")
            {
                content.push_str(&format!("<p><a href=\"{href}\">{href}</a></p>\n"));
            }
        }

        if let Some(subtext) = doc.select_first(".fatitem .subtext, .subtext") {
            let points = subtext
                .select(".score")
                .ok()
                .and_then(|els| els.first().map(|el| el.text().trim().to_string()));
            let author = subtext
                .select(".hnuser")
                .ok()
                .and_then(|els| els.first().map(|el| el.text().trim().to_string()));

            if let Some(author) = &author {
                metadata.author = Some(author.clone());
            }
            match (points, author) {
                (Some(p), Some(a)) => content.push_str(&format!("<p>{p} by {a}</p>\n")),
                (Some(p), None) => content.push_str(&format!("<p>{p}</p>\n")),
                (None, Some(a)) => content.push_str(&format!("<p>by {a}</p>\n")),
                (None, None) => {}
            }
        }

        // self-post body (Ask HN, Tell HN) or the permalinked comment itself
        if let Some(toptext) = doc.select_first(".fatitem .toptext, .fatitem .commtext") {
            content.push_str(&toptext.inner_html());
            content.push('\n');
        }

        let comments = collect_comments(doc)?;
        if !comments.is_empty() {
            content.push_str("<h2>Comments</h2>\n");
            content.push_str(&super::render_comment_tree(&comments));
        }

        Ok(ExtractorResult { content_html: content, metadata })
    }
}

fn collect_comments(doc: &Document) -> Result<Vec<CommentNode>> {
    let mut comments = Vec::new();

    for row in doc.select("tr.athing.comtr")? {
        let Some(body) = row
            .select(".commtext")?
            .into_iter()
            .next()
            .map(|el| el.inner_html())
        else {
            continue; // flagged/dead comments have no body
        };

        let author = row
            .select(".hnuser")?
            .first()
            .map(|el| el.text().trim().to_string())
            .filter(|a| !a.is_empty());

        comments.push(CommentNode { depth: comment_depth(&row), author, body_html: body });
    }

    Ok(comments)
}

/// Nesting depth of a comment row, from the indent spacer width or the
/// `indent` attribute on newer markup.
fn comment_depth(row: &Element<'_>) -> usize {
    if let Ok(spacers) = row.select("td.ind img")
        && let Some(width) = spacers.first().and_then(|img| img.attr("width"))
        && let Ok(px) = width.trim().parse::<usize>()
    {
        return px / INDENT_WIDTH_PX;
    }

    if let Ok(cells) = row.select("td.ind")
        && let Some(indent) = cells.first().and_then(|td| td.attr("indent"))
        && let Ok(depth) = indent.trim().parse::<usize>()
    {
        return depth;
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY_PAGE: &str = r#"
        <html><body>
        <table class="fatitem">
            <tr class="athing"><td>
                <span class="titleline"><a href="https://example.com/post">A Great Article</a></span>
            </td></tr>
            <tr><td class="subtext">
                <span class="score">142 points</span> by <a class="hnuser">pg</a>
            </td></tr>
        </table>
        <table class="comment-tree">
            <tr class="athing comtr"><td>
                <td class="ind"><img src="s.gif" width="0"></td>
                <td><a class="hnuser">alice</a><div class="commtext c00"><p>Top comment.</p></div></td>
            </td></tr>
            <tr class="athing comtr"><td>
                <td class="ind"><img src="s.gif" width="40"></td>
                <td><a class="hnuser">bob</a><div class="commtext c00"><p>A reply.</p></div></td>
            </td></tr>
            <tr class="athing comtr"><td>
                <td class="ind"><img src="s.gif" width="80"></td>
                <td><a class="hnuser">carol</a><div class="commtext c00"><p>Deeper reply.</p></div></td>
            </td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_extract_story_with_comments() {
        let doc = Document::parse(STORY_PAGE);
        let url = Url::parse("https://news.ycombinator.com/item?id=100").unwrap();

        let extractor = HackerNewsExtractor;
        assert!(extractor.can_extract(&doc));

        let result = extractor.extract(&doc, &url).unwrap();
        assert!(result.content_html.contains("<h1>A Great Article</h1>"));
        assert!(result.content_html.contains("142 points by pg"));
        assert!(result.content_html.contains("Top comment."));
        assert_eq!(result.metadata.title, Some("A Great Article".to_string()));
        assert_eq!(result.metadata.author, Some("pg".to_string()));
        assert_eq!(result.metadata.site_name, Some("Hacker News".to_string()));
    }

    #[test]
    fn test_comment_nesting_from_indent_width() {
        let doc = Document::parse(STORY_PAGE);
        let comments = collect_comments(&doc).unwrap();
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0].depth, 0);
        assert_eq!(comments[1].depth, 1);
        assert_eq!(comments[2].depth, 2);

        let tree = crate::sites::render_comment_tree(&comments);
        let carol = tree.find("Deeper reply").unwrap();
        assert_eq!(tree[..carol].matches("<blockquote>").count(), 3);
    }

    #[test]
    fn test_indent_attribute_fallback() {
        let html = r#"
            <html><body><table>
            <tr class="athing comtr">
                <td class="ind" indent="2"></td>
                <td><div class="commtext"><p>Body</p></div></td>
            </tr>
            </table></body></html>
        "#;
        let doc = Document::parse(html);
        let comments = collect_comments(&doc).unwrap();
        assert_eq!(comments[0].depth, 2);
    }

    #[test]
    fn test_dead_comment_skipped() {
        let html = r#"
            <html><body><table>
            <tr class="athing comtr">
                <td class="ind"><img width="0"></td>
                <td><a class="hnuser">ghost</a></td>
            </tr>
            </table></body></html>
        "#;
        let doc = Document::parse(html);
        let comments = collect_comments(&doc).unwrap();
        assert!(comments.is_empty());
    }

    #[test]
    fn test_matches_only_hn_host() {
        let extractor = HackerNewsExtractor;
        assert!(extractor.matches("news.ycombinator.com"));
        assert!(!extractor.matches("ycombinator.com"));
        assert!(!extractor.matches("example.com"));
    }
}
