//! Reddit posts and comment threads.
//!
//! Handles both markup generations: the classic markup (old.reddit.com and
//! logged-out fallbacks) where comment nesting is expressed by `.child`
//! containers, and the web-component markup where `<shreddit-comment>`
//! carries an explicit `depth` attribute. Self-posts contribute their body
//! text; link posts contribute the outbound link.

use url::Url;

use crate::metadata::ExtractedMetadata;
use crate::parse::{Document, Element};
use crate::sites::{CommentNode, ExtractorResult, SiteExtractor};
use crate::Result;

pub struct RedditExtractor;

impl SiteExtractor for RedditExtractor {
    fn site_name(&self) -> &'static str {
        "reddit"
    }

    fn matches(&self, host: &str) -> bool {
        host == "reddit.com" || host.ends_with(".reddit.com")
    }

    fn can_extract(&self, doc: &Document) -> bool {
        doc.select_first("#siteTable .thing.link").is_some()
            || doc.select_first("shreddit-post").is_some()
            || doc.select_first(".commentarea").is_some()
    }

    fn extract(&self, doc: &Document, url: &Url) -> Result<ExtractorResult> {
        let mut content = String::new();
        let mut metadata = ExtractedMetadata {
            url: Some(url.to_string()),
            site_name: Some("Reddit".to_string()),
            domain: url.host_str().map(|h| h.to_string()),
            ..Default::default()
        };

        if let Some(post) = doc.select_first("#siteTable .thing.link") {
            extract_classic_post(&post, &mut content, &mut metadata)?;
        } else if let Some(post) = doc.select_first("shreddit-post") {
            extract_shreddit_post(&post, &mut content, &mut metadata)?;
        }

        let comments = collect_comments(doc)?;
        if !comments.is_empty() {
            content.push_str("<h2>Comments</h2>\n");
            content.push_str(&super::render_comment_tree(&comments));
        }

        Ok(ExtractorResult { content_html: content, metadata })
    }
}

fn extract_classic_post(
    post: &Element<'_>, content: &mut String, metadata: &mut ExtractedMetadata,
) -> Result<()> {
    if let Some(title_link) = post.select("a.title")?.first() {
        let title = title_link.text().trim().to_string();
        if !title.is_empty() {
            content.push_str(&format!("<h1>{title}</h1>\n"));
            metadata.title = Some(title);
        }
    }

    if let Some(author) = post.select(".tagline .author")?.first() {
        let name = author.text().trim().to_string();
        if !name.is_empty() {
            metadata.author = Some(name);
        }
    }

    let is_self_post = post
        .attr("class")
        .is_some_and(|c| c.split_whitespace().any(|cls| cls == "self"));

    if is_self_post {
        if let Some(body) = post.select(".usertext-body .md")?.first() {
            content.push_str(&body.inner_html());
            content.push('\n');
        }
    } else if let Some(href) = post
        .attr("data-url")
        .or_else(|| post.select("a.title").ok()?.first().and_then(|a| a.attr("href")))
    {
        content.push_str(&format!("<p><a href=\"{href}\">{href}</a></p>\n"));
    }

    Ok(())
}

fn extract_shreddit_post(
    post: &Element<'_>, content: &mut String, metadata: &mut ExtractedMetadata,
) -> Result<()> {
    if let Some(title) = post.attr("post-title") {
        content.push_str(&format!("<h1>{title}</h1>\n"));
        metadata.title = Some(title.to_string());
    }
    if let Some(author) = post.attr("author") {
        metadata.author = Some(author.to_string());
    }

    if let Some(body) = post.select("[slot=\"text-body\"], .md")?.first() {
        content.push_str(&body.inner_html());
        content.push('\n');
    } else if let Some(href) = post.attr("content-href") {
        content.push_str(&format!("<p><a href=\"{href}\">{href}</a></p>\n"));
    }

    Ok(())
}

fn collect_comments(doc: &Document) -> Result<Vec<CommentNode>> {
    let mut comments = Vec::new();

    for comment in doc.select(".commentarea .thing.comment")? {
        let Some(body) = comment
            .select(".usertext-body .md")?
            .into_iter()
            .next()
            .map(|el| el.inner_html())
        else {
            continue; // deleted comments keep the shell but lose the body
        };

        let author = comment
            .select(".tagline .author")?
            .first()
            .map(|el| el.text().trim().to_string())
            .filter(|a| !a.is_empty());

        comments.push(CommentNode { depth: classic_comment_depth(&comment), author, body_html: body });
    }

    if comments.is_empty() {
        for comment in doc.select("shreddit-comment")? {
            let Some(body) = comment
                .select("[slot=\"comment\"], .md")?
                .into_iter()
                .next()
                .map(|el| el.inner_html())
            else {
                continue;
            };

            let depth = comment
                .attr("depth")
                .and_then(|d| d.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let author = comment.attr("author").map(|a| a.to_string()).filter(|a| !a.is_empty());

            comments.push(CommentNode { depth, author, body_html: body });
        }
    }

    Ok(comments)
}

/// Depth of a classic-markup comment: one level per enclosing comment thing.
fn classic_comment_depth(comment: &Element<'_>) -> usize {
    let mut depth = 0;
    let mut current = comment.parent();
    while let Some(ancestor) = current {
        if is_comment_thing(&ancestor) {
            depth += 1;
        }
        current = ancestor.parent();
    }
    depth
}

fn is_comment_thing(el: &Element<'_>) -> bool {
    el.attr("class").is_some_and(|c| {
        let mut has_thing = false;
        let mut has_comment = false;
        for cls in c.split_whitespace() {
            has_thing |= cls == "thing";
            has_comment |= cls == "comment";
        }
        has_thing && has_comment
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELF_POST: &str = r#"
        <html><body>
        <div id="siteTable">
            <div class="thing link self" data-url="/r/rust/comments/1/q/">
                <a class="title" href="/r/rust/comments/1/q/">How do lifetimes work?</a>
                <p class="tagline"><a class="author">ferris</a></p>
                <div class="expando"><div class="usertext-body"><div class="md">
                    <p>I have been wondering about this for a while.</p>
                </div></div></div>
            </div>
        </div>
        <div class="commentarea">
            <div class="thing comment">
                <p class="tagline"><a class="author">alice</a></p>
                <div class="usertext-body"><div class="md"><p>Great question.</p></div></div>
                <div class="child">
                    <div class="thing comment">
                        <p class="tagline"><a class="author">bob</a></p>
                        <div class="usertext-body"><div class="md"><p>Agreed.</p></div></div>
                    </div>
                </div>
            </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_self_post() {
        let doc = Document::parse(SELF_POST);
        let url = Url::parse("https://old.reddit.com/r/rust/comments/1/q/").unwrap();

        let extractor = RedditExtractor;
        assert!(extractor.can_extract(&doc));

        let result = extractor.extract(&doc, &url).unwrap();
        assert!(result.content_html.contains("<h1>How do lifetimes work?</h1>"));
        assert!(result.content_html.contains("wondering about this"));
        assert_eq!(result.metadata.author, Some("ferris".to_string()));
        assert_eq!(result.metadata.title, Some("How do lifetimes work?".to_string()));
    }

    #[test]
    fn test_comment_nesting_from_child_containers() {
        let doc = Document::parse(SELF_POST);
        let comments = collect_comments(&doc).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].depth, 0);
        assert_eq!(comments[1].depth, 1);
        assert_eq!(comments[1].author.as_deref(), Some("bob"));
    }

    #[test]
    fn test_link_post_renders_outbound_link() {
        let html = r#"
            <html><body><div id="siteTable">
                <div class="thing link" data-url="https://example.com/story">
                    <a class="title" href="https://example.com/story">An external story</a>
                </div>
            </div></body></html>
        "#;
        let doc = Document::parse(html);
        let url = Url::parse("https://www.reddit.com/r/news/comments/2/x/").unwrap();
        let result = RedditExtractor.extract(&doc, &url).unwrap();
        assert!(result.content_html.contains(r#"<a href="https://example.com/story">"#));
        assert!(!result.content_html.contains("usertext"));
    }

    #[test]
    fn test_shreddit_comment_depth_attribute() {
        let html = r#"
            <html><body>
            <shreddit-post post-title="Title here" author="eve" content-href="https://example.com/x"></shreddit-post>
            <shreddit-comment author="alice" depth="0"><div slot="comment"><p>Root</p></div></shreddit-comment>
            <shreddit-comment author="bob" depth="1"><div slot="comment"><p>Child</p></div></shreddit-comment>
            </body></html>
        "#;
        let doc = Document::parse(html);
        let comments = collect_comments(&doc).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].depth, 1);

        let url = Url::parse("https://www.reddit.com/r/test/comments/3/y/").unwrap();
        let result = RedditExtractor.extract(&doc, &url).unwrap();
        assert_eq!(result.metadata.title, Some("Title here".to_string()));
        assert!(result.content_html.contains("Child"));
    }

    #[test]
    fn test_matches_reddit_hosts_only() {
        let extractor = RedditExtractor;
        assert!(extractor.matches("reddit.com"));
        assert!(extractor.matches("old.reddit.com"));
        assert!(extractor.matches("www.reddit.com"));
        assert!(!extractor.matches("notreddit.com"));
    }
}
