//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types for parsing
//! HTML and querying the DOM tree with CSS selectors. Both are thin wrappers
//! over `scraper`; [`Element`] additionally exposes real tree ancestry,
//! which the extraction scorer uses to propagate scores to parents.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{ExtractError, Result};

/// A parsed HTML document with an optional base URL.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Parses HTML with a base URL for later relative-link resolution.
    pub fn parse_with_url(html: &str, base_url: Url) -> Self {
        Self { html: Html::parse_document(html), base_url: Some(base_url) }
    }

    /// The base URL, when one was supplied.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// The underlying `scraper::Html`.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The full document serialized back to HTML.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::HtmlParse`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = Selector::parse(selector)
            .map_err(|e| ExtractError::HtmlParse(format!("invalid selector {selector:?}: {e}")))?;
        Ok(self.html.select(&sel).map(Element::new).collect())
    }

    /// First element matching the selector, if any.
    pub fn select_first(&'_ self, selector: &str) -> Option<Element<'_>> {
        self.select(selector).ok()?.into_iter().next()
    }

    /// Content of the `<title>` element, if present.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Concatenation of all text nodes in the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A single element in a [`Document`].
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// The wrapped `scraper::ElementRef`.
    pub fn as_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// HTML content inside this element, excluding its own tags.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// HTML content including this element's own tags.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Concatenation of all text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Value of an attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Stable node id within the owning document tree.
    pub fn node_id(&self) -> ego_tree::NodeId {
        self.element.id()
    }

    /// Nearest element ancestor, if any.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::new)
    }

    /// Selects descendant elements using a CSS selector.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = Selector::parse(selector)
            .map_err(|e| ExtractError::HtmlParse(format!("invalid selector {selector:?}: {e}")))?;
        Ok(self.element.select(&sel).map(Element::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head><title>Test Page</title></head>
        <body>
            <div id="outer">
                <p class="content">Paragraph 1</p>
                <p class="content">Paragraph 2</p>
            </div>
            <a href="https://example.com">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML);
        assert_eq!(doc.title(), Some("Test Page".to_string()));
    }

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML);
        let elements = doc.select("p.content").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "Paragraph 1");
    }

    #[test]
    fn test_element_attributes() {
        let doc = Document::parse(SAMPLE_HTML);
        let link = doc.select_first("a").unwrap();
        assert_eq!(link.attr("href"), Some("https://example.com"));
        assert_eq!(link.tag_name(), "a");
    }

    #[test]
    fn test_element_parent() {
        let doc = Document::parse(SAMPLE_HTML);
        let p = doc.select_first("p.content").unwrap();
        let parent = p.parent().unwrap();
        assert_eq!(parent.attr("id"), Some("outer"));
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML);
        assert!(matches!(doc.select("[[invalid"), Err(ExtractError::HtmlParse(_))));
    }

    #[test]
    fn test_base_url_roundtrip() {
        let url = Url::parse("https://example.com/post").unwrap();
        let doc = Document::parse_with_url(SAMPLE_HTML, url.clone());
        assert_eq!(doc.base_url(), Some(&url));
    }
}
