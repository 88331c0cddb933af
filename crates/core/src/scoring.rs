//! Content scoring heuristics.
//!
//! An element's score combines a base score from its tag, a class/id
//! weight, a content-density bonus (text length and comma count), and a
//! link-density penalty. The same primitives back both the readability
//! pre-check and candidate selection during extraction.

use std::sync::OnceLock;

use regex::Regex;

use crate::parse::Element;

/// Configuration for the content scoring algorithm.
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns.
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns.
    pub negative_weight: f64,
    /// Maximum content-density score from character count.
    pub max_char_density_score: f64,
    /// Maximum content-density score from comma count.
    pub max_comma_density_score: f64,
    /// Characters per point for content-density scoring.
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Result of scoring one element.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    /// Base score from the tag type.
    pub base_score: f64,
    /// Adjustment from class/ID patterns.
    pub class_weight: f64,
    /// Content density score.
    pub content_density: f64,
    /// Link density (0.0 to 1.0).
    pub link_density: f64,
    /// Final calculated score.
    pub final_score: f64,
}

/// Base score for an element by tag name.
///
/// Containers likely to hold article prose score positive; list, form, and
/// navigation chrome scores negative.
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" | "p" => 3.0,
        "pre" => 0.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

const POSITIVE_PATTERNS: &str =
    r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)";

const NEGATIVE_PATTERNS: &str = r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|promo|share|social)";

fn positive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(POSITIVE_PATTERNS).unwrap_or_else(|_| Regex::new("$^").unwrap()))
}

fn negative_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NEGATIVE_PATTERNS).unwrap_or_else(|_| Regex::new("$^").unwrap()))
}

/// Class/ID weight adjustment: positive patterns win over negative ones.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    if let Some(id) = element.attr("id") {
        if positive_regex().is_match(id) {
            return config.positive_weight;
        }
        if negative_regex().is_match(id) {
            return config.negative_weight;
        }
    }

    if let Some(class) = element.attr("class") {
        for class_name in class.split_whitespace() {
            if positive_regex().is_match(class_name) {
                return config.positive_weight;
            }
            if negative_regex().is_match(class_name) {
                return config.negative_weight;
            }
        }
    }

    0.0
}

/// Bonus for elements with substantial text and prose punctuation.
pub fn content_density_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let text = element.text();
    let char_score =
        ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Ratio of anchor text to total text within an element.
///
/// Hash-only anchors (footnote markers, in-page TOC links) don't count.
pub fn link_density(element: &Element<'_>) -> f64 {
    let text = element.text();
    let text_length = text.chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .filter(|link| link.attr("href").is_some_and(|href| !href.starts_with('#')))
        .map(|link| link.text().chars().count())
        .sum::<usize>();

    link_text_length as f64 / text_length as f64
}

/// Final score for an element.
///
/// The link-density penalty is halved for elements with positive class/ID
/// patterns or long text: prose with citations should not lose to its own
/// footnotes.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> ScoreResult {
    let base_score = base_tag_score(element);
    let class_weight = class_id_weight(element, config);
    let content_density = content_density_score(element, config);
    let ld = link_density(element);
    let raw_score = base_score + class_weight + content_density;

    let text = element.text();
    let has_positive_pattern = class_weight > 0.0;
    let is_content_rich = text.chars().count() > 500;

    let link_penalty = if has_positive_pattern || is_content_rich { 1.0 - (ld * 0.5) } else { 1.0 - ld };

    let final_score = raw_score * link_penalty;

    ScoreResult { base_score, class_weight, content_density, link_density: ld, final_score }
}
