//! Generic main-content extraction.
//!
//! Scores candidate containers, propagates scores up the real DOM tree so
//! that wrappers of high-scoring content compete as candidates themselves,
//! then emits the winner plus qualifying siblings. Pages whose best
//! candidate scores below the threshold are reported as not readable
//! rather than producing garbage output.

use std::collections::HashSet;

use ego_tree::NodeId;

use crate::parse::{Document, Element};
use crate::scoring::{ScoreConfig, calculate_score, link_density};
use crate::{ExtractError, Result};

/// Configuration for content extraction.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum score the top candidate must reach.
    pub min_score_threshold: f64,
    /// Number of top candidates kept after scoring.
    pub max_top_candidates: usize,
    /// Minimum character count for valid content.
    pub char_threshold: usize,
    /// Maximum elements to scan (0 = unlimited).
    pub max_elements: usize,
    /// Sibling score threshold as a multiplier of the top score.
    pub sibling_threshold: f64,
    /// Scoring weights.
    pub scoring: ScoreConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 20.0,
            max_top_candidates: 5,
            char_threshold: 500,
            max_elements: 2000,
            sibling_threshold: 0.2,
            scoring: ScoreConfig::default(),
        }
    }
}

/// The result of content extraction.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// The main content as HTML.
    pub content: String,
    /// Score of the winning candidate.
    pub top_score: f64,
    /// Number of elements merged into the content (winner + siblings).
    pub element_count: usize,
}

/// Tags considered as potential content containers.
const CANDIDATE_TAGS: &[&str] = &["article", "main", "section", "div", "td", "pre", "blockquote", "p"];

struct Candidate<'a> {
    element: Element<'a>,
    score: f64,
}

fn identify_candidates<'a>(doc: &'a Document, config: &ExtractConfig) -> Vec<Candidate<'a>> {
    let mut candidates = Vec::new();
    let max_elements = if config.max_elements == 0 { usize::MAX } else { config.max_elements };
    let mut scanned = 0usize;

    for tag in CANDIDATE_TAGS {
        let Ok(elements) = doc.select(tag) else { continue };
        for element in elements {
            if scanned >= max_elements {
                return candidates;
            }
            scanned += 1;

            let tag_name = element.tag_name();
            if !matches!(tag_name.as_str(), "article" | "section" | "main")
                && element.text().chars().count() < config.char_threshold / 10
            {
                continue;
            }

            let score = calculate_score(&element, &config.scoring).final_score;
            candidates.push(Candidate { element, score });
        }
    }

    candidates
}

/// Boosts the parent and grandparent of each candidate.
///
/// A container wrapping several scoring paragraphs usually is the article
/// body even when it scores poorly on its own; it inherits half (parent)
/// or a third (grandparent) of each child's score.
fn propagate_scores<'a>(candidates: &mut Vec<Candidate<'a>>, config: &ExtractConfig) {
    let mut known: HashSet<NodeId> = candidates.iter().map(|c| c.element.node_id()).collect();
    let mut boosts: Vec<(Element<'a>, f64)> = Vec::new();

    for candidate in candidates.iter() {
        let ancestors = [
            (candidate.element.parent(), 2.0),
            (candidate.element.parent().and_then(|p| p.parent()), 3.0),
        ];
        for (ancestor, divisor) in ancestors {
            let Some(ancestor) = ancestor else { continue };
            if ancestor.tag_name() == "body" || ancestor.tag_name() == "html" {
                continue;
            }
            boosts.push((ancestor, candidate.score / divisor));
        }
    }

    let mut merged: Vec<(Element<'a>, f64)> = Vec::new();
    for (element, boost) in boosts {
        if let Some(existing) = merged.iter_mut().find(|(e, _)| e.node_id() == element.node_id()) {
            existing.1 += boost;
        } else {
            merged.push((element, boost));
        }
    }

    for (element, boost) in merged {
        if known.contains(&element.node_id()) {
            if let Some(candidate) =
                candidates.iter_mut().find(|c| c.element.node_id() == element.node_id())
            {
                candidate.score += boost;
            }
            continue;
        }
        known.insert(element.node_id());
        let own = calculate_score(&element, &config.scoring).final_score;
        candidates.push(Candidate { element, score: own + boost });
    }
}

fn select_siblings<'a>(
    top: &Candidate<'a>, candidates: &[Candidate<'a>], config: &ExtractConfig,
) -> Vec<Element<'a>> {
    let Some(top_parent) = top.element.parent() else {
        return Vec::new();
    };
    let top_parent_id = top_parent.node_id();
    let top_id = top.element.node_id();

    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut siblings = Vec::new();

    for candidate in candidates {
        let id = candidate.element.node_id();
        if id == top_id || seen.contains(&id) {
            continue;
        }
        if candidate.element.parent().map(|p| p.node_id()) != Some(top_parent_id) {
            continue;
        }
        if candidate.score < top.score * config.sibling_threshold {
            continue;
        }

        if candidate.element.tag_name() == "p" {
            let text_len = candidate.element.text().chars().count();
            if text_len <= 80 || link_density(&candidate.element) >= 0.25 {
                continue;
            }
        }

        seen.insert(id);
        siblings.push(candidate.element.clone());
    }

    siblings
}

/// Extracts the main content from a document.
///
/// # Errors
///
/// [`ExtractError::EmptyContent`] when no candidates exist at all;
/// [`ExtractError::NotReadable`] when the best candidate scores below the
/// configured threshold.
pub fn extract_content(doc: &Document, config: &ExtractConfig) -> Result<ExtractedContent> {
    let mut candidates = identify_candidates(doc, config);
    propagate_scores(&mut candidates, config);

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(config.max_top_candidates.max(1));

    let Some(top) = candidates.first() else {
        return Err(ExtractError::EmptyContent);
    };

    if top.score < config.min_score_threshold {
        return Err(ExtractError::NotReadable {
            score: top.score,
            threshold: config.min_score_threshold,
        });
    }

    let siblings = select_siblings(top, &candidates, config);

    let mut content = String::new();
    content.push_str(&top.element.outer_html());
    for sibling in &siblings {
        content.push('\n');
        content.push_str(&sibling.outer_html());
    }

    Ok(ExtractedContent { content, top_score: top.score, element_count: 1 + siblings.len() })
}
