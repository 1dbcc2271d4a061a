//! Reply parsing: pull the trailing `json:recommendations` block out of a
//! model reply and decide how the remaining content should be displayed.
//!
//! Parsing never fails. Anything ambiguous (no block, bad JSON, wrong shape)
//! leaves the reply untouched with no recommendations.

use crate::chat::Recommendation;
use regex::Regex;
use std::sync::OnceLock;

/// Fence tag the model is instructed to use for structured recommendations.
pub const RECOMMENDATIONS_TAG: &str = "json:recommendations";

fn recommendations_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?s)```{}\s*(.*?)\s*```", regex::escape(RECOMMENDATIONS_TAG));
        Regex::new(&pattern).unwrap()
    })
}

/// Result of splitting a raw reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// Text to display. Equal to the raw reply unless a valid block was removed.
    pub cleaned_content: String,
    /// Present only when a well-formed block was found.
    pub recommendations: Option<Vec<Recommendation>>,
}

impl ParsedReply {
    fn unchanged(raw: &str) -> Self {
        Self {
            cleaned_content: raw.to_string(),
            recommendations: None,
        }
    }
}

/// Split a raw model reply into display content and recommendations.
///
/// Only the first `json:recommendations` block is considered.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let Some(caps) = recommendations_re().captures(raw) else {
        return ParsedReply::unchanged(raw);
    };
    let body = match caps.get(1) {
        Some(m) if !m.as_str().is_empty() => m.as_str(),
        _ => return ParsedReply::unchanged(raw),
    };

    // Deserializing into the typed record doubles as shape validation:
    // every element needs string title/rationale and a list of strings.
    let recommendations: Vec<Recommendation> = match serde_json::from_str(body) {
        Ok(recs) => recs,
        Err(e) => {
            tracing::warn!("Failed to parse recommendations JSON: {}", e);
            return ParsedReply::unchanged(raw);
        }
    };

    let cleaned_content = recommendations_re().replace(raw, "").trim().to_string();
    tracing::debug!(
        count = recommendations.len(),
        "extracted recommendations from reply"
    );

    ParsedReply {
        cleaned_content,
        recommendations: Some(recommendations),
    }
}

/// How a piece of model content should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// A self-contained HTML document, shown in a sandboxed view
    Html,
    /// Everything else
    Markdown,
}

/// Classify cleaned content for display.
pub fn classify_content(content: &str) -> ContentKind {
    let folded = content.trim().to_lowercase();
    if folded.starts_with("<!doctype html>") || folded.starts_with("<html>") {
        ContentKind::Html
    } else {
        ContentKind::Markdown
    }
}
