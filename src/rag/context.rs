//! Context assembly for RAG prompts.
//!
//! Packs ranked search hits into one text block that fits a token budget.

use crate::vector_store::SearchHit;
use serde::Serialize;
use tracing::{debug, warn};

/// Approximate characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Largest single hit, in estimated tokens, before it is truncated.
pub const MAX_HIT_TOKENS: usize = 2000;

/// Default token budget for an assembled context.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 10_000;

/// Appended to content that was cut to fit.
pub const TRUNCATION_MARKER: &str = "... [Document truncated due to size]";

/// Assembled context: prompt text plus the hits it contains.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextBlock {
    /// Formatted text handed to the language model.
    pub text: String,
    /// Hits included in `text`, in rank order. Content reflects any truncation.
    pub hits: Vec<SearchHit>,
    /// Estimated tokens of the included content.
    pub token_estimate: usize,
}

impl ContextBlock {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Estimate the token count of a text as `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Cut oversized content down to the per-hit limit and mark it.
fn truncate_content(content: &str) -> Option<String> {
    if estimate_tokens(content) <= MAX_HIT_TOKENS {
        return None;
    }
    let limit = MAX_HIT_TOKENS * CHARS_PER_TOKEN;
    let mut truncated: String = content.chars().take(limit).collect();
    truncated.push_str(TRUNCATION_MARKER);
    Some(truncated)
}

/// Format one hit as a context entry.
fn format_entry(hit: &SearchHit) -> String {
    format!(
        "Document: {}\nPage: {}\nRelevance: {}%\nContent: {}\n\n",
        hit.document_name,
        hit.page_number,
        (hit.score * 100.0).round() as i64,
        hit.content
    )
}

/// Assemble ranked hits into a context block under `max_tokens`.
///
/// Hits are taken in order until the next one would exceed the budget; the
/// rest are dropped even if a smaller one further down would still fit.
pub fn assemble(hits: Vec<SearchHit>, max_tokens: usize) -> ContextBlock {
    let mut block = ContextBlock::default();

    for mut hit in hits {
        if let Some(truncated) = truncate_content(&hit.content) {
            warn!("Truncated oversized chunk from {}", hit.document_name);
            hit.content = truncated;
        }

        let tokens = estimate_tokens(&hit.content);
        if block.token_estimate + tokens > max_tokens {
            debug!(
                "Token budget of {} reached after {} hits",
                max_tokens,
                block.hits.len()
            );
            break;
        }

        block.text.push_str(&format_entry(&hit));
        block.token_estimate += tokens;
        block.hits.push(hit);
    }

    block
}

/// Format included hits as a source list for display.
pub fn format_sources_for_display(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "{} (page {}, score: {:.2})",
                hit.document_name, hit.page_number, hit.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(name: &str, content: String, score: f32) -> SearchHit {
        SearchHit {
            id: format!("chunk_{}", name),
            content,
            document_name: name.to_string(),
            page_number: 2,
            path: None,
            score,
        }
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // Characters, not bytes.
        assert_eq!(estimate_tokens("äöüß"), 1);
    }

    #[test]
    fn test_budget_stops_at_first_overflow() {
        let hits = vec![
            hit("a", "x".repeat(160), 0.9),
            hit("b", "y".repeat(160), 0.8),
            hit("c", "z".repeat(160), 0.7),
        ];

        let block = assemble(hits, 100);
        assert_eq!(block.hits.len(), 2);
        assert_eq!(block.hits[0].document_name, "a");
        assert_eq!(block.hits[1].document_name, "b");
        assert_eq!(block.token_estimate, 80);
    }

    #[test]
    fn test_budget_breaks_instead_of_skipping() {
        let hits = vec![
            hit("big", "x".repeat(400), 0.9),
            hit("small", "y".repeat(4), 0.8),
        ];

        let block = assemble(hits, 50);
        assert!(block.is_empty());
        assert!(block.text.is_empty());
    }

    #[test]
    fn test_oversized_hit_truncated_before_counting() {
        let hits = vec![hit("long", "q".repeat(9000), 0.5)];

        let block = assemble(hits, DEFAULT_MAX_CONTEXT_TOKENS);
        assert_eq!(block.hits.len(), 1);

        let content = &block.hits[0].content;
        assert!(content.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            content.chars().count(),
            8000 + TRUNCATION_MARKER.chars().count()
        );
        assert_eq!(block.token_estimate, estimate_tokens(content));
    }

    #[test]
    fn test_truncation_lets_hit_fit_budget() {
        // 9000 chars would be 2250 tokens; truncated it is 2009.
        let hits = vec![hit("long", "q".repeat(9000), 0.5)];
        let block = assemble(hits, 2100);
        assert_eq!(block.hits.len(), 1);
    }

    #[test]
    fn test_entry_format() {
        let block = assemble(vec![hit("guide.pdf", "Some text.".to_string(), 0.876)], 100);
        assert_eq!(
            block.text,
            "Document: guide.pdf\nPage: 2\nRelevance: 88%\nContent: Some text.\n\n"
        );
    }

    #[test]
    fn test_empty_input() {
        let block = assemble(Vec::new(), 100);
        assert!(block.text.is_empty());
        assert!(block.hits.is_empty());
    }

    #[test]
    fn test_format_sources_for_display() {
        let hits = vec![
            hit("guide.pdf", "a".to_string(), 0.876),
            hit("notes.md", "b".to_string(), 0.5),
        ];
        assert_eq!(
            format_sources_for_display(&hits),
            "guide.pdf (page 2, score: 0.88)\nnotes.md (page 2, score: 0.50)"
        );
        assert_eq!(format_sources_for_display(&[]), "");
    }
}
