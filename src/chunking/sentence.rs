//! Sentence-aligned chunking with character overlap.

use regex::Regex;
use std::sync::OnceLock;

fn sentence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A sentence is everything up to a run of terminal punctuation. Trailing
    // text without punctuation forms a final sentence of its own.
    RE.get_or_init(|| Regex::new(r"[^.!?]*[.!?]+|[^.!?]+$").expect("valid sentence regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text, " ").trim().to_string()
}

/// Split normalized text into sentence-like units.
///
/// The returned slices concatenate back to the input exactly. Leading spaces
/// stay attached to the sentence that follows them.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let sentences: Vec<&str> = sentence_regex().find_iter(text).map(|m| m.as_str()).collect();
    if sentences.is_empty() && !text.is_empty() {
        return vec![text];
    }
    sentences
}

/// Last `n` characters of `s` (the whole string if it is shorter).
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

/// Split text into overlapping chunks of roughly `size` characters.
///
/// Sentences are never split: a single sentence longer than `size` becomes a
/// chunk of its own (plus any overlap seed). `overlap` is clamped below `size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let size = size.max(1);
    let overlap = overlap.min(size - 1);
    let normalized = normalize_whitespace(text);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(&normalized) {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len > size {
            if !current.is_empty() {
                chunks.push(current.trim().to_string());
            }
            let seed = tail_chars(&current, overlap).to_string();
            current_len = seed.chars().count();
            current = seed;
        }

        current.push_str(sentence);
        current_len += sentence_len;
    }

    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks.retain(|c| !c.is_empty());
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rebuild the text by dropping, from each chunk, the longest prefix that
    /// the text so far already ends with (bounded by `overlap`).
    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for chunk in chunks {
            let chars: Vec<char> = chunk.chars().collect();
            let max_k = overlap.min(chars.len());
            let mut skip = 0;
            for k in (1..=max_k).rev() {
                let prefix: String = chars[..k].iter().collect();
                if out.trim_end().ends_with(prefix.trim_end()) && !prefix.trim().is_empty() {
                    skip = k;
                    break;
                }
            }
            out.push_str(&chars[skip..].iter().collect::<String>());
        }
        out
    }

    fn strip_ws(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\n b\t c  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_split_sentences_keeps_remainder() {
        let sentences = split_sentences("Hello there. How are you? Fine");
        assert_eq!(sentences, vec!["Hello there.", " How are you?", " Fine"]);
    }

    #[test]
    fn test_split_sentences_without_punctuation() {
        assert_eq!(split_sentences("no punctuation here"), vec!["no punctuation here"]);
    }

    #[test]
    fn test_split_sentences_runs_of_punctuation() {
        assert_eq!(split_sentences("Wait... What?!"), vec!["Wait...", " What?!"]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text("   \n\t ", 100, 10).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Just one sentence.  And another!", 500, 50);
        assert_eq!(chunks, vec!["Just one sentence. And another!"]);
    }

    #[test]
    fn test_abc_scenario_never_splits_sentences() {
        let chunks = chunk_text("A. B. C.", 4, 1);

        assert_eq!(chunks, vec!["A.", ". B.", ". C."]);
        for chunk in &chunks {
            assert!(!chunk.is_empty());
        }
        assert!(chunks.iter().any(|c| c.contains("B.")));
        assert!(chunks.iter().any(|c| c.contains("C.")));
        // Subsequent chunks start with the trailing overlap of their predecessor.
        assert!(chunks[1].starts_with('.'));
        assert!(chunks[2].starts_with('.'));
    }

    #[test]
    fn test_long_sentence_exceeds_size() {
        let long = "This sentence is definitely longer than the configured budget.";
        let chunks = chunk_text(long, 10, 2);
        assert_eq!(chunks, vec![long.to_string()]);
    }

    #[test]
    fn test_overlap_seeds_next_chunk() {
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let chunks = chunk_text(text, 25, 5);

        assert_eq!(chunks.len(), 3);
        for pair in chunks.windows(2) {
            let tail: String = {
                let chars: Vec<char> = pair[0].chars().collect();
                chars[chars.len() - 5..].iter().collect()
            };
            assert!(pair[1].starts_with(tail.trim_start()));
        }
    }

    #[test]
    fn test_reconstruction_property() {
        let text = "Rust is a systems language. It guarantees memory safety!   \
                    Does it use a garbage collector? No. Ownership rules are checked \
                    at compile time. The borrow checker enforces them. Lifetimes \
                    describe how long references live";
        let normalized = normalize_whitespace(text);

        for (size, overlap) in [(30, 5), (50, 10), (80, 20), (200, 1)] {
            let chunks = chunk_text(text, size, overlap);
            assert!(chunks.iter().all(|c| !c.trim().is_empty()));
            let rebuilt = reconstruct(&chunks, overlap);
            assert_eq!(strip_ws(&rebuilt), strip_ws(&normalized), "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_overlap_is_clamped_below_size() {
        // An overlap at or above the size would otherwise re-emit whole chunks.
        let chunks = chunk_text("Aa. Bb. Cc. Dd.", 4, 10);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4 + 3));
    }

    #[test]
    fn test_multibyte_overlap() {
        let chunks = chunk_text("Größe zählt. Übung macht den Meister.", 15, 3);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].starts_with("lt."));
    }
}
