//! Citation extraction from generated answers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A document and page cited in an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document: String,
    pub page: u32,
}

fn citation_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"\(Source: ([^()]+?), Page (\d+)\)").expect("valid citation regex"),
            Regex::new(r"\(Quelle: ([^()]+?), Seite (\d+)\)").expect("valid citation regex"),
        ]
    })
}

/// Extract unique `(document, page)` citations from answer text.
///
/// Document names may contain commas; the page marker closing the
/// parenthesis ends the name.
///
/// English-format citations come first, then German-format ones, each in
/// order of appearance.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();

    for pattern in citation_patterns() {
        for caps in pattern.captures_iter(text) {
            let Ok(page) = caps[2].parse::<u32>() else {
                continue;
            };
            let citation = Citation {
                document: caps[1].trim().to_string(),
                page,
            };
            if !citations.contains(&citation) {
                citations.push(citation);
            }
        }
    }

    citations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_both_formats() {
        let text = "Rust is fast (Source: rust.pdf, Page 3). \
                    SQLite is embedded (Quelle: sqlite.md, Seite 1). \
                    Again (Source: rust.pdf, Page 3).";

        let citations = extract_citations(text);
        assert_eq!(
            citations,
            vec![
                Citation {
                    document: "rust.pdf".to_string(),
                    page: 3
                },
                Citation {
                    document: "sqlite.md".to_string(),
                    page: 1
                },
            ]
        );
    }

    #[test]
    fn test_same_document_different_pages() {
        let text = "(Source: a.pdf, Page 1) and (Source: a.pdf, Page 2)";
        assert_eq!(extract_citations(text).len(), 2);
    }

    #[test]
    fn test_document_names_with_commas() {
        let text = "Revenue grew (Source: Report, Q3.pdf, Page 2). \
                    Umsatz stieg (Quelle: Bericht, Teil 1.pdf, Seite 4).";
        assert_eq!(
            extract_citations(text),
            vec![
                Citation {
                    document: "Report, Q3.pdf".to_string(),
                    page: 2
                },
                Citation {
                    document: "Bericht, Teil 1.pdf".to_string(),
                    page: 4
                },
            ]
        );
    }

    #[test]
    fn test_citation_does_not_span_parentheses() {
        let text = "(Source: no page) then (Source: b.md, Page 5)";
        assert_eq!(
            extract_citations(text),
            vec![Citation {
                document: "b.md".to_string(),
                page: 5
            }]
        );
    }

    #[test]
    fn test_no_citations() {
        assert!(extract_citations("").is_empty());
        assert!(extract_citations("[General Knowledge]: nothing cited").is_empty());
        assert!(extract_citations("(Source: no page)").is_empty());
    }
}
