//! Content chunking for breaking document text into retrievable segments.
//!
//! Text is split on sentence boundaries and packed greedily into chunks of a
//! bounded character length, with a configurable character overlap between
//! neighbouring chunks.

mod sentence;

pub use sentence::{chunk_text, normalize_whitespace, split_sentences};

use serde::{Deserialize, Serialize};

/// A chunk of document text with its position metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Estimated page number (1-based).
    pub page_number: u32,
    /// Order of this chunk in the document.
    pub order: usize,
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters (may be exceeded by a single long sentence).
    pub chunk_size: usize,
    /// Number of trailing characters carried over into the next chunk.
    pub chunk_overlap: usize,
    /// Assumed number of chunks per page for paginated formats.
    pub chunks_per_page: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            chunks_per_page: 5,
        }
    }
}

/// Estimate the page a chunk came from.
///
/// Paginated formats assume a fixed number of chunks per page; flat formats
/// always report page 1.
pub fn estimate_page_number(order: usize, chunks_per_page: usize, paginated: bool) -> u32 {
    if !paginated || chunks_per_page == 0 {
        return 1;
    }
    (order / chunks_per_page) as u32 + 1
}

/// Chunk a document and attach page estimates.
pub fn chunk_document(text: &str, config: &ChunkingConfig, paginated: bool) -> Vec<ContentChunk> {
    chunk_text(text, config.chunk_size, config.chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(order, content)| ContentChunk {
            content,
            page_number: estimate_page_number(order, config.chunks_per_page, paginated),
            order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_estimation_paginated() {
        assert_eq!(estimate_page_number(0, 5, true), 1);
        assert_eq!(estimate_page_number(4, 5, true), 1);
        assert_eq!(estimate_page_number(5, 5, true), 2);
        assert_eq!(estimate_page_number(12, 5, true), 3);
    }

    #[test]
    fn test_page_estimation_flat() {
        assert_eq!(estimate_page_number(0, 5, false), 1);
        assert_eq!(estimate_page_number(42, 5, false), 1);
        assert_eq!(estimate_page_number(42, 0, true), 1);
    }

    #[test]
    fn test_chunk_document_orders_and_pages() {
        let config = ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 0,
            chunks_per_page: 2,
        };
        let chunks = chunk_document("One one. Two two. Three. Four four.", &config, true);

        assert_eq!(chunks.len(), 4);
        let orders: Vec<usize> = chunks.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
        let pages: Vec<u32> = chunks.iter().map(|c| c.page_number).collect();
        assert_eq!(pages, vec![1, 1, 2, 2]);
    }
}
