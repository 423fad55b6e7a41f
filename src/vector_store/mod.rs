//! Vector store abstraction for Kontext.
//!
//! The store owns persisted chunks and answers two kinds of queries: exact
//! semantic search over every stored vector, and keyword search over a
//! full-text index kept alongside the chunk table.

pub mod codec;
mod sqlite;

pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of chunks written per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default minimum score for search hits.
pub const DEFAULT_MIN_SCORE: f32 = 0.2;

/// Document name used when a chunk arrives without one.
pub const UNKNOWN_DOCUMENT: &str = "Unknown Document";

/// A chunk of document text with its embedding, ready to be stored.
///
/// The store assigns the chunk ID and timestamp when the row is written, so
/// putting the same chunk twice stores two rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Normalized text content.
    pub content: String,
    /// Name of the source document.
    pub document_name: String,
    /// Estimated page number (1-based).
    pub page_number: u32,
    /// Path of the source file, if known.
    pub path: Option<String>,
    /// Embedding vector.
    pub vector: Vec<f32>,
}

impl Chunk {
    /// Create a chunk, defaulting the document name and page.
    pub fn new(
        content: String,
        document_name: String,
        page_number: u32,
        path: Option<String>,
        vector: Vec<f32>,
    ) -> Self {
        let document_name = if document_name.trim().is_empty() {
            UNKNOWN_DOCUMENT.to_string()
        } else {
            document_name
        };

        Self {
            content,
            document_name,
            page_number: page_number.max(1),
            path,
            vector,
        }
    }
}

/// A search result: chunk data plus a relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub document_name: String,
    pub page_number: u32,
    pub path: Option<String>,
    /// Cosine similarity for semantic search, normalized rank for keyword search.
    pub score: f32,
}

/// How a query is matched against stored chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Embed the query and rank by cosine similarity.
    #[default]
    Semantic,
    /// Prefix-match query terms against the full-text index.
    Keyword,
}

impl SearchMode {
    /// Pick a mode from the semantic-search flag.
    pub fn from_flag(semantic: bool) -> Self {
        if semantic {
            SearchMode::Semantic
        } else {
            SearchMode::Keyword
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "semantic" | "vector" => Ok(SearchMode::Semantic),
            "keyword" | "fts" | "text" => Ok(SearchMode::Keyword),
            _ => Err(format!("Unknown search mode: {}", s)),
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Semantic => write!(f, "semantic"),
            SearchMode::Keyword => write!(f, "keyword"),
        }
    }
}

/// Options for a store search.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_score: f32,
    pub mode: SearchMode,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: DEFAULT_MIN_SCORE,
            mode: SearchMode::Semantic,
        }
    }
}

/// Ranked search hits.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub count: usize,
}

impl SearchResults {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        let count = hits.len();
        Self { hits, count }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Outcome of a batched write.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PutReport {
    /// Chunks committed.
    pub stored: usize,
    /// Chunks in batches that were rolled back.
    pub failed: usize,
    /// One message per failed batch.
    pub errors: Vec<String>,
}

impl PutReport {
    /// Whether every chunk was stored.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Store statistics for health checks.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Whether the chunk table exists.
    pub exists: bool,
    /// Number of stored chunks.
    pub count: usize,
    /// Configured vector dimensionality.
    pub dimensions: usize,
    /// Active embedding model.
    pub model: String,
    /// Database file size in bytes (0 for in-memory stores).
    pub size_bytes: u64,
    /// Database location.
    pub path: String,
}

/// Summary of an indexed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub document_name: String,
    pub path: Option<String>,
    pub chunk_count: usize,
    /// Highest estimated page.
    pub page_count: u32,
    /// When the most recent chunk was written.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Open the backing store and ensure its schema exists. Safe to call repeatedly.
    async fn initialize(&self) -> Result<()>;

    /// Store chunks in transactional batches, reporting partial success.
    async fn put(&self, chunks: &[Chunk]) -> Result<PutReport>;

    /// Search stored chunks.
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults>;

    /// Delete every chunk of a document.
    async fn delete_document(&self, document_name: &str) -> Result<usize>;

    /// Delete all chunks and compact storage.
    async fn reset(&self) -> Result<()>;

    /// Report store statistics.
    async fn stats(&self) -> Result<StoreStats>;

    /// Number of stored chunks.
    async fn chunk_count(&self) -> Result<usize>;

    /// List indexed documents.
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>>;

    /// Release the storage handle. Further operations fail.
    async fn close(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0 for mismatched lengths, empty input, or a zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_symmetric_and_bounded() {
        let a = vec![0.3, -1.2, 4.5, 0.0];
        let b = vec![-2.0, 0.7, 1.1, 9.0];
        let ab = cosine_similarity(&a, &b);
        let ba = cosine_similarity(&b, &a);
        assert_eq!(ab, ba);
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn test_cosine_self_similarity() {
        let v: Vec<f32> = (1..=384).map(|i| (i as f32).sin()).collect();
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_chunk_defaults() {
        let chunk = Chunk::new("text".into(), "  ".into(), 0, None, vec![]);
        assert_eq!(chunk.document_name, UNKNOWN_DOCUMENT);
        assert_eq!(chunk.page_number, 1);
    }

    #[test]
    fn test_search_mode_parse() {
        assert_eq!("keyword".parse::<SearchMode>().unwrap(), SearchMode::Keyword);
        assert_eq!("Semantic".parse::<SearchMode>().unwrap(), SearchMode::Semantic);
        assert!("fuzzy".parse::<SearchMode>().is_err());
        assert_eq!(SearchMode::from_flag(false), SearchMode::Keyword);
    }
}
