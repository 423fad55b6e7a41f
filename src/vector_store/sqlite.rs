//! SQLite-based vector store implementation.
//!
//! Chunks live in a regular table with their embedding stored as a packed
//! `f32` blob; an FTS5 virtual table mirrors content and document name for
//! keyword search. Semantic search is an exact linear scan with cosine
//! similarity computed in Rust.

use super::codec;
use super::{
    cosine_similarity, Chunk, IndexedDocument, PutReport, SearchHit, SearchMode, SearchOptions,
    SearchResults, StoreStats, VectorStore, DEFAULT_BATCH_SIZE,
};
use crate::embedding::Embedder;
use crate::error::{KontextError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const CHUNK_TABLE: &str = "document_vectors";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS document_vectors (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        document_name TEXT NOT NULL,
        page_number INTEGER NOT NULL,
        path TEXT,
        vector BLOB NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_document_name ON document_vectors(document_name);

    CREATE VIRTUAL TABLE IF NOT EXISTS document_fts
    USING fts5(content, document_name, chunk_id UNINDEXED);
"#;

/// Where the database lives.
#[derive(Debug, Clone)]
enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl StoreLocation {
    fn describe(&self) -> String {
        match self {
            StoreLocation::File(path) => path.display().to_string(),
            StoreLocation::Memory => ":memory:".to_string(),
        }
    }
}

/// Connection lifecycle.
enum ConnState {
    Uninitialized,
    Open(Connection),
    Closed,
}

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<ConnState>,
    location: StoreLocation,
    embedder: Arc<dyn Embedder>,
    dimensions: usize,
    batch_size: usize,
    cache_size_kb: i64,
}

impl SqliteVectorStore {
    /// Create a store backed by a database file. Nothing is opened until
    /// [`VectorStore::initialize`] is called.
    pub fn new(path: &Path, dimensions: usize, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_location(StoreLocation::File(path.to_path_buf()), dimensions, embedder)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(dimensions: usize, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_location(StoreLocation::Memory, dimensions, embedder)
    }

    fn with_location(location: StoreLocation, dimensions: usize, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            conn: Mutex::new(ConnState::Uninitialized),
            location,
            embedder,
            dimensions,
            batch_size: DEFAULT_BATCH_SIZE,
            cache_size_kb: 2000,
        }
    }

    /// Set the number of chunks written per transaction.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the SQLite page cache size in KiB.
    pub fn with_cache_size_kb(mut self, cache_size_kb: i64) -> Self {
        self.cache_size_kb = cache_size_kb;
        self
    }

    /// Configured vector dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn lock(&self) -> Result<MutexGuard<'_, ConnState>> {
        self.conn
            .lock()
            .map_err(|e| KontextError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Run `f` against the open connection.
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        match &mut *guard {
            ConnState::Open(conn) => f(conn),
            ConnState::Closed => Err(KontextError::StoreClosed),
            ConnState::Uninitialized => Err(KontextError::VectorStore(
                "Vector store is not initialized".to_string(),
            )),
        }
    }

    fn open_connection(&self) -> Result<Connection> {
        let conn = match &self.location {
            StoreLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            KontextError::Config(format!(
                                "Cannot create storage directory {}: {}",
                                parent.display(),
                                e
                            ))
                        })?;
                    }
                }
                let conn = Connection::open(path)?;
                conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
                conn
            }
            StoreLocation::Memory => Connection::open_in_memory()?,
        };

        // Negative cache_size is interpreted by SQLite as KiB.
        conn.execute_batch(&format!("PRAGMA cache_size = -{};", self.cache_size_kb.abs()))?;
        Ok(conn)
    }

    fn insert_batch(conn: &mut Connection, batch: &[Chunk]) -> Result<()> {
        let now = Utc::now();
        let timestamp = now.to_rfc3339();
        let tx = conn.transaction()?;
        {
            let mut insert_chunk = tx.prepare_cached(
                r#"
                INSERT INTO document_vectors
                (id, content, document_name, page_number, path, vector, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            let mut insert_fts = tx.prepare_cached(
                "INSERT INTO document_fts (content, document_name, chunk_id) VALUES (?1, ?2, ?3)",
            )?;

            for chunk in batch {
                let id = new_chunk_id(now);
                insert_chunk.execute(params![
                    id,
                    chunk.content,
                    chunk.document_name,
                    chunk.page_number,
                    chunk.path,
                    codec::encode(&chunk.vector),
                    timestamp,
                ])?;
                insert_fts.execute(params![chunk.content, chunk.document_name, id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn validate_batch(&self, batch: &[Chunk]) -> Result<()> {
        for (i, chunk) in batch.iter().enumerate() {
            if chunk.vector.len() != self.dimensions {
                return Err(KontextError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: chunk.vector.len(),
                });
            }
            if chunk.content.trim().is_empty() {
                return Err(KontextError::InvalidInput(format!(
                    "Chunk {} of {} has empty content",
                    i + 1,
                    chunk.document_name
                )));
            }
        }
        Ok(())
    }

    /// Embed a short text to confirm the embedder answers with the configured dimensions.
    async fn check_embedder(&self) -> Result<()> {
        let model = self.embedder.model_id();
        let vector = self.embedder.embed("ping").await.map_err(|e| {
            KontextError::Config(format!("Embedding model {} is unavailable: {}", model, e))
        })?;

        if vector.len() != self.dimensions {
            return Err(KontextError::Config(format!(
                "Embedding model {} produces {} dimensions but the store is configured for {}",
                model,
                vector.len(),
                self.dimensions
            )));
        }
        debug!("Embedding model {} is ready", model);
        Ok(())
    }

    async fn semantic_search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        // Embed before taking the connection lock.
        let query_vector = self.embedder.embed(query).await?;
        if query_vector.len() != self.dimensions {
            return Err(KontextError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_vector.len(),
            });
        }

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, content, document_name, page_number, path, vector
                FROM document_vectors
                ORDER BY rowid
                "#,
            )?;

            let rows = stmt.query_map([], |row| {
                let vector_bytes: Vec<u8> = row.get(5)?;
                Ok((
                    SearchHit {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        document_name: row.get(2)?,
                        page_number: row.get(3)?,
                        path: row.get(4)?,
                        score: 0.0,
                    },
                    vector_bytes,
                ))
            })?;

            let mut hits = Vec::new();
            for row in rows {
                let (mut hit, vector_bytes) = row?;
                hit.score = cosine_similarity(&query_vector, &codec::decode(&vector_bytes));
                if hit.score >= options.min_score {
                    hits.push(hit);
                }
            }

            // Stable sort keeps insertion order among equal scores.
            hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            hits.truncate(options.limit);
            Ok(hits)
        })
    }

    fn keyword_search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let Some(match_expr) = build_match_expression(query) else {
            warn!("No usable keywords in query");
            return Ok(Vec::new());
        };
        debug!("FTS match expression: {}", match_expr);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                WITH matches AS (
                    SELECT chunk_id, rank
                    FROM document_fts
                    WHERE document_fts MATCH ?1
                    ORDER BY rank
                    LIMIT ?2
                )
                SELECT m.rank, c.id, c.content, c.document_name, c.page_number, c.path
                FROM matches m
                JOIN document_vectors c ON c.id = m.chunk_id
                ORDER BY m.rank, c.rowid
                "#,
            )?;

            let rows = stmt.query_map(params![match_expr, options.limit as i64], |row| {
                let rank: f64 = row.get(0)?;
                Ok((
                    rank,
                    SearchHit {
                        id: row.get(1)?,
                        content: row.get(2)?,
                        document_name: row.get(3)?,
                        page_number: row.get(4)?,
                        path: row.get(5)?,
                        score: 0.0,
                    },
                ))
            })?;

            let ranked: Vec<(f64, SearchHit)> = rows.collect::<rusqlite::Result<_>>()?;
            let best = ranked.first().map(|(rank, _)| *rank).unwrap_or(0.0);

            let hits = ranked
                .into_iter()
                .map(|(rank, mut hit)| {
                    hit.score = rank_to_score(rank, best);
                    hit
                })
                .filter(|hit| hit.score >= options.min_score)
                .collect();
            Ok(hits)
        })
    }
}

/// Turn a free-text query into an FTS5 prefix query.
///
/// Terms of three or more characters are reduced to their alphanumeric
/// characters and quoted with a trailing `*`; all terms must match.
pub(crate) fn build_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|term| term.chars().count() > 2)
        .map(|term| term.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|term| !term.is_empty())
        .map(|term| format!("\"{}\"*", term))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// Normalize an FTS5 rank against the best rank in the candidate set.
///
/// FTS5 ranks are negative bm25 values where lower is better, so the ratio
/// puts the top hit at 1.0 and weaker hits proportionally lower.
pub(crate) fn rank_to_score(rank: f64, best: f64) -> f32 {
    if best >= 0.0 || !rank.is_finite() {
        return 1.0;
    }
    ((rank / best) as f32).clamp(0.0, 1.0)
}

/// Chunk IDs are the write time in milliseconds plus a random suffix.
fn new_chunk_id(now: DateTime<Utc>) -> String {
    format!("chunk_{}_{}", now.timestamp_millis(), Uuid::new_v4().simple())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self), fields(location = %self.location.describe()))]
    async fn initialize(&self) -> Result<()> {
        if matches!(&*self.lock()?, ConnState::Closed) {
            return Err(KontextError::StoreClosed);
        }

        self.check_embedder().await?;

        let mut guard = self.lock()?;
        match &*guard {
            ConnState::Closed => return Err(KontextError::StoreClosed),
            ConnState::Uninitialized => *guard = ConnState::Open(self.open_connection()?),
            ConnState::Open(_) => {}
        }

        if let ConnState::Open(conn) = &*guard {
            conn.execute_batch(SCHEMA)?;
        }

        info!(
            "Initialized vector store at {} ({} dimensions, model {})",
            self.location.describe(),
            self.dimensions,
            self.embedder.model_id()
        );
        Ok(())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn put(&self, chunks: &[Chunk]) -> Result<PutReport> {
        let mut report = PutReport::default();
        if chunks.is_empty() {
            warn!("No chunks to store");
            return Ok(report);
        }

        let total_batches = chunks.len().div_ceil(self.batch_size);

        for (i, batch) in chunks.chunks(self.batch_size).enumerate() {
            debug!("Writing batch {}/{} ({} chunks)", i + 1, total_batches, batch.len());

            let outcome = self
                .validate_batch(batch)
                .and_then(|_| self.with_conn(|conn| Self::insert_batch(conn, batch)));

            match outcome {
                Ok(()) => report.stored += batch.len(),
                Err(KontextError::StoreClosed) => return Err(KontextError::StoreClosed),
                Err(e) => {
                    warn!("Batch {}/{} rolled back: {}", i + 1, total_batches, e);
                    report.failed += batch.len();
                    report.errors.push(format!("batch {}: {}", i + 1, e));
                }
            }
        }

        info!(
            "Stored {}/{} chunks ({} failed)",
            report.stored,
            chunks.len(),
            report.failed
        );
        Ok(report)
    }

    #[instrument(skip(self, query), fields(mode = %options.mode, limit = options.limit))]
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        if query.trim().is_empty() || options.limit == 0 {
            return Ok(SearchResults::default());
        }

        let hits = match options.mode {
            SearchMode::Semantic => self.semantic_search(query, options).await?,
            SearchMode::Keyword => self.keyword_search(query, options)?,
        };

        info!("Found {} search results", hits.len());
        Ok(SearchResults::new(hits))
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, document_name: &str) -> Result<usize> {
        let deleted = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                r#"
                DELETE FROM document_fts
                WHERE chunk_id IN (SELECT id FROM document_vectors WHERE document_name = ?1)
                "#,
                params![document_name],
            )?;
            let deleted = tx.execute(
                "DELETE FROM document_vectors WHERE document_name = ?1",
                params![document_name],
            )?;
            tx.commit()?;
            Ok(deleted)
        })?;

        info!("Deleted {} chunks for document {}", deleted, document_name);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn reset(&self) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM document_vectors", [])?;
            tx.execute("DELETE FROM document_fts", [])?;
            tx.commit()?;
            // VACUUM cannot run inside a transaction.
            conn.execute_batch("VACUUM;")?;
            Ok(())
        })?;

        info!("Vector store reset");
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let (exists, count, size_bytes) = self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![CHUNK_TABLE],
                |row| row.get(0),
            )?;

            let count: i64 = if exists {
                conn.query_row("SELECT COUNT(*) FROM document_vectors", [], |row| row.get(0))?
            } else {
                0
            };

            let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
            let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;

            Ok((exists, count as usize, (page_count * page_size).max(0) as u64))
        })?;

        Ok(StoreStats {
            exists,
            count,
            dimensions: self.dimensions,
            model: self.embedder.model_id().to_string(),
            size_bytes,
            path: self.location.describe(),
        })
    }

    async fn chunk_count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM document_vectors", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<IndexedDocument>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT document_name, MAX(path), COUNT(*) AS chunk_count,
                       MAX(page_number), MAX(timestamp) AS indexed_at
                FROM document_vectors
                GROUP BY document_name
                ORDER BY indexed_at DESC
                "#,
            )?;

            let documents = stmt.query_map([], |row| {
                let chunk_count: i64 = row.get(2)?;
                let indexed_at: String = row.get(4)?;
                Ok(IndexedDocument {
                    document_name: row.get(0)?,
                    path: row.get(1)?,
                    chunk_count: chunk_count as usize,
                    page_count: row.get(3)?,
                    indexed_at: parse_timestamp(&indexed_at),
                })
            })?;

            Ok(documents.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.lock()?;
        let previous = std::mem::replace(&mut *guard, ConnState::Closed);
        if let ConnState::Open(conn) = previous {
            conn.close().map_err(|(_, e)| KontextError::Database(e))?;
            info!("Vector store connection closed");
        }
        Ok(())
    }
}
