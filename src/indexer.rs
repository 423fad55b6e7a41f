//! Document ingestion: chunk, embed and store.

use crate::chunking::{chunk_document, ChunkingConfig};
use crate::document::{SourceFormat, TextExtractor};
use crate::embedding::Embedder;
use crate::error::{KontextError, Result};
use crate::vector_store::{Chunk, PutReport, VectorStore, DEFAULT_BATCH_SIZE};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of indexing one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub document_name: String,
    /// Chunks produced by the chunker.
    pub chunks_created: usize,
    /// Chunks committed to the store.
    pub chunks_stored: usize,
    /// Chunks lost to embedding or storage failures.
    pub chunks_failed: usize,
    /// Chunks of a previous version that were removed first.
    pub chunks_replaced: usize,
    pub errors: Vec<String>,
}

impl IndexReport {
    fn new(document_name: &str) -> Self {
        Self {
            document_name: document_name.to_string(),
            ..Default::default()
        }
    }

    fn record_put(&mut self, put: PutReport) {
        self.chunks_stored += put.stored;
        self.chunks_failed += put.failed;
        self.errors.extend(put.errors);
    }

    /// Whether every chunk made it into the store.
    pub fn is_complete(&self) -> bool {
        self.chunks_failed == 0
    }
}

/// Outcome of indexing a directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectoryReport {
    /// Files with at least one stored chunk.
    pub indexed: usize,
    /// Files that could not be read or stored.
    pub failed: usize,
    /// Files without any text.
    pub skipped: usize,
    /// Total chunks stored.
    pub chunks_stored: usize,
    /// File name and reason for each failure.
    pub failures: Vec<(String, String)>,
}

/// Turns document text into stored, embedded chunks.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    extractor: Arc<dyn TextExtractor>,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl Indexer {
    /// Create an indexer with default chunking and batch size.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            extractor,
            chunking: ChunkingConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the chunking configuration.
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Set the number of chunks embedded and stored per batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Index a document's text, replacing any earlier version of it.
    ///
    /// Batches are embedded one at a time. A batch whose embedding fails is
    /// recorded in the report and the next batch proceeds.
    #[instrument(skip(self, text), fields(document = %name, format = %format))]
    pub async fn index_document(
        &self,
        name: &str,
        path: Option<&str>,
        text: &str,
        format: SourceFormat,
    ) -> Result<IndexReport> {
        let mut report = IndexReport::new(name);

        let contents = chunk_document(text, &self.chunking, format.is_paginated());
        report.chunks_created = contents.len();
        if contents.is_empty() {
            warn!("No text to index in {}", name);
            return Ok(report);
        }

        report.chunks_replaced = self.vector_store.delete_document(name).await?;
        if report.chunks_replaced > 0 {
            info!("Removed {} previous chunks of {}", report.chunks_replaced, name);
        }

        let total_batches = contents.len().div_ceil(self.batch_size);
        for (i, batch) in contents.chunks(self.batch_size).enumerate() {
            debug!("Embedding batch {}/{}", i + 1, total_batches);

            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = match self.embedder.embed_batch(&texts).await {
                Ok(embeddings) if embeddings.len() == batch.len() => embeddings,
                Ok(embeddings) => {
                    let message = format!(
                        "batch {}: expected {} embeddings, got {}",
                        i + 1,
                        batch.len(),
                        embeddings.len()
                    );
                    warn!("{}", message);
                    report.chunks_failed += batch.len();
                    report.errors.push(message);
                    continue;
                }
                Err(e) => {
                    warn!("Embedding batch {}/{} failed: {}", i + 1, total_batches, e);
                    report.chunks_failed += batch.len();
                    report.errors.push(format!("batch {}: {}", i + 1, e));
                    continue;
                }
            };

            let chunks: Vec<Chunk> = batch
                .iter()
                .zip(embeddings)
                .map(|(content, vector)| {
                    Chunk::new(
                        content.content.clone(),
                        name.to_string(),
                        content.page_number,
                        path.map(str::to_string),
                        vector,
                    )
                })
                .collect();

            let put = self.vector_store.put(&chunks).await?;
            report.record_put(put);
        }

        info!(
            "Indexed {}: {}/{} chunks stored",
            name, report.chunks_stored, report.chunks_created
        );
        Ok(report)
    }

    /// Extract and index one file, named after its file name.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn index_file(&self, path: &Path) -> Result<IndexReport> {
        let format = SourceFormat::from_path(path)
            .ok_or_else(|| KontextError::UnsupportedFormat(path.display().to_string()))?;
        let text = self.extractor.extract_text(path).await?;
        let name = document_name(path);
        let path_str = path.to_string_lossy();
        self.index_document(&name, Some(path_str.as_ref()), &text, format)
            .await
    }

    /// Index every supported file directly inside `dir`.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn index_directory(&self, dir: &Path) -> Result<DirectoryReport> {
        let files = discover_documents(dir).await?;
        info!("Found {} documents in {}", files.len(), dir.display());

        let mut report = DirectoryReport::default();
        for path in files {
            let name = document_name(&path);

            let text = match self.extractor.extract_text(&path).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to extract {}: {}", name, e);
                    report.failed += 1;
                    report.failures.push((name, e.to_string()));
                    continue;
                }
            };

            if text.trim().is_empty() {
                debug!("Skipping {} (no text)", name);
                report.skipped += 1;
                continue;
            }

            let Some(format) = SourceFormat::from_path(&path) else {
                report.skipped += 1;
                continue;
            };

            let path_str = path.to_string_lossy();
            match self
                .index_document(&name, Some(path_str.as_ref()), &text, format)
                .await
            {
                Ok(doc) if doc.chunks_stored > 0 => {
                    report.indexed += 1;
                    report.chunks_stored += doc.chunks_stored;
                }
                Ok(doc) => {
                    report.failed += 1;
                    report
                        .failures
                        .push((name, doc.errors.join("; ")));
                }
                Err(KontextError::StoreClosed) => return Err(KontextError::StoreClosed),
                Err(e) => {
                    report.failed += 1;
                    report.failures.push((name, e.to_string()));
                }
            }
        }

        info!(
            "Indexed {} documents ({} failed, {} skipped)",
            report.indexed, report.failed, report.skipped
        );
        Ok(report)
    }
}

/// Name a document after its file name.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// List supported files directly inside `dir`, sorted by path.
pub async fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(KontextError::InvalidInput(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && crate::document::is_supported(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PlainTextExtractor;
    use crate::embedding::HashingEmbedder;
    use crate::vector_store::{SearchOptions, SqliteVectorStore};
    use async_trait::async_trait;

    const DIMS: usize = 64;

    /// Fails any batch containing the word "POISON".
    struct FlakyEmbedder(HashingEmbedder);

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.0.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains("POISON")) {
                return Err(KontextError::Embedding("model unavailable".to_string()));
            }
            self.0.embed_batch(texts).await
        }

        fn dimensions(&self) -> usize {
            DIMS
        }

        fn model_id(&self) -> &str {
            "flaky"
        }
    }

    async fn indexer_with(embedder: Arc<dyn Embedder>) -> (Indexer, Arc<SqliteVectorStore>) {
        let store = Arc::new(SqliteVectorStore::in_memory(DIMS, embedder.clone()));
        store.initialize().await.unwrap();
        let indexer = Indexer::new(embedder, store.clone(), Arc::new(PlainTextExtractor::new()))
            .with_chunking(ChunkingConfig {
                chunk_size: 40,
                chunk_overlap: 5,
                chunks_per_page: 2,
            })
            .with_batch_size(2);
        (indexer, store)
    }

    async fn indexer() -> (Indexer, Arc<SqliteVectorStore>) {
        indexer_with(Arc::new(HashingEmbedder::new(DIMS))).await
    }

    const TEXT: &str = "The first sentence is here. The second sentence follows. \
                        A third one appears. Then a fourth sentence. Finally the fifth.";

    #[tokio::test]
    async fn test_index_document_pages() {
        let (indexer, store) = indexer().await;

        let report = indexer
            .index_document("guide.pdf", Some("/docs/guide.pdf"), TEXT, SourceFormat::Pdf)
            .await
            .unwrap();

        assert!(report.chunks_created >= 3);
        assert_eq!(report.chunks_stored, report.chunks_created);
        assert!(report.is_complete());

        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].path.as_deref(), Some("/docs/guide.pdf"));
        // Two chunks per page.
        assert_eq!(
            docs[0].page_count as usize,
            (report.chunks_created - 1) / 2 + 1
        );
    }

    #[tokio::test]
    async fn test_flat_formats_stay_on_page_one() {
        let (indexer, store) = indexer().await;
        indexer
            .index_document("notes.txt", None, TEXT, SourceFormat::Txt)
            .await
            .unwrap();

        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs[0].page_count, 1);
    }

    #[tokio::test]
    async fn test_reindex_replaces_previous_chunks() {
        let (indexer, store) = indexer().await;

        let first = indexer
            .index_document("guide.pdf", None, TEXT, SourceFormat::Pdf)
            .await
            .unwrap();
        let second = indexer
            .index_document("guide.pdf", None, TEXT, SourceFormat::Pdf)
            .await
            .unwrap();

        assert_eq!(second.chunks_replaced, first.chunks_stored);
        assert_eq!(store.chunk_count().await.unwrap(), second.chunks_stored);
    }

    #[tokio::test]
    async fn test_embedding_failure_isolated_to_batch() {
        let (indexer, store) = indexer_with(Arc::new(FlakyEmbedder(HashingEmbedder::new(DIMS)))).await;

        // Four short sentences, one per chunk, two chunks per batch.
        let text = "Alpha sentence is fine here. Beta sentence is fine too. \
                    POISON sentence breaks it. Delta sentence is fine again.";
        let report = indexer
            .index_document("mixed.txt", None, text, SourceFormat::Txt)
            .await
            .unwrap();

        assert_eq!(report.chunks_created, 4);
        assert_eq!(report.chunks_stored, 2);
        assert_eq!(report.chunks_failed, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(store.chunk_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_text_stores_nothing() {
        let (indexer, store) = indexer().await;
        let report = indexer
            .index_document("empty.txt", None, "   \n ", SourceFormat::Txt)
            .await
            .unwrap();
        assert_eq!(report.chunks_created, 0);
        assert_eq!(store.chunk_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_index_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), TEXT).unwrap();
        std::fs::write(dir.path().join("b.md"), "# Heading\n\nMarkdown body text.").unwrap();
        std::fs::write(dir.path().join("blank.txt"), "  ").unwrap();
        std::fs::write(dir.path().join("scan.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("image.png"), b"\x89PNG").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), TEXT).unwrap();

        let (indexer, store) = indexer().await;
        let report = indexer.index_directory(dir.path()).await.unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].0, "scan.pdf");
        assert_eq!(store.chunk_count().await.unwrap(), report.chunks_stored);

        let hits = store
            .search("Markdown body", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(hits.hits[0].document_name, "b.md");
    }

    #[tokio::test]
    async fn test_index_directory_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, TEXT).unwrap();

        let (indexer, _store) = indexer().await;
        assert!(indexer.index_directory(&file).await.is_err());
    }

    #[tokio::test]
    async fn test_index_file_names_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, TEXT).unwrap();

        let (indexer, _store) = indexer().await;
        let report = indexer.index_file(&file).await.unwrap();
        assert_eq!(report.document_name, "report.txt");
        assert!(report.chunks_stored > 0);
    }
}
