//! Pipeline orchestrator for Kontext.
//!
//! Builds the embedder, vector store and indexer from settings and owns
//! their lifecycle. The store is opened by [`Orchestrator::initialize`] and
//! released by [`Orchestrator::close`].

use crate::chunking::ChunkingConfig;
use crate::config::{Prompts, Settings};
use crate::document::{PlainTextExtractor, TextExtractor};
use crate::embedding::{create_embedder, Embedder};
use crate::error::Result;
use crate::indexer::Indexer;
use crate::rag::{RagEngine, RetrieveOptions, Retriever};
use crate::vector_store::{SqliteVectorStore, VectorStore};
use std::sync::Arc;
use tracing::{info, instrument};

/// The main orchestrator for the Kontext pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<SqliteVectorStore>,
    indexer: Indexer,
}

impl Orchestrator {
    /// Create an orchestrator from settings. Nothing is opened yet.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;

        let embedder = create_embedder(&settings.embedding)?;
        let vector_store = Arc::new(
            SqliteVectorStore::new(
                &settings.sqlite_path(),
                settings.embedding.dimensions as usize,
                embedder.clone(),
            )
            .with_batch_size(settings.vector_store.batch_size)
            .with_cache_size_kb(settings.vector_store.cache_size_kb),
        );

        Self::with_components(settings, embedder, vector_store)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<SqliteVectorStore>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let extractor: Arc<dyn TextExtractor> = Arc::new(PlainTextExtractor::new());
        let indexer = Indexer::new(embedder.clone(), vector_store.clone(), extractor)
            .with_chunking(ChunkingConfig {
                chunk_size: settings.chunking.chunk_size,
                chunk_overlap: settings.chunking.chunk_overlap,
                chunks_per_page: settings.chunking.chunks_per_page,
            })
            .with_batch_size(settings.vector_store.batch_size);

        Ok(Self {
            settings,
            prompts,
            embedder,
            vector_store,
            indexer,
        })
    }

    /// Open the vector store and check the embedder against it.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        self.vector_store.initialize().await?;
        info!(
            "Ready: {} embeddings, {} dimensions",
            self.embedder.model_id(),
            self.embedder.dimensions()
        );
        Ok(())
    }

    /// Get a reference to the vector store (as trait object).
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone() as Arc<dyn VectorStore>
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the indexer.
    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// Build a retriever using the configured retrieval options.
    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.vector_store())
            .with_options(RetrieveOptions::from(&self.settings.retrieval))
    }

    /// Build a RAG engine using the configured model and prompts.
    pub fn rag_engine(&self) -> RagEngine {
        RagEngine::new(self.retriever(), &self.settings.llm).with_prompts(self.prompts.clone())
    }

    /// Build a RAG engine that answers with a different chat model.
    pub fn rag_engine_with_model(&self, model: &str) -> RagEngine {
        let mut llm = self.settings.llm.clone();
        llm.model = model.to_string();
        RagEngine::new(self.retriever(), &llm).with_prompts(self.prompts.clone())
    }

    /// Release the vector store. Later store operations fail.
    pub async fn close(&self) -> Result<()> {
        self.vector_store.close().await
    }
}
