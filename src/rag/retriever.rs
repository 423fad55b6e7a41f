//! Query entry point: search the store and assemble context.

use super::context::{assemble, DEFAULT_MAX_CONTEXT_TOKENS};
use crate::config::RetrievalSettings;
use crate::error::Result;
use crate::vector_store::{SearchHit, SearchMode, SearchOptions, VectorStore, DEFAULT_MIN_SCORE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Options for a retrieval.
#[derive(Debug, Clone, Copy)]
pub struct RetrieveOptions {
    pub limit: usize,
    pub min_score: f32,
    pub mode: SearchMode,
    pub max_context_tokens: usize,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: DEFAULT_MIN_SCORE,
            mode: SearchMode::Semantic,
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
        }
    }
}

impl From<&RetrievalSettings> for RetrieveOptions {
    fn from(settings: &RetrievalSettings) -> Self {
        Self {
            limit: settings.limit,
            min_score: settings.min_score,
            mode: SearchMode::from_flag(settings.semantic_search),
            max_context_tokens: settings.max_context_tokens,
        }
    }
}

impl RetrieveOptions {
    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            limit: self.limit,
            min_score: self.min_score,
            mode: self.mode,
        }
    }
}

/// Result of a retrieval: prompt-ready context and the hits in it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retrieval {
    pub context_text: String,
    pub hits: Vec<SearchHit>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Retrieves context for questions from a vector store.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    options: RetrieveOptions,
}

impl Retriever {
    /// Create a retriever with default options.
    pub fn new(vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            vector_store,
            options: RetrieveOptions::default(),
        }
    }

    /// Set the retrieval options.
    pub fn with_options(mut self, options: RetrieveOptions) -> Self {
        self.options = options;
        self
    }

    /// Retrieve context for a query with the configured options.
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        self.retrieve_with(query, &self.options).await
    }

    /// Retrieve context for a query with explicit options.
    #[instrument(skip(self, options), fields(query = %query, mode = %options.mode))]
    pub async fn retrieve_with(&self, query: &str, options: &RetrieveOptions) -> Result<Retrieval> {
        let count = self.vector_store.chunk_count().await?;
        if count == 0 {
            info!("Vector store is empty, index documents first");
            return Ok(Retrieval::default());
        }

        let results = self
            .vector_store
            .search(query, &options.search_options())
            .await?;

        if results.is_empty() {
            info!("No relevant chunks found");
            return Ok(Retrieval::default());
        }

        let block = assemble(results.hits, options.max_context_tokens);
        debug!(
            "Assembled {} hits, ~{} tokens",
            block.hits.len(),
            block.token_estimate
        );

        Ok(Retrieval {
            context_text: block.text,
            hits: block.hits,
        })
    }
}
