//! Embedding generation for semantic search and retrieval.

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::{KontextError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Identifier of the model producing the vectors.
    fn model_id(&self) -> &str;
}

/// Build the embedder selected in the settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let dimensions = settings.dimensions as usize;
    match settings.provider.to_lowercase().as_str() {
        "openai" | "ollama" => Ok(Arc::new(OpenAIEmbedder::with_config(
            &settings.api_base,
            &settings.model,
            dimensions,
        ))),
        "hashing" | "hash" => Ok(Arc::new(HashingEmbedder::new(dimensions))),
        other => Err(KontextError::Config(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_embedder_providers() {
        let mut settings = EmbeddingSettings::default();
        let embedder = create_embedder(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.model_id(), "all-minilm");

        settings.provider = "hashing".to_string();
        settings.dimensions = 64;
        let embedder = create_embedder(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 64);

        settings.provider = "carrier-pigeon".to_string();
        assert!(create_embedder(&settings).is_err());
    }
}
