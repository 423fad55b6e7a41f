//! Deterministic feature-hashing embedder.
//!
//! Each lowercase word is hashed into one signed bucket of the output vector
//! and the result is L2-normalized. Texts sharing words get positive cosine
//! similarity, so the embedder works offline and keeps tests hermetic.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Model identifier reported by [`HashingEmbedder`].
pub const HASHING_MODEL_ID: &str = "feature-hashing";

/// Bag-of-words embedder using SHA-256 feature hashing.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dimensions;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        HASHING_MODEL_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::cosine_similarity;

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(384);
        let a = embedder.embed_text("The borrow checker enforces ownership.");
        let b = embedder.embed_text("The borrow checker enforces ownership.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_insensitive_tokens() {
        let embedder = HashingEmbedder::new(128);
        assert_eq!(embedder.embed_text("Rust LANG"), embedder.embed_text("rust, lang!"));
    }

    #[test]
    fn test_shared_words_are_more_similar() {
        let embedder = HashingEmbedder::new(384);
        let query = embedder.embed_text("sqlite full text search");
        let related = embedder.embed_text("SQLite ships a full text search extension");
        let unrelated = embedder.embed_text("bananas grow in tropical climates");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert_eq!(embedder.embed_text("  ... "), vec![0.0; 8]);
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let embedder = HashingEmbedder::new(32);
        let batch = embedder
            .embed_batch(&["one two".to_string(), "three".to_string()])
            .await
            .unwrap();
        assert_eq!(batch[0], embedder.embed("one two").await.unwrap());
        assert_eq!(batch[1], embedder.embed("three").await.unwrap());
    }
}
