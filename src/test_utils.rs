//! Deterministic embedding providers for tests.
//!
//! Loading real model weights in unit tests is slow and ties test results to
//! model files on disk. [`HashEmbedder`] stands in: a bag-of-words embedding
//! built from word hashes. It is deterministic, respects the provider
//! contract (fixed dimension, L2-normalized output), and gives texts that
//! share words similar vectors, which is enough structure for search tests.

use crate::embedding::EmbeddingProvider;
use crate::error::EmbeddingError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use unicode_segmentation::UnicodeSegmentation;

/// Hash-based bag-of-words embedder.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for word in text.unicode_words() {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let hash = hasher.finish();

            let slot = (hash % self.dimension as u64) as usize;
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        } else {
            // Wordless text still needs a valid unit vector
            vector[0] = 1.0;
        }
        vector
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn model_id(&self) -> &str {
        "test/hash-embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_text(text))
    }
}

/// Provider that always fails, for exercising error paths.
pub struct FailingEmbedder {
    dimension: usize,
}

impl FailingEmbedder {
    /// Creates a failing provider claiming the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for FailingEmbedder {
    fn model_id(&self) -> &str {
        "test/failing-embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_passages(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::InferenceFailed(
            "simulated provider failure".to_string(),
        ))
    }

    fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::InferenceFailed(
            "simulated provider failure".to_string(),
        ))
    }
}
