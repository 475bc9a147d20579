//! Embedding provider abstraction.

use crate::error::EmbeddingError;

/// A source of fixed-width sentence embeddings.
///
/// The build pipeline embeds chunk texts in batches; the ranker embeds one
/// query at a time. Implementations must be safe to share across threads and
/// must return vectors of exactly [`dimension`](Self::dimension) width, in
/// the same order as the input texts. Semantically similar texts should map
/// to nearby vectors under cosine distance.
///
/// The production implementation is
/// [`BertSentenceEncoder`](super::BertSentenceEncoder); tests use the
/// deterministic [`HashEmbedder`](crate::test_utils::HashEmbedder).
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identity of the model (name + revision). Persisted in the
    /// index manifest and checked at load time.
    fn model_id(&self) -> &str;

    /// Width of every embedding this provider produces.
    fn dimension(&self) -> usize;

    /// Embeds a batch of passage (chunk) texts.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] if tokenization or inference fails; the
    /// batch fails as a whole.
    fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embeds a single query string.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] if tokenization or inference fails.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
