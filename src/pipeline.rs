//! Build pipeline: pages in, persisted index artifact out.
//!
//! Building is a one-shot batch operation: chunk every page, embed every
//! chunk, and hand the result to the store. Nothing is persisted until the
//! whole artifact exists in memory, so a failed build leaves any previous
//! artifact untouched.

use crate::chunking::{chunk_pages, ChunkerConfig, Page};
use crate::embedding::EmbeddingProvider;
use crate::error::BuildError;
use crate::search::ChunkRecord;
use crate::storage::IndexStore;
use tracing::{info, instrument};

/// An index built in memory, not yet persisted.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    /// Chunk metadata table, ids sequential from zero
    pub chunks: Vec<ChunkRecord>,
    /// One embedding row per chunk, same order
    pub embeddings: Vec<Vec<f32>>,
}

/// One-shot index builder.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    chunker: ChunkerConfig,
}

impl IndexBuilder {
    /// Creates a builder with custom chunking parameters.
    pub fn new(chunker: ChunkerConfig) -> Self {
        Self { chunker }
    }

    /// Chunks and embeds the pages.
    ///
    /// # Errors
    ///
    /// - [`BuildError::EmptyInput`] when no page yields any chunk
    /// - [`BuildError::InvalidChunking`] for unusable chunker parameters
    /// - [`BuildError::Embedding`] when the provider fails; the build fails
    ///   as a whole rather than indexing a partial corpus
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn build(
        &self,
        pages: &[Page],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<BuiltIndex, BuildError> {
        let chunks = chunk_pages(pages, &self.chunker)?;
        if chunks.is_empty() {
            return Err(BuildError::EmptyInput);
        }
        info!(chunks = chunks.len(), "embedding chunk texts");

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_passages(&texts)?;

        Ok(BuiltIndex { chunks, embeddings })
    }

    /// Builds the index and persists it to `store`, replacing any previous
    /// artifact. Returns the number of indexed chunks.
    ///
    /// # Errors
    ///
    /// The errors of [`build`](Self::build), plus [`BuildError::Store`] if
    /// persisting fails.
    #[instrument(skip_all, fields(pages = pages.len(), dir = %store.path().display()))]
    pub fn build_and_save(
        &self,
        pages: &[Page],
        embedder: &dyn EmbeddingProvider,
        store: &IndexStore,
    ) -> Result<usize, BuildError> {
        let built = self.build(pages, embedder)?;
        store.save(
            &built.chunks,
            &built.embeddings,
            embedder.model_id(),
            embedder.dimension(),
        )?;
        info!(chunks = built.chunks.len(), "index built and persisted");
        Ok(built.chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use crate::test_utils::{FailingEmbedder, HashEmbedder};
    use tempfile::TempDir;

    fn pages() -> Vec<Page> {
        vec![
            Page::new(1, "Engine oil and filter replacement procedure."),
            Page::new(2, "Brake fluid level inspection."),
        ]
    }

    #[test]
    fn test_build_produces_aligned_chunks_and_embeddings() {
        let embedder = HashEmbedder::new(64);
        let built = IndexBuilder::default().build(&pages(), &embedder).unwrap();

        assert_eq!(built.chunks.len(), 2);
        assert_eq!(built.embeddings.len(), 2);
        for (i, chunk) in built.chunks.iter().enumerate() {
            assert_eq!(chunk.id.as_u64(), i as u64);
            assert_eq!(built.embeddings[i].len(), 64);
        }
    }

    #[test]
    fn test_build_empty_input() {
        let embedder = HashEmbedder::new(64);
        let builder = IndexBuilder::default();

        assert!(matches!(
            builder.build(&[], &embedder),
            Err(BuildError::EmptyInput)
        ));
        let whitespace = vec![Page::new(1, "  \n  ")];
        assert!(matches!(
            builder.build(&whitespace, &embedder),
            Err(BuildError::EmptyInput)
        ));
    }

    #[test]
    fn test_build_propagates_provider_failure() {
        let embedder = FailingEmbedder::new(64);
        let result = IndexBuilder::default().build(&pages(), &embedder);
        assert!(matches!(
            result,
            Err(BuildError::Embedding(EmbeddingError::InferenceFailed(_)))
        ));
    }

    #[test]
    fn test_build_and_save_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        let embedder = HashEmbedder::new(64);

        let count = IndexBuilder::default()
            .build_and_save(&pages(), &embedder, &store)
            .unwrap();
        assert_eq!(count, 2);

        let artifact = store.load(embedder.model_id(), embedder.dimension()).unwrap();
        assert_eq!(artifact.chunks.len(), 2);
        assert_eq!(artifact.embeddings.len(), 2);
    }

    #[test]
    fn test_failed_build_persists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        let embedder = FailingEmbedder::new(64);

        let result = IndexBuilder::default().build_and_save(&pages(), &embedder, &store);
        assert!(result.is_err());
        assert!(!store.exists());
    }
}
