//! Core types for the search engine: chunk identifiers, chunk records, and
//! search results.

use crate::error::EmbeddingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique chunk identifier within one index artifact.
///
/// Ids are assigned sequentially (0-based) by the build pipeline in chunk
/// order, so a `ChunkId` doubles as the chunk's position in the metadata
/// table. Ids are only meaningful relative to the artifact they were built
/// with; a rebuild reassigns them from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(u64);

impl ChunkId {
    /// Creates a ChunkId from a raw u64 value.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value of this id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// One indexed chunk: a bounded, page-scoped window of manual text.
///
/// `start_offset`/`end_offset` are character offsets into the originating
/// page's text, kept for traceability back to the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk identifier (also its position in the metadata table)
    pub id: ChunkId,
    /// Chunk text (never crosses a page boundary)
    pub text: String,
    /// Page the text originated from (1-based, as extracted)
    pub page_number: u32,
    /// Character offset of the chunk's first character within the page text
    pub start_offset: usize,
    /// Character offset one past the chunk's last character
    pub end_offset: usize,
}

/// Which retrieval leg produced a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSource {
    /// Vector similarity only
    Semantic,
    /// Lexical word overlap only
    Keyword,
    /// Both legs agreed on this chunk
    Both,
}

/// A single ranked hit from [`hybrid_search`](super::HybridRanker::hybrid_search).
///
/// Ephemeral: produced per query, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Chunk identifier within the loaded artifact
    pub chunk_id: ChunkId,
    /// Chunk text, copied from the metadata table
    pub text: String,
    /// Page the chunk came from
    pub page_number: u32,
    /// Merged relevance score in [0, 1]
    pub score: f32,
    /// Which leg(s) retrieved this chunk
    pub source: MatchSource,
}

/// Error types for search operations.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Query embedding failed; semantic search is meaningless without it
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Vector dimension disagrees with the index
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was built with
        expected: usize,
        /// Dimension actually received
        actual: usize,
    },
}

/// Validates that an embedding has the expected dimension.
pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), SearchError> {
    if actual == expected {
        Ok(())
    } else {
        Err(SearchError::DimensionMismatch { expected, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_roundtrip() {
        let id = ChunkId::from_u64(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(id, ChunkId::from_u64(42));
    }

    #[test]
    fn test_chunk_id_ordering() {
        // Ascending-id tie-breaks in the ranker rely on Ord
        assert!(ChunkId::from_u64(1) < ChunkId::from_u64(2));
    }

    #[test]
    fn test_validate_dimension() {
        assert!(validate_dimension(3, 3).is_ok());
        assert!(matches!(
            validate_dimension(3, 5),
            Err(SearchError::DimensionMismatch {
                expected: 3,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_chunk_record_serde_roundtrip() {
        let record = ChunkRecord {
            id: ChunkId::from_u64(7),
            text: "remove the drain plug".to_string(),
            page_number: 212,
            start_offset: 800,
            end_offset: 1800,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ChunkRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
