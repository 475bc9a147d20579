//! Default tuning constants.
//!
//! These values define the production defaults for chunking, embedding, and
//! hybrid ranking. Component config structs (`ChunkerConfig`, `MergePolicy`,
//! `SentenceEncoderConfig`) pull their `Default` impls from here so the
//! numbers live in one place.

// =============================================================================
// Chunking
// =============================================================================

/// Target chunk size in characters.
///
/// Roughly a third of a dense manual page. Large enough to hold a complete
/// procedure step, small enough that a single chunk stays on topic.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Overlap between consecutive chunks of the same page, in characters.
///
/// Keeps sentences that straddle a chunk boundary fully present in at least
/// one chunk. Must stay below [`DEFAULT_CHUNK_SIZE`].
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

// =============================================================================
// Embedding model
// =============================================================================

/// Default embedding model identity.
///
/// Multilingual sentence encoder: manuals are usually English while queries
/// arrive in whatever language the operator speaks.
pub const DEFAULT_MODEL_ID: &str =
    "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2";

/// Embedding dimension produced by the default model.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Maximum token sequence length fed to the encoder.
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 512;

/// Number of chunk texts embedded per inference batch.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 32;

// =============================================================================
// Hybrid ranking
// =============================================================================

/// Weight of the semantic (vector) leg in the merged score.
pub const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.6;

/// Weight of the keyword (lexical) leg in the merged score.
pub const DEFAULT_KEYWORD_WEIGHT: f32 = 0.4;

/// Oversampling factor: each leg is queried for `k * oversample` candidates
/// so the merge step has room to re-rank.
pub const DEFAULT_OVERSAMPLE: usize = 2;

/// Minimum semantic score for a vector hit to become a merge candidate.
///
/// With `score = 1 / (1 + distance)` and cosine distance in [0, 2], a value
/// of 0.5 admits everything at or above zero cosine similarity and drops
/// anti-correlated vectors.
pub const DEFAULT_MIN_SEMANTIC_SCORE: f32 = 0.5;

/// Default number of results returned to the caller.
pub const DEFAULT_TOP_K: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_below_chunk_size() {
        assert!(DEFAULT_CHUNK_OVERLAP < DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_merge_weights_sum_to_one() {
        let sum = DEFAULT_SEMANTIC_WEIGHT + DEFAULT_KEYWORD_WEIGHT;
        assert!((sum - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_oversample_at_least_one() {
        assert!(DEFAULT_OVERSAMPLE >= 1);
    }
}
