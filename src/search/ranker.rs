//! Hybrid ranker: weighted merge of the semantic and lexical legs.
//!
//! Each leg is oversampled (`k * oversample` candidates) so the merge has
//! room to re-rank, then candidates are deduplicated by chunk id and scored
//! with a weighted sum. A chunk found by only one leg keeps a zero score on
//! the other, so agreement between legs always outranks a single-leg hit of
//! equal strength.

use super::lexical::LexicalMatcher;
use super::types::{ChunkId, ChunkRecord, MatchSource, SearchError, SearchResult};
use super::vector::{distance_to_score, VectorIndex};
use crate::config::{
    DEFAULT_KEYWORD_WEIGHT, DEFAULT_MIN_SEMANTIC_SCORE, DEFAULT_OVERSAMPLE,
    DEFAULT_SEMANTIC_WEIGHT,
};
use crate::embedding::EmbeddingProvider;
use crate::storage::IndexArtifact;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Tuning knobs for the hybrid merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergePolicy {
    /// Weight applied to the semantic (vector) score
    pub semantic_weight: f32,
    /// Weight applied to the keyword (lexical) score
    pub keyword_weight: f32,
    /// Each leg fetches `k * oversample` candidates before merging
    pub oversample: usize,
    /// Semantic hits below this score are dropped before merging
    pub min_semantic_score: f32,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            oversample: DEFAULT_OVERSAMPLE,
            min_semantic_score: DEFAULT_MIN_SEMANTIC_SCORE,
        }
    }
}

/// Merges per-leg candidate lists into a deduplicated ranked list.
///
/// `combined = semantic_weight * semantic + keyword_weight * keyword`, with a
/// missing leg contributing zero. Results are sorted by descending combined
/// score; exact ties are broken by ascending chunk id so rankings are stable
/// across runs.
pub fn merge(
    semantic: &[(ChunkId, f32)],
    keyword: &[(ChunkId, f32)],
    policy: &MergePolicy,
) -> Vec<(ChunkId, f32, MatchSource)> {
    let mut legs: HashMap<ChunkId, (Option<f32>, Option<f32>)> = HashMap::new();

    for &(id, score) in semantic {
        legs.entry(id).or_insert((None, None)).0 = Some(score);
    }
    for &(id, score) in keyword {
        legs.entry(id).or_insert((None, None)).1 = Some(score);
    }

    let mut merged: Vec<(ChunkId, f32, MatchSource)> = legs
        .into_iter()
        .map(|(id, (sem, kw))| {
            let source = match (sem, kw) {
                (Some(_), Some(_)) => MatchSource::Both,
                (Some(_), None) => MatchSource::Semantic,
                _ => MatchSource::Keyword,
            };
            let combined = policy.semantic_weight * sem.unwrap_or(0.0)
                + policy.keyword_weight * kw.unwrap_or(0.0);
            (id, combined, source)
        })
        .collect();

    merged.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    merged
}

/// Query-time engine over one loaded index artifact.
///
/// Owns the vector index, the lexical matcher, and the chunk metadata table.
/// All search methods take `&self`; the ranker can be shared behind an `Arc`
/// and queried concurrently.
pub struct HybridRanker {
    embedder: Arc<dyn EmbeddingProvider>,
    vector: VectorIndex,
    lexical: LexicalMatcher,
    chunks: Vec<ChunkRecord>,
    policy: MergePolicy,
}

impl HybridRanker {
    /// Assembles a ranker from chunks and their pre-computed embeddings.
    ///
    /// Chunk `i` must correspond to `embeddings[i]`; chunk ids are expected
    /// to be the sequential ids the build pipeline assigns.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::DimensionMismatch`] if any embedding disagrees
    /// with the provider's dimension.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        chunks: Vec<ChunkRecord>,
        embeddings: Vec<Vec<f32>>,
        policy: MergePolicy,
    ) -> Result<Self, SearchError> {
        let mut vector = VectorIndex::new(embedder.dimension());
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            vector.insert(chunk.id, embedding)?;
        }
        let lexical = LexicalMatcher::new(&chunks);

        debug!(chunks = chunks.len(), "hybrid ranker ready");
        Ok(Self {
            embedder,
            vector,
            lexical,
            chunks,
            policy,
        })
    }

    /// Assembles a ranker from a loaded index artifact.
    pub fn from_artifact(
        embedder: Arc<dyn EmbeddingProvider>,
        artifact: IndexArtifact,
        policy: MergePolicy,
    ) -> Result<Self, SearchError> {
        Self::new(embedder, artifact.chunks, artifact.embeddings, policy)
    }

    /// Runs both retrieval legs and returns the top `k` merged results.
    ///
    /// The semantic leg embeds the query and fetches nearest chunks by
    /// cosine distance, mapped to `1 / (1 + distance)` and thresholded by
    /// the policy's `min_semantic_score`. The lexical leg scores word
    /// overlap. Either leg may come back empty without failing the query;
    /// `k == 0` short-circuits to an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Embedding`] if the query cannot be embedded.
    #[instrument(skip(self))]
    pub fn hybrid_search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, SearchError> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(vec![]);
        }

        let fetch = k.saturating_mul(self.policy.oversample.max(1));

        let query_embedding = self.embedder.embed_query(query)?;
        let semantic: Vec<(ChunkId, f32)> = self
            .vector
            .search(&query_embedding, fetch)?
            .into_iter()
            .map(|(id, distance)| (id, distance_to_score(distance)))
            .filter(|&(_, score)| score >= self.policy.min_semantic_score)
            .collect();

        let keyword = self.lexical.search(query, fetch);

        debug!(
            semantic_hits = semantic.len(),
            keyword_hits = keyword.len(),
            "merging retrieval legs"
        );

        let results = merge(&semantic, &keyword, &self.policy)
            .into_iter()
            .take(k)
            .map(|(id, score, source)| {
                let record = &self.chunks[id.as_u64() as usize];
                SearchResult {
                    chunk_id: id,
                    text: record.text.clone(),
                    page_number: record.page_number,
                    score,
                    source,
                }
            })
            .collect();

        Ok(results)
    }

    /// Number of chunks in the loaded artifact.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the artifact holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
