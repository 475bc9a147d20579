// rust-cv/hnsw vector index over chunk embeddings

use super::types::{validate_dimension, ChunkId, SearchError};
use hnsw::{Hnsw, Searcher};
use space::{Metric, Neighbor};
use tracing::instrument;

/// Minimum ef_search parameter for HNSW queries.
///
/// ef_search controls the recall/speed tradeoff. We use
/// `max(k * 2, MIN_EF_SEARCH)` so quality scales with the requested result
/// count without dropping below a useful floor.
const MIN_EF_SEARCH: usize = 50;

/// Cosine distance metric for embedding vectors.
///
/// Computes `1 - cosine_similarity` (range [0, 2]) and scales it to u32 as
/// the hnsw crate requires an integer distance unit.
struct CosineDistance;

/// Scale factor between f32 cosine distance in [0, 2] and the u32 unit.
const DISTANCE_SCALE: f32 = u32::MAX as f32 / 2.0;

impl Metric<Box<[f32]>> for CosineDistance {
    type Unit = u32;

    fn distance(&self, a: &Box<[f32]>, b: &Box<[f32]>) -> u32 {
        let a: &[f32] = a;
        let b: &[f32] = b;

        let dot: f32 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
        let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = b.iter().map(|y| y * y).sum::<f32>().sqrt();

        if mag_a == 0.0 || mag_b == 0.0 {
            // Zero vectors match nothing
            return u32::MAX;
        }

        let distance = 1.0 - dot / (mag_a * mag_b);
        (distance * DISTANCE_SCALE) as u32
    }
}

/// Converts a raw cosine distance to a bounded relevance score.
///
/// `score = 1 / (1 + d)`: identical vectors (d = 0) score 1.0 and the score
/// decreases monotonically toward 1/3 at the maximum cosine distance of 2.
/// The hybrid ranker compares this against the lexical score on the same
/// [0, 1] scale, so the mapping must stay stable across runs.
pub fn distance_to_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Vector index over chunk embeddings using HNSW
/// (Hierarchical Navigable Small World graphs).
///
/// Built once per artifact and immutable afterwards: the index is populated
/// during the build phase (or when reloading a persisted artifact) and then
/// only queried. Queries take `&self` and allocate their own searcher, so
/// concurrent read-only queries need no locking.
///
/// # HNSW parameters
///
/// - **M = 16**: bidirectional links per node at layers > 0.
/// - **M0 = 32**: links at layer 0 (2*M per standard practice).
///
/// Reference: Malkov & Yashunin (2018), arXiv:1603.09320.
pub struct VectorIndex {
    /// HNSW graph. Type parameters: <Metric, Data, RNG, M, M0>.
    index: Hnsw<CosineDistance, Box<[f32]>, rand::rngs::StdRng, 16, 32>,
    /// Map from HNSW insertion position to ChunkId
    chunk_ids: Vec<ChunkId>,
    /// Dimensionality of stored embeddings
    dimension: usize,
}

impl VectorIndex {
    /// Creates an empty vector index for embeddings of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            index: Hnsw::new(CosineDistance),
            chunk_ids: Vec::new(),
            dimension,
        }
    }

    /// Inserts a chunk embedding.
    ///
    /// HNSW supports incremental insertion, so build cost is paid per chunk
    /// rather than in a final rebuild step.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::DimensionMismatch`] if the embedding width
    /// disagrees with the index.
    #[instrument(skip_all, fields(index_size = self.chunk_ids.len()))]
    pub fn insert(&mut self, chunk_id: ChunkId, embedding: Vec<f32>) -> Result<(), SearchError> {
        validate_dimension(self.dimension, embedding.len())?;

        let mut searcher = Searcher::default();
        self.chunk_ids.push(chunk_id);
        self.index
            .insert(embedding.into_boxed_slice(), &mut searcher);
        Ok(())
    }

    /// Searches for the `k` nearest chunks to the query embedding.
    ///
    /// Returns `(ChunkId, distance)` pairs sorted by ascending cosine
    /// distance (ties broken by ascending chunk id for determinism). Returns
    /// fewer than `k` pairs when the index holds fewer chunks, and an empty
    /// vector for an empty index or `k == 0`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::DimensionMismatch`] if the query embedding
    /// width disagrees with the index.
    pub fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(ChunkId, f32)>, SearchError> {
        validate_dimension(self.dimension, query_embedding.len())?;

        if self.chunk_ids.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        let actual_k = std::cmp::min(k, self.chunk_ids.len());
        let mut neighbors = vec![
            Neighbor {
                index: !0,
                distance: !0,
            };
            actual_k
        ];

        let ef_search = std::cmp::max(k * 2, MIN_EF_SEARCH);
        let query_box = query_embedding.to_vec().into_boxed_slice();

        // A fresh searcher per query keeps `search` a &self operation
        let mut searcher = Searcher::default();
        self.index
            .nearest(&query_box, ef_search, &mut searcher, &mut neighbors);

        let mut results: Vec<(ChunkId, f32)> = neighbors
            .into_iter()
            .filter(|n| n.index != !0)
            .map(|n| {
                let distance = n.distance as f32 / DISTANCE_SCALE;
                (self.chunk_ids[n.index], distance)
            })
            .collect();

        results.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(results)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunk_ids.len()
    }

    /// Returns `true` if no chunks have been indexed.
    pub fn is_empty(&self) -> bool {
        self.chunk_ids.is_empty()
    }

    /// Embedding dimension this index was created with.
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_first() {
        let mut index = VectorIndex::new(3);
        index
            .insert(ChunkId::from_u64(1), vec![1.0, 0.0, 0.0])
            .unwrap();
        index
            .insert(ChunkId::from_u64(2), vec![0.0, 1.0, 0.0])
            .unwrap();
        index
            .insert(ChunkId::from_u64(3), vec![1.0, 0.1, 0.0])
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, ChunkId::from_u64(1));
        assert_eq!(results[1].0, ChunkId::from_u64(3));
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(3);
        let results = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_k_zero_returns_empty() {
        let mut index = VectorIndex::new(3);
        index
            .insert(ChunkId::from_u64(1), vec![1.0, 0.0, 0.0])
            .unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_k_clamped_to_index_size() {
        let mut index = VectorIndex::new(3);
        index
            .insert(ChunkId::from_u64(1), vec![1.0, 0.0, 0.0])
            .unwrap();
        index
            .insert(ChunkId::from_u64(2), vec![0.0, 1.0, 0.0])
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_distances_ascending() {
        let mut index = VectorIndex::new(3);
        for i in 0..20u64 {
            let angle = i as f32 * 0.05;
            index
                .insert(ChunkId::from_u64(i), vec![angle.cos(), angle.sin(), 0.0])
                .unwrap();
        }

        let results = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 10);
        for pair in results.windows(2) {
            assert!(pair[0].1 <= pair[1].1, "distances must be ascending");
        }
    }

    #[test]
    fn test_insert_dimension_mismatch() {
        let mut index = VectorIndex::new(3);
        let result = index.insert(ChunkId::from_u64(1), vec![1.0, 0.0]);
        assert!(matches!(
            result,
            Err(SearchError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let mut index = VectorIndex::new(3);
        index
            .insert(ChunkId::from_u64(1), vec![1.0, 0.0, 0.0])
            .unwrap();
        let result = index.search(&[1.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(SearchError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_distance_to_score_mapping() {
        assert!((distance_to_score(0.0) - 1.0).abs() < f32::EPSILON);
        assert!((distance_to_score(1.0) - 0.5).abs() < f32::EPSILON);
        // Monotonically decreasing, bounded
        assert!(distance_to_score(0.1) > distance_to_score(0.2));
        assert!(distance_to_score(2.0) > 0.0);
        // Negative distances from float error clamp to a score of 1.0
        assert!((distance_to_score(-0.001) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_exact_match_distance_near_zero() {
        let mut index = VectorIndex::new(3);
        let embedding = vec![0.5, 0.3, 0.2];
        index
            .insert(ChunkId::from_u64(1), embedding.clone())
            .unwrap();

        let results = index.search(&embedding, 1).unwrap();
        assert_eq!(results.len(), 1);
        assert!(
            distance_to_score(results[0].1) > 0.95,
            "exact match should score ~1.0, got {}",
            distance_to_score(results[0].1)
        );
    }
}
