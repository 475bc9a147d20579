//! Search subsystem: vector index, lexical matcher, and the hybrid ranker
//! that merges them.

pub mod lexical;
pub mod ranker;
pub mod types;
pub mod vector;

pub use lexical::LexicalMatcher;
pub use ranker::{merge, HybridRanker, MergePolicy};
pub use types::{ChunkId, ChunkRecord, MatchSource, SearchError, SearchResult};
pub use vector::{distance_to_score, VectorIndex};
