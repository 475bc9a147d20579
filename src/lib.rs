//! # Manualdex
//!
//! Hybrid retrieval engine for very large technical manuals (service manuals,
//! standards documents, equipment handbooks) that have been reduced to plain
//! text with page numbers by an external extraction step.
//!
//! The engine turns pages into overlapping fixed-size chunks, embeds each
//! chunk with a sentence-embedding model, and indexes the corpus twice: an
//! HNSW vector index for semantic similarity and a lexical word-overlap
//! matcher for exact keyword lookups (part numbers, torque specs, error
//! codes). At query time both legs run and a weighted merge produces a single
//! deduplicated, ranked result list.
//!
//! ## Modules
//!
//! - [`chunking`] - Page-scoped, overlapping character-window chunking
//! - [`embedding`] - Embedding provider trait and candle-based BERT encoder
//! - [`search`] - Vector index, lexical matcher, and the hybrid ranker
//! - [`storage`] - Durable two-file index artifact (vectors + chunk metadata)
//! - [`pipeline`] - One-shot build pipeline: chunk, embed, persist
//! - [`config`] - Default tuning constants
//! - [`error`] - Embedding and build error types
//! - [`test_utils`] - Deterministic hashing embedder for tests
//!
//! ## Typical lifecycle
//!
//! ```ignore
//! use manualdex::pipeline::IndexBuilder;
//! use manualdex::search::{HybridRanker, MergePolicy};
//! use manualdex::storage::IndexStore;
//! use std::sync::Arc;
//!
//! let store = IndexStore::new("./index");
//! let builder = IndexBuilder::default();
//!
//! // Build phase (one-time, or after the source document changes).
//! builder.build_and_save(&pages, embedder.as_ref(), &store)?;
//!
//! // Serving phase.
//! let artifact = store.load(embedder.model_id(), embedder.dimension())?;
//! let ranker = HybridRanker::from_artifact(
//!     Arc::clone(&embedder),
//!     artifact,
//!     MergePolicy::default(),
//! )?;
//! let results = ranker.hybrid_search("oil filter change interval", 5)?;
//! ```

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod pipeline;
pub mod search;
pub mod storage;
pub mod test_utils;
