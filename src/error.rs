//! Error types shared across the crate.
//!
//! Search-specific errors live in [`crate::search::types`] and storage errors
//! in [`crate::storage`], next to the code that raises them. This module holds
//! the embedding error type and the build pipeline's error taxonomy.

use crate::storage::StoreError;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Failed to load model weights or configuration
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    /// Failed to create a tensor during inference
    #[error("Failed to create tensor: {0}")]
    TensorCreation(String),
    /// Forward pass through the model failed
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    /// Failed to tokenize text
    #[error("Tokenization failed: {0}")]
    TokenizationFailed(String),
    /// Invalid encoder configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Tokenizer not available or initialization failed
    #[error("Tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),
}

/// Errors raised by the index build pipeline.
///
/// A failed build persists nothing: the index store is only written after the
/// whole artifact has been assembled and validated.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No pages, or no page contained any non-whitespace text
    #[error("no pages with text were supplied; nothing to index")]
    EmptyInput,
    /// Chunking parameters are unusable (e.g. overlap >= target size)
    #[error("invalid chunking parameters: {0}")]
    InvalidChunking(String),
    /// The embedding provider failed; a build without embeddings is useless
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Persisting the finished artifact failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
