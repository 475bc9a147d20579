//! Tokenizer wrapper for the sentence encoder.
//!
//! Wraps a HuggingFace tokenizer with truncation and batch padding
//! configured once at construction, so every encode call produces
//! rectangular id/mask matrices ready to become tensors.

use crate::error::EmbeddingError;
use tokenizers::tokenizer::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

/// One tokenized batch: token ids and attention masks, both
/// `batch x padded_len`.
pub struct EncodedBatch {
    /// Token ids per text, padded to the longest sequence in the batch
    pub ids: Vec<Vec<u32>>,
    /// 1 for real tokens, 0 for padding
    pub attention_masks: Vec<Vec<u32>>,
}

/// Handle for a configured tokenizer.
pub struct TokenizerHandle {
    tokenizer: Tokenizer,
    max_length: usize,
}

impl TokenizerHandle {
    /// Creates a tokenizer from serialized JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::TokenizerUnavailable`] if deserialization
    /// fails, or [`EmbeddingError::InvalidConfig`] if truncation or padding
    /// cannot be configured.
    pub fn from_bytes(tokenizer_bytes: &[u8], max_length: usize) -> Result<Self, EmbeddingError> {
        let mut tokenizer = Tokenizer::from_bytes(tokenizer_bytes).map_err(|e| {
            EmbeddingError::TokenizerUnavailable(format!("Failed to deserialize tokenizer: {}", e))
        })?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                stride: 0,
                strategy: TruncationStrategy::LongestFirst,
                direction: TruncationDirection::Right,
            }))
            .map_err(|e| {
                EmbeddingError::InvalidConfig(format!(
                    "Failed to configure tokenizer truncation: {}",
                    e
                ))
            })?;

        let pad_id = pad_token_id(&tokenizer);
        let pad_token = tokenizer
            .id_to_token(pad_id)
            .unwrap_or_else(|| "[PAD]".to_string());
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            direction: PaddingDirection::Right,
            pad_to_multiple_of: None,
            pad_id,
            pad_type_id: 0,
            pad_token,
        }));

        Ok(Self {
            tokenizer,
            max_length,
        })
    }

    /// Reads and deserializes a tokenizer file.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::TokenizerUnavailable`] if the file cannot
    /// be read, plus the errors of [`from_bytes`](Self::from_bytes).
    pub fn from_file(
        path: impl AsRef<std::path::Path>,
        max_length: usize,
    ) -> Result<Self, EmbeddingError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            EmbeddingError::TokenizerUnavailable(format!(
                "Failed to read tokenizer file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_bytes(&bytes, max_length)
    }

    /// Returns the configured maximum sequence length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Tokenizes a batch of texts with special tokens, truncation, and
    /// padding applied.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::TokenizationFailed`] if encoding fails or
    /// produces no tokens.
    pub fn encode_batch(&self, texts: &[String]) -> Result<EncodedBatch, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::TokenizationFailed(format!("Encoding failed: {}", e)))?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut attention_masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            if encoding.get_ids().is_empty() {
                return Err(EmbeddingError::TokenizationFailed(
                    "Tokenizer returned no tokens".to_string(),
                ));
            }
            ids.push(encoding.get_ids().to_vec());
            attention_masks.push(encoding.get_attention_mask().to_vec());
        }

        Ok(EncodedBatch {
            ids,
            attention_masks,
        })
    }
}

impl Clone for TokenizerHandle {
    fn clone(&self) -> Self {
        Self {
            tokenizer: self.tokenizer.clone(),
            max_length: self.max_length,
        }
    }
}

/// Resolves the padding token id, trying the conventions of sentence-piece
/// and WordPiece vocabularies before falling back to 0.
fn pad_token_id(tokenizer: &Tokenizer) -> u32 {
    tokenizer
        .token_to_id("<pad>")
        .or_else(|| tokenizer.token_to_id("[PAD]"))
        .unwrap_or(0)
}
