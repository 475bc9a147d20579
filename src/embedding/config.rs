//! Sentence encoder configuration.

use crate::config::{
    DEFAULT_EMBEDDING_DIM, DEFAULT_EMBED_BATCH_SIZE, DEFAULT_MAX_SEQUENCE_LENGTH, DEFAULT_MODEL_ID,
};
use crate::error::EmbeddingError;

/// Configuration for [`BertSentenceEncoder`](super::BertSentenceEncoder).
///
/// `query_prefix`/`passage_prefix` support asymmetric models that expect
/// role markers (e.g. E5's `"query: "`/`"passage: "`). The default
/// paraphrase model is symmetric, so both default to empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceEncoderConfig {
    /// Model identity, e.g. a Hugging Face repo id
    pub model_id: String,
    /// Expected embedding dimension; verified against the model config
    pub dimension: usize,
    /// Token sequences longer than this are truncated
    pub max_sequence_length: usize,
    /// Texts embedded per forward pass
    pub batch_size: usize,
    /// Prepended to query texts before tokenization
    pub query_prefix: String,
    /// Prepended to passage texts before tokenization
    pub passage_prefix: String,
}

impl Default for SentenceEncoderConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            dimension: DEFAULT_EMBEDDING_DIM,
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
            query_prefix: String::new(),
            passage_prefix: String::new(),
        }
    }
}

impl SentenceEncoderConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::InvalidConfig`] for zero sizes or an empty
    /// model id.
    pub fn validate(&self) -> Result<(), EmbeddingError> {
        if self.model_id.is_empty() {
            return Err(EmbeddingError::InvalidConfig(
                "model_id must not be empty".to_string(),
            ));
        }
        if self.dimension == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "dimension must be greater than zero".to_string(),
            ));
        }
        if self.max_sequence_length == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "max_sequence_length must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(SentenceEncoderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_dimension() {
        let config = SentenceEncoderConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EmbeddingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_empty_model_id() {
        let config = SentenceEncoderConfig {
            model_id: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EmbeddingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let config = SentenceEncoderConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EmbeddingError::InvalidConfig(_))
        ));
    }
}
