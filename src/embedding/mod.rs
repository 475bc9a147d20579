//! Embedding subsystem: provider trait, tokenizer wrapper, and the
//! candle-based BERT sentence encoder.

pub mod config;
pub mod model;
pub mod tokenizer;
pub mod traits;

pub use config::SentenceEncoderConfig;
pub use model::BertSentenceEncoder;
pub use tokenizer::{EncodedBatch, TokenizerHandle};
pub use traits::EmbeddingProvider;
