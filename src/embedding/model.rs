//! Candle-based BERT sentence encoder.
//!
//! Runs a sentence-transformers style BERT encoder (default:
//! paraphrase-multilingual-MiniLM-L12-v2) with masked mean pooling and L2
//! normalization, so cosine distance between outputs behaves as the model
//! card intends.

use super::config::SentenceEncoderConfig;
use super::tokenizer::{EncodedBatch, TokenizerHandle};
use super::traits::EmbeddingProvider;
use crate::error::EmbeddingError;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use std::path::Path;
use tracing::{debug, info};

/// BERT sentence encoder backed by Candle.
///
/// Inference is CPU/GPU depending on what the host offers (CUDA, then
/// Metal, then CPU). The model is loaded once and shared; `embed_*` methods
/// take `&self` and are safe to call from multiple threads.
pub struct BertSentenceEncoder {
    model: BertModel,
    tokenizer: TokenizerHandle,
    config: SentenceEncoderConfig,
    device: Device,
}

impl BertSentenceEncoder {
    /// Loads the encoder from Hugging Face snapshot files: `config.json`,
    /// `tokenizer.json`, and `model.safetensors`.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::ModelLoad`] if weights or model config
    /// cannot be read, [`EmbeddingError::TokenizerUnavailable`] for
    /// tokenizer problems, and [`EmbeddingError::InvalidConfig`] if the
    /// model's hidden size disagrees with the configured dimension.
    pub fn from_files(
        model_config_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        weights_path: impl AsRef<Path>,
        config: SentenceEncoderConfig,
    ) -> Result<Self, EmbeddingError> {
        config.validate()?;
        info!(model_id = %config.model_id, "loading sentence encoder");

        let model_config: Config = {
            let bytes = std::fs::read(model_config_path.as_ref()).map_err(|e| {
                EmbeddingError::ModelLoad(format!(
                    "Failed to read model config {}: {}",
                    model_config_path.as_ref().display(),
                    e
                ))
            })?;
            serde_json::from_slice(&bytes).map_err(|e| {
                EmbeddingError::ModelLoad(format!("Failed to parse model config: {}", e))
            })?
        };

        if model_config.hidden_size != config.dimension {
            return Err(EmbeddingError::InvalidConfig(format!(
                "model hidden size ({}) does not match configured dimension ({})",
                model_config.hidden_size, config.dimension
            )));
        }

        let tokenizer = TokenizerHandle::from_file(tokenizer_path, config.max_sequence_length)?;

        let device = Self::select_device();
        let weights = std::fs::read(weights_path.as_ref()).map_err(|e| {
            EmbeddingError::ModelLoad(format!(
                "Failed to read model weights {}: {}",
                weights_path.as_ref().display(),
                e
            ))
        })?;
        let vb = VarBuilder::from_buffered_safetensors(weights, DTYPE, &device)
            .map_err(|e| EmbeddingError::ModelLoad(format!("Failed to create VarBuilder: {}", e)))?;
        let model = BertModel::load(vb, &model_config)
            .map_err(|e| EmbeddingError::ModelLoad(format!("Failed to create BertModel: {}", e)))?;

        info!(
            hidden_size = model_config.hidden_size,
            layers = model_config.num_hidden_layers,
            "sentence encoder ready"
        );

        Ok(Self {
            model,
            tokenizer,
            config,
            device,
        })
    }

    /// Selects the best available compute device: CUDA, then Metal, then
    /// CPU.
    pub fn select_device() -> Device {
        if let Ok(cuda) = Device::new_cuda(0) {
            info!("Using CUDA GPU");
            return cuda;
        }
        if let Ok(metal) = Device::new_metal(0) {
            info!("Using Metal GPU");
            return metal;
        }
        info!("Using CPU");
        Device::Cpu
    }

    /// Encoder configuration.
    pub fn config(&self) -> &SentenceEncoderConfig {
        &self.config
    }

    /// Embeds one padded batch of texts.
    fn forward_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let EncodedBatch {
            ids,
            attention_masks,
        } = self.tokenizer.encode_batch(texts)?;
        let batch = ids.len();
        let seq_len = ids[0].len();

        let flat_ids: Vec<u32> = ids.into_iter().flatten().collect();
        let flat_masks: Vec<u32> = attention_masks.into_iter().flatten().collect();

        let input_ids = Tensor::from_vec(flat_ids, (batch, seq_len), &self.device)
            .map_err(|e| EmbeddingError::TensorCreation(format!("input ids: {}", e)))?;
        let attention_mask = Tensor::from_vec(flat_masks, (batch, seq_len), &self.device)
            .map_err(|e| EmbeddingError::TensorCreation(format!("attention mask: {}", e)))?;
        let token_type_ids = input_ids
            .zeros_like()
            .map_err(|e| EmbeddingError::TensorCreation(format!("token type ids: {}", e)))?;

        // [batch, seq_len] -> [batch, seq_len, hidden]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Forward pass failed: {}", e)))?;

        let pooled = Self::masked_mean_pool(&hidden, &attention_mask)?;
        let normalized = Self::normalize_l2(&pooled)?;

        normalized
            .to_vec2::<f32>()
            .map_err(|e| EmbeddingError::InferenceFailed(format!("Failed to convert to vec: {}", e)))
    }

    /// Mean-pools token embeddings, ignoring padding positions.
    ///
    /// `hidden` is `[batch, seq_len, hidden]`, `attention_mask` is
    /// `[batch, seq_len]` with 1 on real tokens.
    fn masked_mean_pool(
        hidden: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, EmbeddingError> {
        let infer = |e| EmbeddingError::InferenceFailed(format!("Pooling failed: {}", e));

        let mask = attention_mask
            .to_dtype(DTYPE)
            .map_err(infer)?
            .unsqueeze(2)
            .map_err(infer)?;
        let summed = hidden
            .broadcast_mul(&mask)
            .map_err(infer)?
            .sum(1)
            .map_err(infer)?;
        // At least one real token per sequence is guaranteed by the
        // tokenizer's special tokens, but clamp anyway
        let counts = mask
            .sum(1)
            .map_err(infer)?
            .clamp(1e-9, f64::INFINITY)
            .map_err(infer)?;
        summed.broadcast_div(&counts).map_err(infer)
    }

    /// L2-normalizes each row to a unit vector.
    fn normalize_l2(v: &Tensor) -> Result<Tensor, EmbeddingError> {
        let infer = |e| EmbeddingError::InferenceFailed(format!("Normalization failed: {}", e));
        let norms = v
            .sqr()
            .map_err(infer)?
            .sum_keepdim(1)
            .map_err(infer)?
            .sqrt()
            .map_err(infer)?;
        v.broadcast_div(&norms).map_err(infer)
    }
}

impl EmbeddingProvider for BertSentenceEncoder {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn embed_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            let prefixed: Vec<String> = batch
                .iter()
                .map(|t| format!("{}{}", self.config.passage_prefix, t))
                .collect();
            embeddings.extend(self.forward_batch(&prefixed)?);
            debug!(
                embedded = embeddings.len(),
                total = texts.len(),
                "passage embedding progress"
            );
        }
        Ok(embeddings)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let prefixed = format!("{}{}", self.config.query_prefix, text);
        let mut rows = self.forward_batch(&[prefixed])?;
        rows.pop().ok_or_else(|| {
            EmbeddingError::InferenceFailed("Model returned no embedding for query".to_string())
        })
    }
}
