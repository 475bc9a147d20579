//! Page-scoped overlapping character-window chunking.
//!
//! Pages are chunked independently so no chunk ever crosses a page boundary;
//! the page number attached to each chunk stays exact, which is what makes
//! search results citable ("see page 212"). Within a page, fixed-size
//! character windows advance by `target_size - overlap` so that text
//! straddling a window boundary is fully contained in at least one chunk.
//!
//! Chunking is pure and deterministic: the same pages and config always
//! produce the same chunk records, ids included.

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::BuildError;
use crate::search::{ChunkId, ChunkRecord};
use tracing::debug;

/// One page of extracted text, the unit of input to the build pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Page number as reported by the extraction step (1-based)
    pub number: u32,
    /// Plain text of the page; may be empty for diagram-only pages
    pub text: String,
}

impl Page {
    /// Convenience constructor.
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Chunking parameters. Sizes are in characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Window size in characters
    pub target_size: usize,
    /// Characters shared between consecutive windows of the same page
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidChunking`] when `target_size` is zero or
    /// `overlap >= target_size` (the window would never advance).
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.target_size == 0 {
            return Err(BuildError::InvalidChunking(
                "target_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.target_size {
            return Err(BuildError::InvalidChunking(format!(
                "overlap ({}) must be smaller than target_size ({})",
                self.overlap, self.target_size
            )));
        }
        Ok(())
    }
}

/// Splits pages into overlapping chunks.
///
/// Each page is windowed independently: windows are `target_size` characters
/// wide and advance by `target_size - overlap` characters, so the final
/// window of a page may be shorter. Whitespace-only windows are skipped
/// without consuming an id; kept text is not trimmed, so
/// `page.text[start_offset..end_offset]` (in characters) reproduces the chunk
/// exactly. Ids are assigned sequentially from zero across all emitted
/// chunks.
///
/// # Errors
///
/// Returns [`BuildError::InvalidChunking`] for an unusable config. An empty
/// page list or all-whitespace input yields an empty vector; the pipeline is
/// responsible for rejecting that as [`BuildError::EmptyInput`].
pub fn chunk_pages(pages: &[Page], config: &ChunkerConfig) -> Result<Vec<ChunkRecord>, BuildError> {
    config.validate()?;

    let step = config.target_size - config.overlap;
    let mut chunks = Vec::new();
    let mut next_id: u64 = 0;

    for page in pages {
        // Byte offsets of every char boundary, plus the end of the string, so
        // windows can be sliced without splitting a multi-byte character.
        let boundaries: Vec<usize> = page
            .text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(page.text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let mut start = 0usize;
        while start < char_count {
            let end = std::cmp::min(start + config.target_size, char_count);
            let text = &page.text[boundaries[start]..boundaries[end]];

            if !text.trim().is_empty() {
                chunks.push(ChunkRecord {
                    id: ChunkId::from_u64(next_id),
                    text: text.to_string(),
                    page_number: page.number,
                    start_offset: start,
                    end_offset: end,
                });
                next_id += 1;
            }

            if end == char_count {
                break;
            }
            start += step;
        }
    }

    debug!(
        pages = pages.len(),
        chunks = chunks.len(),
        target_size = config.target_size,
        overlap = config.overlap,
        "chunked pages"
    );

    Ok(chunks)
}
