//! Durable index artifact.
//!
//! A built index is persisted as two files in one directory:
//!
//! - `vectors.bin` - embeddings as a flat row-major f32 matrix with a small
//!   binary header (magic, schema version, dimension, row count)
//! - `chunks.json` - the manifest plus the chunk metadata table as JSON
//!
//! Writes go through temp files renamed into place, and a per-build nonce
//! written into both files pairs them: a crash mid-save leaves the previous
//! artifact, nothing, or a mismatched pair that loading rejects, never a
//! torn artifact served as valid. Loading cross-checks the two files against
//! each other and against the embedding model the caller intends to query
//! with; any disagreement is an error rather than silently wrong search
//! results.

use crate::search::ChunkRecord;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// File magic at the head of `vectors.bin`.
const VECTORS_MAGIC: &[u8; 4] = b"MDXV";

/// On-disk schema version. Bump on any incompatible layout change.
pub const SCHEMA_VERSION: u32 = 1;

const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.json";

/// Errors raised while persisting or loading an index artifact.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No artifact at the store path; the index must be (re)built
    #[error("index artifact missing at {path}")]
    Missing {
        /// Directory that was probed
        path: PathBuf,
    },
    /// Artifact files exist but are unreadable or internally inconsistent
    #[error("index artifact corrupt: {0}")]
    Corrupt(String),
    /// Artifact was written by an incompatible version of this crate
    #[error("schema version mismatch: artifact has v{found}, this build reads v{expected}")]
    SchemaVersionMismatch {
        /// Version this build reads
        expected: u32,
        /// Version found on disk
        found: u32,
    },
    /// Artifact was built with a different embedding model
    #[error("embedding model mismatch: artifact built with '{found}', loader expects '{expected}'")]
    ModelMismatch {
        /// Model the loader will query with
        expected: String,
        /// Model recorded in the artifact
        found: String,
    },
    /// Artifact vectors have a different dimension than the loader expects
    #[error("dimension mismatch: artifact has {found}, loader expects {expected}")]
    DimensionMismatch {
        /// Dimension the loader expects
        expected: usize,
        /// Dimension recorded in the artifact
        found: usize,
    },
    /// Underlying filesystem failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Artifact-level metadata, stored at the head of `chunks.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// On-disk schema version the artifact was written with
    pub schema_version: u32,
    /// Embedding model identity the vectors were produced by
    pub model_id: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Number of chunks (and embedding rows)
    pub chunk_count: usize,
    /// Build time, seconds since the Unix epoch
    pub built_at_unix_secs: u64,
    /// Random per-build nonce, also written into the vectors header.
    ///
    /// Pairs the two files: a crash between the two commit renames can leave
    /// a new vectors file next to stale metadata of the same shape, and the
    /// nonce comparison at load is what catches that.
    pub build_id: u64,
}

/// A fully loaded artifact, ready to assemble a
/// [`HybridRanker`](crate::search::HybridRanker) from.
#[derive(Debug, Clone)]
pub struct IndexArtifact {
    /// Artifact metadata
    pub manifest: IndexManifest,
    /// Chunk metadata table, in chunk-id order
    pub chunks: Vec<ChunkRecord>,
    /// Embedding rows; `embeddings[i]` belongs to `chunks[i]`
    pub embeddings: Vec<Vec<f32>>,
}

/// JSON payload of `chunks.json`.
#[derive(Serialize, Deserialize)]
struct ChunksFile {
    manifest: IndexManifest,
    chunks: Vec<ChunkRecord>,
}

/// Filesystem-backed store for one index artifact.
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns `true` if both artifact files are present.
    pub fn exists(&self) -> bool {
        self.dir.join(VECTORS_FILE).is_file() && self.dir.join(CHUNKS_FILE).is_file()
    }

    /// Persists a complete artifact, replacing any previous one.
    ///
    /// `embeddings[i]` must belong to `chunks[i]` and every row must have
    /// width `dimension`. Both files are written to temp paths and renamed
    /// into place; `chunks.json` is renamed last and acts as the commit
    /// point.
    #[instrument(skip_all, fields(dir = %self.dir.display(), chunks = chunks.len()))]
    pub fn save(
        &self,
        chunks: &[ChunkRecord],
        embeddings: &[Vec<f32>],
        model_id: &str,
        dimension: usize,
    ) -> Result<(), StoreError> {
        if chunks.len() != embeddings.len() {
            return Err(StoreError::Corrupt(format!(
                "chunk count ({}) does not match embedding row count ({})",
                chunks.len(),
                embeddings.len()
            )));
        }
        for row in embeddings {
            if row.len() != dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: dimension,
                    found: row.len(),
                });
            }
        }

        fs::create_dir_all(&self.dir)?;

        let manifest = IndexManifest {
            schema_version: SCHEMA_VERSION,
            model_id: model_id.to_string(),
            dimension,
            chunk_count: chunks.len(),
            built_at_unix_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            build_id: rand::random(),
        };

        let vectors_tmp = self.dir.join(format!("{VECTORS_FILE}.tmp"));
        let chunks_tmp = self.dir.join(format!("{CHUNKS_FILE}.tmp"));

        self.write_vectors(&vectors_tmp, embeddings, dimension, manifest.build_id)?;
        self.write_chunks(&chunks_tmp, &manifest, chunks)?;

        fs::rename(&vectors_tmp, self.dir.join(VECTORS_FILE))?;
        fs::rename(&chunks_tmp, self.dir.join(CHUNKS_FILE))?;

        info!(
            chunks = chunks.len(),
            dimension, "index artifact persisted"
        );
        Ok(())
    }

    /// Loads and validates the artifact.
    ///
    /// `expected_model` and `expected_dimension` describe the embedding
    /// provider the caller will query with; a mismatch means the artifact's
    /// vectors live in a different space and must be rebuilt.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Missing`] when either file is absent
    /// - [`StoreError::SchemaVersionMismatch`], [`StoreError::ModelMismatch`],
    ///   or [`StoreError::DimensionMismatch`] on a validation failure
    /// - [`StoreError::Corrupt`] when the files disagree with each other or
    ///   their own headers
    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    pub fn load(
        &self,
        expected_model: &str,
        expected_dimension: usize,
    ) -> Result<IndexArtifact, StoreError> {
        if !self.exists() {
            return Err(StoreError::Missing {
                path: self.dir.clone(),
            });
        }

        let (manifest, chunks) = self.read_chunks(&self.dir.join(CHUNKS_FILE))?;

        if manifest.schema_version != SCHEMA_VERSION {
            return Err(StoreError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: manifest.schema_version,
            });
        }
        if manifest.model_id != expected_model {
            return Err(StoreError::ModelMismatch {
                expected: expected_model.to_string(),
                found: manifest.model_id,
            });
        }
        if manifest.dimension != expected_dimension {
            return Err(StoreError::DimensionMismatch {
                expected: expected_dimension,
                found: manifest.dimension,
            });
        }
        if manifest.chunk_count != chunks.len() {
            return Err(StoreError::Corrupt(format!(
                "manifest records {} chunks but table holds {}",
                manifest.chunk_count,
                chunks.len()
            )));
        }

        // Ids double as positions in the chunk table; the ranker indexes by
        // them, so a gap or permutation must fail here, not at query time
        for (position, chunk) in chunks.iter().enumerate() {
            if chunk.id.as_u64() != position as u64 {
                return Err(StoreError::Corrupt(format!(
                    "chunk table position {} holds id {}; ids must be sequential from zero",
                    position,
                    chunk.id.as_u64()
                )));
            }
        }

        let embeddings = self.read_vectors(
            &self.dir.join(VECTORS_FILE),
            manifest.dimension,
            chunks.len(),
            manifest.build_id,
        )?;

        info!(chunks = chunks.len(), "index artifact loaded");
        Ok(IndexArtifact {
            manifest,
            chunks,
            embeddings,
        })
    }

    /// Deletes the artifact files if present. Leftover temp files from an
    /// interrupted save are removed too.
    pub fn clear(&self) -> Result<(), StoreError> {
        for name in [
            VECTORS_FILE,
            CHUNKS_FILE,
            &format!("{VECTORS_FILE}.tmp"),
            &format!("{CHUNKS_FILE}.tmp"),
        ] {
            let path = self.dir.join(name);
            if path.is_file() {
                fs::remove_file(&path)?;
                warn!(file = %path.display(), "removed index artifact file");
            }
        }
        Ok(())
    }

    fn write_vectors(
        &self,
        path: &Path,
        embeddings: &[Vec<f32>],
        dimension: usize,
        build_id: u64,
    ) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(VECTORS_MAGIC)?;
        writer.write_all(&SCHEMA_VERSION.to_le_bytes())?;
        writer.write_all(&(dimension as u32).to_le_bytes())?;
        writer.write_all(&(embeddings.len() as u64).to_le_bytes())?;
        writer.write_all(&build_id.to_le_bytes())?;
        for row in embeddings {
            for value in row {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn read_vectors(
        &self,
        path: &Path,
        dimension: usize,
        expected_rows: usize,
        expected_build_id: u64,
    ) -> Result<Vec<Vec<f32>>, StoreError> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|_| StoreError::Corrupt("vectors file truncated before header".into()))?;
        if &magic != VECTORS_MAGIC {
            return Err(StoreError::Corrupt(
                "vectors file has wrong magic bytes".into(),
            ));
        }

        let schema_version = read_u32(&mut reader)?;
        if schema_version != SCHEMA_VERSION {
            return Err(StoreError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: schema_version,
            });
        }

        let file_dimension = read_u32(&mut reader)? as usize;
        if file_dimension != dimension {
            return Err(StoreError::Corrupt(format!(
                "vectors file dimension ({file_dimension}) disagrees with manifest ({dimension})"
            )));
        }

        let rows = read_u64(&mut reader)? as usize;
        if rows != expected_rows {
            return Err(StoreError::Corrupt(format!(
                "vectors file holds {rows} rows but chunk table holds {expected_rows}"
            )));
        }

        let build_id = read_u64(&mut reader)?;
        if build_id != expected_build_id {
            return Err(StoreError::Corrupt(
                "vectors file and chunk table come from different builds".into(),
            ));
        }

        let mut embeddings = Vec::with_capacity(rows);
        let mut buf = [0u8; 4];
        for _ in 0..rows {
            let mut row = Vec::with_capacity(dimension);
            for _ in 0..dimension {
                reader
                    .read_exact(&mut buf)
                    .map_err(|_| StoreError::Corrupt("vectors file truncated mid-row".into()))?;
                row.push(f32::from_le_bytes(buf));
            }
            embeddings.push(row);
        }

        // The header fully determines the payload size
        if reader.read(&mut buf)? != 0 {
            return Err(StoreError::Corrupt(
                "vectors file has trailing bytes past the declared rows".into(),
            ));
        }

        Ok(embeddings)
    }

    fn write_chunks(
        &self,
        path: &Path,
        manifest: &IndexManifest,
        chunks: &[ChunkRecord],
    ) -> Result<(), StoreError> {
        let payload = ChunksFile {
            manifest: manifest.clone(),
            chunks: chunks.to_vec(),
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &payload)
            .map_err(|e| StoreError::Corrupt(format!("failed to serialize chunk table: {e}")))?;
        writer.flush()?;
        Ok(())
    }

    fn read_chunks(&self, path: &Path) -> Result<(IndexManifest, Vec<ChunkRecord>), StoreError> {
        let reader = BufReader::new(File::open(path)?);
        let payload: ChunksFile = serde_json::from_reader(reader)
            .map_err(|e| StoreError::Corrupt(format!("chunk table is not valid JSON: {e}")))?;
        Ok((payload.manifest, payload.chunks))
    }
}

fn read_u32(reader: &mut impl Read) -> Result<u32, StoreError> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| StoreError::Corrupt("vectors file truncated in header".into()))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> Result<u64, StoreError> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf)
        .map_err(|_| StoreError::Corrupt("vectors file truncated in header".into()))?;
    Ok(u64::from_le_bytes(buf))
}
