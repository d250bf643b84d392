//! Indexed chunk dataset: in-memory store and JSON persistence.
//!
//! The dataset is replaced wholesale by a sync and is read-only during
//! search. Publication happens through a single reference swap, so a
//! search in flight keeps reading either the fully-old or the fully-new
//! dataset, never a mix.
//!
//! On disk the dataset is one JSON document with a versioned envelope.
//! The envelope carries the format version, the model fingerprint and
//! the dimensionality; a mismatch on any of them invalidates the stored
//! vectors instead of silently mixing vector spaces.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::bookmarks::BookmarkPath;
use crate::storage::StorageManager;

/// Dataset file name under the base directory.
pub const DATASET_FILE: &str = "dataset.json";

/// Current dataset file format version.
const FORMAT_VERSION: u32 = 1;

/// Indexed metadata for one bookmark source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceRecord {
    pub url: String,
    pub title: String,
    pub path: BookmarkPath,
    /// Packed text exact/fuzzy search match against.
    pub search_text: String,
}

/// One bounded slice of a source's body text with its embedding.
///
/// `index` is the chunk's ordinal position within its source, kept for
/// stable ordering and debugging only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub source_url: String,
    pub index: usize,
    pub text: String,
    pub vector: Vec<f32>,
}

/// The complete indexed dataset for one sync generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkDataset {
    /// Configured embedding dimensionality when this dataset was built.
    pub dimensions: usize,
    /// Fingerprint of the embedding model that produced the vectors.
    pub model_id: [u8; 32],
    pub sources: Vec<SourceRecord>,
    pub chunks: Vec<Chunk>,
}

impl ChunkDataset {
    pub fn empty(dimensions: usize, model_id: [u8; 32]) -> Self {
        Self {
            dimensions,
            model_id,
            sources: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// True when there is nothing to search semantically.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Source metadata keyed by url, for per-query lookups.
    pub fn source_map(&self) -> HashMap<&str, &SourceRecord> {
        self.sources
            .iter()
            .map(|source| (source.url.as_str(), source))
            .collect()
    }
}

/// In-memory holder of the published dataset.
///
/// Readers take a snapshot (a cheap `Arc` clone); the sync pipeline
/// replaces the whole dataset in one swap.
pub struct ChunkStore {
    inner: RwLock<Arc<ChunkDataset>>,
}

impl ChunkStore {
    pub fn new(dataset: ChunkDataset) -> Self {
        Self {
            inner: RwLock::new(Arc::new(dataset)),
        }
    }

    /// Snapshot of the currently published dataset.
    pub fn snapshot(&self) -> Arc<ChunkDataset> {
        Arc::clone(&self.inner.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Publish a new dataset, replacing the prior one atomically.
    pub fn replace(&self, dataset: ChunkDataset) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(dataset);
    }
}

/// Errors from dataset persistence.
#[derive(Debug, thiserror::Error)]
pub enum DatasetStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("dataset format version {0} is not supported")]
    VersionMismatch(u32),

    #[error("dataset was produced by a different embedding model")]
    ModelMismatch,

    #[error("dataset dimensions {got} do not match configured {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

#[derive(Serialize, Deserialize)]
struct DatasetFile {
    version: u32,
    dataset: ChunkDataset,
}

/// Persists the dataset as one JSON document through a storage backend.
#[derive(Clone)]
pub struct DatasetStorage {
    backend: Arc<dyn StorageManager>,
}

impl DatasetStorage {
    pub fn new(backend: Arc<dyn StorageManager>) -> Self {
        Self { backend }
    }

    pub fn exists(&self) -> bool {
        self.backend.exists(DATASET_FILE)
    }

    /// Load and validate the persisted dataset.
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<ChunkDataset, DatasetStorageError> {
        let bytes = self.backend.read(DATASET_FILE)?;
        let file: DatasetFile = serde_json::from_slice(&bytes)?;

        if file.version != FORMAT_VERSION {
            return Err(DatasetStorageError::VersionMismatch(file.version));
        }
        if file.dataset.model_id != *expected_model_id {
            return Err(DatasetStorageError::ModelMismatch);
        }
        if file.dataset.dimensions != expected_dimensions {
            return Err(DatasetStorageError::DimensionMismatch {
                expected: expected_dimensions,
                got: file.dataset.dimensions,
            });
        }

        Ok(file.dataset)
    }

    pub fn save(&self, dataset: &ChunkDataset) -> Result<(), DatasetStorageError> {
        let file = DatasetFile {
            version: FORMAT_VERSION,
            dataset: dataset.clone(),
        };
        let bytes = serde_json::to_vec(&file)?;
        self.backend.write(DATASET_FILE, &bytes)?;
        Ok(())
    }
}

/// Load the persisted dataset, or start fresh when there is none or the
/// stored one no longer matches the configured model/dimensions.
pub fn load_or_fresh(
    storage: &DatasetStorage,
    model_id: [u8; 32],
    dimensions: usize,
) -> Result<ChunkDataset, DatasetStorageError> {
    if !storage.exists() {
        log::info!("no existing dataset, starting fresh");
        return Ok(ChunkDataset::empty(dimensions, model_id));
    }

    match storage.load(&model_id, dimensions) {
        Ok(dataset) => {
            log::info!(
                "loaded dataset: {} sources, {} chunks",
                dataset.sources.len(),
                dataset.chunks.len()
            );
            Ok(dataset)
        }
        Err(DatasetStorageError::ModelMismatch) => {
            log::warn!("embedding model changed, discarding stored dataset");
            Ok(ChunkDataset::empty(dimensions, model_id))
        }
        Err(DatasetStorageError::DimensionMismatch { expected, got }) => {
            log::warn!("dimensions changed ({got} -> {expected}), discarding stored dataset");
            Ok(ChunkDataset::empty(dimensions, model_id))
        }
        Err(DatasetStorageError::VersionMismatch(version)) => {
            log::warn!("dataset format version {version} unsupported, discarding stored dataset");
            Ok(ChunkDataset::empty(dimensions, model_id))
        }
        Err(err) => Err(err),
    }
}
