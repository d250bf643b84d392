use serde::{Deserialize, Serialize};

use crate::storage::{BackendLocal, StorageManager};

/// Default chunk size in characters.
const DEFAULT_MAX_CHUNK_SIZE: usize = 5000;
/// Default trailing overlap repeated into the next chunk.
const DEFAULT_CHUNK_OVERLAP: usize = 500;
/// Default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";
/// Default embedding dimensionality.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1024;
/// Default OpenAI-compatible API base url.
const DEFAULT_EMBEDDING_ENDPOINT: &str = "https://api.openai.com/v1";
/// Default per-request timeout for the embedding provider.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// Default number of results returned by a search.
const DEFAULT_TOP_N: usize = 5;
/// Default debounce window before the semantic path runs.
const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Environment variable holding the embedding provider API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is malformed: {0}")]
    Malformed(String),

    #[error("chunking.overlap ({overlap}) must be smaller than chunking.max_chunk_size ({max_chunk_size})")]
    InvalidChunking { max_chunk_size: usize, overlap: usize },

    #[error("embedding.dimensions must be greater than 0")]
    InvalidDimensions,

    #[error("embedding.request_timeout_secs must be greater than 0")]
    InvalidTimeout,

    #[error("search.top_n must be greater than 0")]
    InvalidTopN,

    #[error("missing API key: set the {0} environment variable")]
    MissingApiKey(&'static str),
}

/// Chunking parameters for the sync pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Embedding provider configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model identifier (e.g. "text-embedding-3-large").
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Output dimensionality requested from the provider.
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Base url of the OpenAI-compatible API.
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Search behavior configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of results in semantic mode.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Debounce window in milliseconds before the semantic path runs.
    /// 0 disables debouncing.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimensions() -> usize {
    DEFAULT_EMBEDDING_DIMENSIONS
}

fn default_embedding_endpoint() -> String {
    DEFAULT_EMBEDDING_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    /// Validate parameters that would otherwise only fail deep inside the
    /// pipeline. Invalid values are a startup error, not a per-call one.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_chunk_size == 0 || self.chunking.overlap >= self.chunking.max_chunk_size
        {
            return Err(ConfigError::InvalidChunking {
                max_chunk_size: self.chunking.max_chunk_size,
                overlap: self.chunking.overlap,
            });
        }

        if self.embedding.dimensions == 0 {
            return Err(ConfigError::InvalidDimensions);
        }

        if self.embedding.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        if self.search.top_n == 0 {
            return Err(ConfigError::InvalidTopN);
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> Result<Self, ConfigError> {
        let store = BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists("config.yaml") {
            let default = serde_yml::to_string(&Self::default())
                .map_err(|e| ConfigError::Malformed(e.to_string()))?;
            store.write("config.yaml", default.as_bytes())?;
        }

        let config_str = String::from_utf8(store.read("config.yaml")?)
            .map_err(|_| ConfigError::Malformed("config file is not valid utf8".to_string()))?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;

        config.base_path = base_path.to_string();
        config.validate()?;

        Ok(config)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Read the provider API key from the environment.
    pub fn api_key() -> Result<String, ConfigError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey(API_KEY_ENV)),
        }
    }
}
