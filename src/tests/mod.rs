mod search;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bookmarks::{BookmarkPath, SourceDocument};
use crate::engine::embeddings::{Embedder, EmbeddingProvider, ProviderError};
use crate::engine::store::{ChunkStore, DatasetStorage};
use crate::storage::BackendLocal;

/// In-process embedding provider for tests. Embeds each text with a
/// caller-supplied function and counts every batch call so tests can
/// assert on provider traffic.
pub struct StubProvider {
    dimensions: usize,
    delay: Duration,
    calls: AtomicUsize,
    embed_fn: Box<dyn Fn(&str) -> Vec<f32> + Send + Sync>,
}

impl StubProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            embed_fn: Box::new(move |text| byte_vector(text, dimensions)),
        }
    }

    /// Replace the embedding function, e.g. with keyword-directional
    /// vectors so similarity ordering is predictable.
    pub fn with_embed_fn(
        mut self,
        f: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static,
    ) -> Self {
        self.embed_fn = Box::new(f);
        self
    }

    /// Delay each batch call, to open a window for supersession races.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    fn model(&self) -> &str {
        "stub-model"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(texts.iter().map(|text| (self.embed_fn)(text)).collect())
    }
}

/// Deterministic vector derived from the text bytes. Distinct texts get
/// distinct directions often enough for ordering-free tests.
fn byte_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![1.0f32; dimensions];
    for (i, byte) in text.bytes().enumerate() {
        vector[i % dimensions] += byte as f32 / 255.0;
    }
    vector
}

/// Directional vectors over a fixed topic vocabulary: component k is
/// the number of occurrences of topic word k. Texts about the same
/// topic point the same way regardless of length.
pub fn topic_vector(text: &str, topics: &[&str]) -> Vec<f32> {
    let lowered = text.to_lowercase();
    topics
        .iter()
        .map(|topic| lowered.matches(topic).count() as f32)
        .collect()
}

pub fn document(url: &str, title: &str, body: &str, folders: &[&str]) -> SourceDocument {
    SourceDocument {
        url: url.to_string(),
        title: title.to_string(),
        body: body.to_string(),
        path: BookmarkPath::new(folders.iter().map(|s| s.to_string()).collect()),
    }
}

/// Fresh store + storage pair rooted in a temp directory. The temp dir
/// guard must outlive the test.
pub fn test_store(
    embedder: &Embedder,
) -> (Arc<ChunkStore>, DatasetStorage, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let backend =
        BackendLocal::new(tmp.path().to_str().unwrap()).expect("failed to create backend");
    let storage = DatasetStorage::new(Arc::new(backend));
    let dataset = crate::engine::store::load_or_fresh(
        &storage,
        embedder.model_id(),
        embedder.dimensions(),
    )
    .expect("failed to load dataset");
    (Arc::new(ChunkStore::new(dataset)), storage, tmp)
}
