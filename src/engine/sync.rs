//! Index synchronization: turn source documents into an embedded
//! chunk dataset and publish it atomically.

use std::sync::Arc;

use serde::Serialize;

use crate::bookmarks::{build_search_text, SourceDocument};
use crate::config::ChunkingConfig;
use crate::engine::cancel::CancelToken;
use crate::engine::chunker::chunk_document;
use crate::engine::embeddings::{Embedder, ProviderError};
use crate::engine::store::{Chunk, ChunkDataset, ChunkStore, DatasetStorage, DatasetStorageError, SourceRecord};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("embedding provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("dataset storage error: {0}")]
    Storage(#[from] DatasetStorageError),
}

/// Counts reported after a completed sync.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SyncReport {
    pub sources: usize,
    pub chunks: usize,
    pub skipped_empty: usize,
}

/// Outcome of a sync run. An aborted sync leaves the previously
/// published dataset untouched.
#[derive(Debug)]
pub enum SyncOutcome {
    Completed(SyncReport),
    Aborted,
}

/// Builds the dataset for a set of source documents.
pub struct Indexer {
    embedder: Embedder,
    chunking: ChunkingConfig,
    store: Arc<ChunkStore>,
    storage: DatasetStorage,
}

impl Indexer {
    pub fn new(
        embedder: Embedder,
        chunking: ChunkingConfig,
        store: Arc<ChunkStore>,
        storage: DatasetStorage,
    ) -> Self {
        Self {
            embedder,
            chunking,
            store,
            storage,
        }
    }

    /// Rebuild the dataset from scratch.
    ///
    /// Every source keeps a record for exact/fuzzy search even when its
    /// body produces no chunks. All chunk texts go to the provider in a
    /// single order-preserving batch; the dataset is persisted before it
    /// is published so a crash after sync never loses the index.
    pub async fn sync(
        &self,
        documents: &[SourceDocument],
        token: &CancelToken,
    ) -> Result<SyncOutcome, SyncError> {
        let mut sources = Vec::with_capacity(documents.len());
        let mut pending: Vec<(String, usize, String)> = Vec::new();
        let mut skipped_empty = 0usize;

        for doc in documents {
            sources.push(SourceRecord {
                url: doc.url.clone(),
                title: doc.title.clone(),
                path: doc.path.clone(),
                search_text: build_search_text(&doc.url, &doc.title, &doc.path),
            });

            let pieces = chunk_document(doc, self.chunking.max_chunk_size, self.chunking.overlap);
            if pieces.is_empty() {
                skipped_empty += 1;
                continue;
            }
            for (index, text) in pieces {
                pending.push((doc.url.clone(), index, text));
            }
        }

        let texts: Vec<String> = pending.iter().map(|(_, _, text)| text.clone()).collect();
        let Some(vectors) = self.embedder.embed(&texts, token).await? else {
            log::info!("sync superseded before embedding; dataset unchanged");
            return Ok(SyncOutcome::Aborted);
        };

        if token.is_cancelled() {
            log::info!("sync superseded after embedding; dataset unchanged");
            return Ok(SyncOutcome::Aborted);
        }

        let chunks: Vec<Chunk> = pending
            .into_iter()
            .zip(vectors)
            .map(|((source_url, index, text), vector)| Chunk {
                source_url,
                index,
                text,
                vector,
            })
            .collect();

        let report = SyncReport {
            sources: sources.len(),
            chunks: chunks.len(),
            skipped_empty,
        };

        let dataset = ChunkDataset {
            dimensions: self.embedder.dimensions(),
            model_id: self.embedder.model_id(),
            sources,
            chunks,
        };

        self.storage.save(&dataset)?;
        self.store.replace(dataset);

        log::info!(
            "sync complete: {} sources, {} chunks, {} empty bodies skipped",
            report.sources,
            report.chunks,
            report.skipped_empty
        );

        Ok(SyncOutcome::Completed(report))
    }
}
