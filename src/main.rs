use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod bookmarks;
mod cli;
mod config;
mod engine;
mod storage;
#[cfg(test)]
mod tests;

use bookmarks::SourceDocument;
use config::Config;
use engine::cancel::SearchCoordinator;
use engine::dispatch::{SearchDispatcher, SearchMode, SearchOutcome};
use engine::embeddings::{Embedder, OpenAiProvider};
use engine::store::{load_or_fresh, ChunkStore, DatasetStorage};
use engine::sync::{Indexer, SyncOutcome};
use storage::BackendLocal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let args = cli::Args::parse();

    let config = Config::load_with(&args.base_dir)?;
    let api_key = Config::api_key()?;

    let provider = OpenAiProvider::new(
        &api_key,
        &config.embedding.endpoint,
        &config.embedding.model,
        config.embedding.dimensions,
        Duration::from_secs(config.embedding.request_timeout_secs),
    )?;
    let embedder = Embedder::new(Arc::new(provider));

    let backend = BackendLocal::new(config.base_path())?;
    let storage = DatasetStorage::new(Arc::new(backend));
    let dataset = load_or_fresh(&storage, embedder.model_id(), embedder.dimensions())?;
    tracing::debug!(
        sources = dataset.sources.len(),
        chunks = dataset.chunks.len(),
        "dataset ready"
    );
    let store = Arc::new(ChunkStore::new(dataset));

    let coordinator = SearchCoordinator::new();

    match args.command {
        cli::Command::Sync { input } => {
            let raw = fs::read_to_string(&input)
                .with_context(|| format!("reading bookmark export {input}"))?;
            let documents: Vec<SourceDocument> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing bookmark export {input}"))?;

            let indexer = Indexer::new(
                embedder,
                config.chunking.clone(),
                store.clone(),
                storage,
            );
            let token = coordinator.issue();
            match indexer.sync(&documents, &token).await? {
                SyncOutcome::Completed(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                SyncOutcome::Aborted => bail!("sync was superseded"),
            }
            Ok(())
        }

        cli::Command::Search { query, mode, top_n } => {
            let mode: SearchMode = mode.parse()?;
            let dispatcher = SearchDispatcher::new(
                store,
                embedder,
                top_n.unwrap_or(config.search.top_n),
                Duration::from_millis(config.search.debounce_ms),
            );

            let token = coordinator.issue();
            match dispatcher.search(&query, mode, &token).await? {
                SearchOutcome::Completed(results) => {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
                SearchOutcome::Aborted => bail!("search was superseded"),
            }
            Ok(())
        }

        cli::Command::Info {} => {
            let dataset = store.snapshot();
            let summary = serde_json::json!({
                "model": embedder.model(),
                "dimensions": dataset.dimensions,
                "sources": dataset.sources.len(),
                "chunks": dataset.chunks.len(),
                "base_dir": config.base_path(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}
