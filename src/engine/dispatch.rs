//! Search dispatch across the three matching strategies.
//!
//! Each mode keeps its own hit type internally (exact hits carry no
//! score, fuzzy hits always do, semantic hits are full representatives);
//! everything is converted to one display-oriented record only at the
//! dispatcher boundary.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::engine::cancel::CancelToken;
use crate::engine::embeddings::{Embedder, ProviderError};
use crate::engine::representative::{
    display_title, rank, select_representatives, RepresentativeResult,
};
use crate::engine::similarity::score_chunks;
use crate::engine::store::{ChunkDataset, ChunkStore, SourceRecord};

/// Matching strategy for one query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    Exact,
    Fuzzy,
    Semantic,
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(SearchMode::Exact),
            "fuzzy" => Ok(SearchMode::Fuzzy),
            "semantic" => Ok(SearchMode::Semantic),
            other => Err(SearchError::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Exact => write!(f, "exact"),
            SearchMode::Fuzzy => write!(f, "fuzzy"),
            SearchMode::Semantic => write!(f, "semantic"),
        }
    }
}

/// Errors that can occur while dispatching a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("unsupported search mode: {0}")]
    UnsupportedMode(String),

    #[error("no indexed data available; run a sync first")]
    NoIndexedData,

    #[error("embedding provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Mode-specific hit, kept tagged until conversion at the boundary.
enum ModeHit<'a> {
    Exact { source: &'a SourceRecord },
    Fuzzy { source: &'a SourceRecord, score: f32 },
}

/// One normalized search result row, ready for display.
#[derive(Clone, Debug, Serialize)]
pub struct SearchResultItem {
    pub url: String,
    pub title: String,
    pub folder: String,
    /// Chunk preview for semantic hits; empty for exact/fuzzy.
    pub snippet: String,
    /// Absent for exact hits (inclusion is binary there).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Outcome of a dispatched search.
///
/// `Aborted` is an explicit signal distinct from an empty match set, so
/// superseded queries are never rendered as "zero results found".
#[derive(Debug)]
pub enum SearchOutcome {
    Completed(Vec<SearchResultItem>),
    Aborted,
}

impl SearchOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, SearchOutcome::Aborted)
    }
}

/// Routes a query to one matching strategy and normalizes the output.
pub struct SearchDispatcher {
    store: Arc<ChunkStore>,
    embedder: Embedder,
    top_n: usize,
    debounce: Duration,
}

impl SearchDispatcher {
    pub fn new(store: Arc<ChunkStore>, embedder: Embedder, top_n: usize, debounce: Duration) -> Self {
        Self {
            store,
            embedder,
            top_n,
            debounce,
        }
    }

    /// Run one query.
    ///
    /// Empty and whitespace-only queries complete immediately with no
    /// results, in every mode, without touching the embedder. A token
    /// superseded at any suspend point yields `Aborted` and the partial
    /// work is discarded.
    pub async fn search(
        &self,
        query: &str,
        mode: SearchMode,
        token: &CancelToken,
    ) -> Result<SearchOutcome, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchOutcome::Completed(vec![]));
        }
        if token.is_cancelled() {
            return Ok(SearchOutcome::Aborted);
        }

        let dataset = self.store.snapshot();

        match mode {
            SearchMode::Exact => Ok(SearchOutcome::Completed(
                exact_hits(query, &dataset).into_iter().map(hit_item).collect(),
            )),
            SearchMode::Fuzzy => Ok(SearchOutcome::Completed(
                fuzzy_hits(query, &dataset).into_iter().map(hit_item).collect(),
            )),
            SearchMode::Semantic => self.semantic(query, &dataset, token).await,
        }
    }

    /// The semantic path: debounce, embed the query once, score every
    /// chunk, collapse per source and rank.
    async fn semantic(
        &self,
        query: &str,
        dataset: &ChunkDataset,
        token: &CancelToken,
    ) -> Result<SearchOutcome, SearchError> {
        if dataset.is_empty() {
            return Err(SearchError::NoIndexedData);
        }

        // Bursts of keystrokes collapse here; only the last query pays
        // for an embedding call.
        if !token.debounce(self.debounce).await {
            log::debug!("search superseded during debounce");
            return Ok(SearchOutcome::Aborted);
        }

        let Some(vectors) = self.embedder.embed(&[query.to_string()], token).await? else {
            log::debug!("search superseded before query embedding");
            return Ok(SearchOutcome::Aborted);
        };
        let query_vector = match vectors.into_iter().next() {
            Some(vector) => vector,
            None => {
                return Err(SearchError::Provider(ProviderError::CountMismatch {
                    expected: 1,
                    got: 0,
                }))
            }
        };

        if token.is_cancelled() {
            log::debug!("search superseded after query embedding");
            return Ok(SearchOutcome::Aborted);
        }

        let scored = score_chunks(&query_vector, &dataset.chunks);
        let sources = dataset.source_map();
        let representatives = select_representatives(&scored, &sources);
        let ranked = rank(representatives, self.top_n);

        Ok(SearchOutcome::Completed(
            ranked.into_iter().map(representative_item).collect(),
        ))
    }
}

/// Exact mode: every term must be a case-insensitive substring of the
/// source's search text. Inclusion is binary; non-matches are excluded,
/// not scored 0.
fn exact_hits<'a>(query: &str, dataset: &'a ChunkDataset) -> Vec<ModeHit<'a>> {
    let terms = split_terms(query);
    dataset
        .sources
        .iter()
        .filter(|source| {
            let text = source.search_text.to_lowercase();
            terms.iter().all(|term| text.contains(term))
        })
        .map(|source| ModeHit::Exact { source })
        .collect()
}

/// Fuzzy mode: score is the fraction of query terms found as substrings.
/// Zero-score entries are excluded; output is sorted by score descending
/// with ties keeping source order.
fn fuzzy_hits<'a>(query: &str, dataset: &'a ChunkDataset) -> Vec<ModeHit<'a>> {
    let terms = split_terms(query);
    if terms.is_empty() {
        return vec![];
    }

    let mut hits: Vec<ModeHit<'a>> = dataset
        .sources
        .iter()
        .filter_map(|source| {
            let text = source.search_text.to_lowercase();
            let matched = terms.iter().filter(|term| text.contains(term.as_str())).count();
            if matched == 0 {
                return None;
            }
            Some(ModeHit::Fuzzy {
                source,
                score: matched as f32 / terms.len() as f32,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        hit_score(b)
            .partial_cmp(&hit_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    hits
}

fn hit_score(hit: &ModeHit<'_>) -> f32 {
    match hit {
        ModeHit::Exact { .. } => 1.0,
        ModeHit::Fuzzy { score, .. } => *score,
    }
}

/// Lower-cased whitespace-separated query terms.
fn split_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|term| term.to_lowercase())
        .collect()
}

/// Boundary conversion: tagged hit -> display record.
fn hit_item(hit: ModeHit<'_>) -> SearchResultItem {
    match hit {
        ModeHit::Exact { source } => SearchResultItem {
            url: source.url.clone(),
            title: display_title(source),
            folder: source.path.folder(),
            snippet: String::new(),
            score: None,
        },
        ModeHit::Fuzzy { source, score } => SearchResultItem {
            url: source.url.clone(),
            title: display_title(source),
            folder: source.path.folder(),
            snippet: String::new(),
            score: Some(score),
        },
    }
}

fn representative_item(result: RepresentativeResult) -> SearchResultItem {
    SearchResultItem {
        url: result.source_url,
        title: result.title,
        folder: result.path.folder(),
        snippet: result.snippet,
        score: Some(result.score),
    }
}
