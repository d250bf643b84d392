//! Per-source representative selection and ranking.
//!
//! All chunk-level matches belonging to one source collapse into a
//! single representative: the highest-scoring chunk stands in for the
//! whole source in ranked output.

use std::collections::HashMap;

use serde::Serialize;

use crate::bookmarks::BookmarkPath;
use crate::engine::similarity::ScoredChunk;
use crate::engine::store::SourceRecord;
use crate::engine::SNIPPET_LEN;

/// One source's best chunk, ready for ranking. Transient, per-query.
#[derive(Debug, Clone, Serialize)]
pub struct RepresentativeResult {
    pub source_url: String,
    pub title: String,
    pub snippet: String,
    pub score: f32,
    pub path: BookmarkPath,
}

/// Collapse scored chunks to one representative per source url.
///
/// The chunk with the strictly highest score wins; ties keep the first
/// one encountered. The snippet always comes from the winning chunk.
/// Sources without any scored chunk are simply absent from the output.
pub fn select_representatives(
    scored: &[ScoredChunk<'_>],
    sources: &HashMap<&str, &SourceRecord>,
) -> Vec<RepresentativeResult> {
    let mut results: Vec<RepresentativeResult> = Vec::new();
    let mut by_url: HashMap<&str, usize> = HashMap::new();

    for entry in scored {
        let url = entry.chunk.source_url.as_str();
        let Some(source) = sources.get(url) else {
            // Chunk without source metadata; nothing to display for it.
            log::debug!("dropping chunk with unknown source url {url}");
            continue;
        };

        match by_url.get(url) {
            Some(&slot) => {
                if entry.score > results[slot].score {
                    results[slot].score = entry.score;
                    results[slot].snippet = snippet(&entry.chunk.text);
                }
            }
            None => {
                by_url.insert(url, results.len());
                results.push(RepresentativeResult {
                    source_url: source.url.clone(),
                    title: display_title(source),
                    snippet: snippet(&entry.chunk.text),
                    score: entry.score,
                    path: source.path.clone(),
                });
            }
        }
    }

    results
}

/// Sort representatives by score descending and keep the top `top_n`.
/// Ties keep their input order.
pub fn rank(mut results: Vec<RepresentativeResult>, top_n: usize) -> Vec<RepresentativeResult> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(top_n);
    results
}

/// Display title for a source: its title, falling back to the folder
/// name and then the url.
pub fn display_title(source: &SourceRecord) -> String {
    let title = source.title.trim();
    if !title.is_empty() {
        return title.to_string();
    }
    let name = source.path.name();
    if !name.is_empty() {
        return name.to_string();
    }
    source.url.clone()
}

/// Chunk text truncated to the preview length, on a char boundary.
pub fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect()
}
