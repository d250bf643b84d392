//! Splits document bodies into overlapping fixed-size chunks.
//!
//! Chunk boundaries are counted in characters, with the tail of each
//! chunk repeated into the start of the next so context at the boundary
//! is not lost. Same document + same parameters always produce the same
//! chunks.

use crate::bookmarks::SourceDocument;

/// Split a document body into `(index, text)` chunks of at most
/// `max_chunk_size` characters with `overlap` characters of trailing
/// context repeated into the next chunk.
///
/// `overlap < max_chunk_size` is a precondition, validated when the
/// configuration is loaded. Empty or whitespace-only documents produce
/// zero chunks; no chunk is ever empty.
pub fn chunk_document(
    document: &SourceDocument,
    max_chunk_size: usize,
    overlap: usize,
) -> Vec<(usize, String)> {
    let chars: Vec<char> = document.body.chars().collect();
    if chars.is_empty() {
        return vec![];
    }

    let step = max_chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + max_chunk_size).min(chars.len());
        let text = normalize(&chars[start..end]);
        if !text.is_empty() {
            chunks.push(text);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks.into_iter().enumerate().collect()
}

/// Collapse newlines to spaces and trim the ends. Scraped bodies carry
/// layout linebreaks that only add noise to embeddings and snippets.
fn normalize(chars: &[char]) -> String {
    chars
        .iter()
        .map(|&c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}
