//! Bookmark retrieval engine.
//!
//! Turns scraped page text into chunked, vectorized records and answers
//! queries against them by exact substring, fuzzy token overlap, or
//! embedding similarity.
//!
//! # Architecture
//!
//! - `chunker`: splits document bodies into overlapping fixed-size chunks
//! - `embeddings`: embedding provider trait + OpenAI-compatible client
//! - `similarity`: cosine similarity scoring over chunk vectors
//! - `representative`: per-source best-chunk collapse and ranking
//! - `store`: in-memory dataset with atomic replace, JSON persistence
//! - `cancel`: query supersession tokens and debounce
//! - `dispatch`: routes a query to one of the three matching strategies
//! - `sync`: documents -> chunks -> embeddings -> published dataset

pub mod cancel;
pub mod chunker;
pub mod dispatch;
pub mod embeddings;
pub mod representative;
pub mod similarity;
pub mod store;
pub mod sync;

/// Result snippet preview length (characters).
pub const SNIPPET_LEN: usize = 200;
