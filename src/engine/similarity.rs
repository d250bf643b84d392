//! Cosine similarity scoring over chunk vectors.

use crate::engine::store::Chunk;

/// A chunk scored against one query. Transient, per-query only.
#[derive(Debug, Clone)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// Cosine similarity between two vectors of equal length.
///
/// Defined as 0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Score every chunk against the query vector.
///
/// Chunks whose vector length differs from the query's are excluded from
/// the output entirely, not scored as 0.
pub fn score_chunks<'a>(query: &[f32], chunks: &'a [Chunk]) -> Vec<ScoredChunk<'a>> {
    let query_norm = l2_norm(query);

    chunks
        .iter()
        .filter(|chunk| chunk.vector.len() == query.len())
        .map(|chunk| {
            let target_norm = l2_norm(&chunk.vector);
            let score = if query_norm < f32::EPSILON || target_norm < f32::EPSILON {
                0.0
            } else {
                dot(query, &chunk.vector) / (query_norm * target_norm)
            };
            ScoredChunk { chunk, score }
        })
        .collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
