//! Exact cosine similarity ranking.
//!
//! Collections are small (low thousands of records), so ranking is a plain
//! linear scan with no index structure. The scan scores every record, sorts
//! descending, and truncates to the requested size.

use std::cmp::Ordering as CmpOrdering;

use crate::data::{Collection, ResultSource, ScoredResult};
use crate::error::{LinnaeaError, Result};

/// Cosine similarity between two vectors of equal length.
///
/// Returns exactly `0.0` when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank every record of the collection against the query vector.
///
/// Results are sorted by descending similarity; ties keep collection order.
/// At most `min(top_k, collection.len())` results are returned.
///
/// # Errors
///
/// Returns [`LinnaeaError::DimensionMismatch`] when the query length does
/// not match the collection dimension. The query is never padded or
/// truncated to fit.
pub fn rank(query: &[f32], collection: &Collection, top_k: usize) -> Result<Vec<ScoredResult>> {
    if query.len() != collection.dimension {
        return Err(LinnaeaError::DimensionMismatch {
            expected: collection.dimension,
            actual: query.len(),
        });
    }

    let mut results: Vec<ScoredResult> = collection
        .records
        .iter()
        .map(|embedded| ScoredResult {
            record: embedded.record.clone(),
            score: cosine_similarity(query, &embedded.vector),
            source: ResultSource::Vector,
        })
        .collect();

    // Stable sort: equal scores keep their collection order.
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(CmpOrdering::Equal));
    results.truncate(top_k);

    Ok(results)
}
