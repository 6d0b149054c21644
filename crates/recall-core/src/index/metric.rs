//! Scoring functions for the supported metrics.
//!
//! Callers must pass equal-length slices; `VectorIndex` validates
//! dimensionality before any score is computed.

use std::cmp::Ordering;

use recall_types::vector::Metric;

/// Inner product of two vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine of the angle between two vectors.
///
/// A zero-length vector has no direction; its similarity to anything is 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot_product(a, a).sqrt();
    let norm_b = dot_product(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product(a, b) / (norm_a * norm_b)
}

/// L2 distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Raw score of `candidate` against `query` under `metric`.
pub fn score(metric: Metric, query: &[f32], candidate: &[f32]) -> f32 {
    debug_assert_eq!(query.len(), candidate.len());
    match metric {
        Metric::Cosine => cosine_similarity(query, candidate),
        Metric::DotProduct => dot_product(query, candidate),
        Metric::Euclidean => euclidean_distance(query, candidate),
    }
}

/// Whether `score` is at least as close as `threshold` under `metric`.
///
/// Similarities must reach the threshold; distances must not exceed it.
/// A NaN score never passes.
pub fn within_threshold(metric: Metric, score: f32, threshold: f32) -> bool {
    if metric.is_similarity() {
        score >= threshold
    } else {
        score <= threshold
    }
}

/// Order two scores best-first under `metric`.
///
/// NaN scores sort after every real score so they can never outrank a
/// well-formed match.
pub fn best_first(metric: Metric, a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if metric.is_similarity() => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}
