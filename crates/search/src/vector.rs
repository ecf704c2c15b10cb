//! Scoring utilities: cosine similarity, keyword relevance, and
//! Reciprocal Rank Fusion (RRF) for merging ranked lists.
//!
//! Ranked lists are `(index, score)` pairs into the caller's corpus, sorted
//! by descending score.

use std::collections::HashMap;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]. Returns 0.0 if the lengths differ, either
/// vector is empty, or either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Keyword relevance of `text` for `query`.
///
/// Counts occurrences of each query term (case-insensitive, terms shorter than
/// two characters ignored) and normalises by text length in hundreds of bytes.
pub fn keyword_score(text: &str, query: &str) -> f32 {
    let haystack = text.to_lowercase();
    let occurrences: usize = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.len() >= 2)
        .map(|term| haystack.matches(&term.to_lowercase()).count())
        .sum();

    occurrences as f32 / (text.len() as f32 / 100.0).max(1.0)
}

/// Sort `(index, score)` pairs by descending score and keep the first `limit`.
pub fn rank(mut scored: Vec<(usize, f32)>, limit: usize) -> Vec<(usize, f32)> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// Reciprocal Rank Fusion: merge two ranked lists.
///
/// Each index's final score = sum of 1/(k + rank) across both lists.
/// Standard value is k=60. Returns merged results sorted by RRF score,
/// deduplicated by index.
pub fn reciprocal_rank_fusion(
    keyword_results: &[(usize, f32)],
    vector_results: &[(usize, f32)],
    k: u32,
    limit: usize,
) -> Vec<(usize, f32)> {
    let k = k as f32;
    let mut scores: HashMap<usize, f32> = HashMap::new();

    for list in [keyword_results, vector_results] {
        for (rank, (idx, _)) in list.iter().enumerate() {
            *scores.entry(*idx).or_insert(0.0) += 1.0 / (k + rank as f32 + 1.0);
        }
    }

    let mut merged: Vec<(usize, f32)> = scores.into_iter().collect();
    // Ties broken by corpus order so results are stable.
    merged.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    merged.truncate(limit);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_or_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn keyword_score_counts_terms() {
        let text = "PlanA covers dental. PlanB covers vision.";
        assert!(keyword_score(text, "planA vs planB") > 0.0);
        assert_eq!(keyword_score(text, "parking"), 0.0);
        // single-character terms are ignored
        assert_eq!(keyword_score("a a a", "a"), 0.0);
    }

    #[test]
    fn rank_sorts_and_truncates() {
        let ranked = rank(vec![(0, 0.1), (1, 0.9), (2, 0.5)], 2);
        assert_eq!(ranked, vec![(1, 0.9), (2, 0.5)]);
    }

    #[test]
    fn rrf_prefers_items_in_both_lists() {
        let keyword = vec![(0, 3.0), (1, 2.0)];
        let vector = vec![(1, 0.9), (2, 0.8)];
        let merged = reciprocal_rank_fusion(&keyword, &vector, 60, 10);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].0, 1);
    }

    #[test]
    fn rrf_respects_limit() {
        let keyword: Vec<(usize, f32)> = (0..10).map(|i| (i, 1.0)).collect();
        let merged = reciprocal_rank_fusion(&keyword, &[], 60, 3);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].0, 0);
    }
}
