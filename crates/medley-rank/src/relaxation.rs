//! Progressive similarity-threshold relaxation.
//!
//! Given scored candidates and a minimum bar, produce a usable result set
//! by lowering the bar through a fixed sequence, falling back to "best
//! available" when nothing clears any bar. Pure: input order is
//! preserved and raw scores are never touched, only set membership
//! changes.

use tracing::debug;

use medley_core::ScoredCandidate;

/// Result of threshold relaxation.
#[derive(Debug, Clone)]
pub struct RelaxationOutcome {
    /// Surviving candidates, in input order (fallback excepted, which is
    /// sorted by similarity).
    pub candidates: Vec<ScoredCandidate>,
    /// Threshold that produced the set; 0.0 when the fallback was used,
    /// so callers can flag the result as low-confidence.
    pub effective_threshold: f32,
    /// True when no threshold in the sequence yielded anything and the
    /// top candidates were returned regardless.
    pub used_fallback: bool,
}

/// Filter `candidates` at `initial_threshold`, relaxing through
/// `sequence` (strictly decreasing) until at least `target_count`
/// candidates survive. Exhausting the sequence with a non-empty set
/// returns that set; exhausting it empty returns the top `target_count`
/// by similarity with `effective_threshold = 0.0`.
pub fn relax(
    candidates: &[ScoredCandidate],
    initial_threshold: f32,
    sequence: &[f32],
    target_count: usize,
) -> RelaxationOutcome {
    let mut last: Vec<ScoredCandidate> = Vec::new();
    let mut last_threshold = initial_threshold;

    let steps = std::iter::once(initial_threshold)
        .chain(sequence.iter().copied().filter(|t| *t < initial_threshold));

    for threshold in steps {
        let kept: Vec<ScoredCandidate> = candidates
            .iter()
            .filter(|c| c.similarity >= threshold)
            .cloned()
            .collect();

        if kept.len() >= target_count.max(1) {
            if threshold < initial_threshold {
                debug!(
                    initial = initial_threshold,
                    effective_threshold = threshold,
                    result_count = kept.len(),
                    "Threshold relaxed"
                );
            }
            return RelaxationOutcome {
                candidates: kept,
                effective_threshold: threshold,
                used_fallback: false,
            };
        }

        last = kept;
        last_threshold = threshold;
    }

    if !last.is_empty() {
        // Sequence exhausted but something cleared the final bar.
        return RelaxationOutcome {
            candidates: last,
            effective_threshold: last_threshold,
            used_fallback: false,
        };
    }

    // Nothing cleared any bar: best available, flagged low-confidence.
    let mut fallback: Vec<ScoredCandidate> = candidates.to_vec();
    fallback.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fallback.truncate(target_count);

    debug!(
        initial = initial_threshold,
        result_count = fallback.len(),
        "Relaxation exhausted, returning best available"
    );

    RelaxationOutcome {
        candidates: fallback,
        effective_threshold: 0.0,
        used_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medley_core::{DistanceMetric, MediaRecord, MediaType};

    fn candidate(similarity: f32) -> ScoredCandidate {
        ScoredCandidate::new(
            MediaRecord::new("record", MediaType::Text),
            1.0 - similarity,
            DistanceMetric::Cosine,
        )
    }

    const SEQUENCE: [f32; 5] = [0.5, 0.4, 0.3, 0.2, 0.1];

    #[test]
    fn test_all_clear_initial_threshold() {
        let candidates = vec![candidate(0.9), candidate(0.8), candidate(0.7)];
        let outcome = relax(&candidates, 0.6, &SEQUENCE, 3);
        assert_eq!(outcome.candidates.len(), 3);
        assert_eq!(outcome.effective_threshold, 0.6);
        assert!(!outcome.used_fallback);
    }

    #[test]
    fn test_relaxes_until_target_met() {
        let candidates = vec![candidate(0.9), candidate(0.45), candidate(0.35)];
        let outcome = relax(&candidates, 0.6, &SEQUENCE, 3);
        // 0.6 → 1, 0.5 → 1, 0.4 → 2, 0.3 → 3
        assert_eq!(outcome.candidates.len(), 3);
        assert!((outcome.effective_threshold - 0.3).abs() < 1e-6);
        assert!(!outcome.used_fallback);
    }

    #[test]
    fn test_partial_result_after_exhaustion() {
        let candidates = vec![candidate(0.15), candidate(0.12)];
        let outcome = relax(&candidates, 0.6, &SEQUENCE, 5);
        // Only the 0.1 step keeps anything; target never met but the set
        // is non-empty, so no fallback
        assert_eq!(outcome.candidates.len(), 2);
        assert!((outcome.effective_threshold - 0.1).abs() < 1e-6);
        assert!(!outcome.used_fallback);
    }

    #[test]
    fn test_fallback_when_nothing_clears() {
        let candidates = vec![candidate(0.05), candidate(0.03), candidate(0.08)];
        let outcome = relax(&candidates, 0.6, &SEQUENCE, 2);
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.effective_threshold, 0.0);
        assert!(outcome.used_fallback);
        // Fallback is sorted by similarity descending
        assert!((outcome.candidates[0].similarity - 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_empty_candidates() {
        let outcome = relax(&[], 0.6, &SEQUENCE, 5);
        assert!(outcome.candidates.is_empty());
        assert!(outcome.used_fallback);
        assert_eq!(outcome.effective_threshold, 0.0);
    }

    #[test]
    fn test_preserves_input_order() {
        let candidates = vec![candidate(0.7), candidate(0.9), candidate(0.8)];
        let outcome = relax(&candidates, 0.6, &SEQUENCE, 3);
        let sims: Vec<f32> = outcome.candidates.iter().map(|c| c.similarity).collect();
        assert!((sims[0] - 0.7).abs() < 1e-6);
        assert!((sims[1] - 0.9).abs() < 1e-6);
        assert!((sims[2] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_scores_untouched() {
        let candidates = vec![candidate(0.42)];
        let outcome = relax(&candidates, 0.6, &SEQUENCE, 1);
        assert!((outcome.candidates[0].similarity - 0.42).abs() < 1e-6);
        assert!((outcome.candidates[0].distance - 0.58).abs() < 1e-6);
    }

    #[test]
    fn test_monotonic_in_threshold() {
        let candidates: Vec<ScoredCandidate> =
            [0.9, 0.7, 0.55, 0.4, 0.25].iter().map(|&s| candidate(s)).collect();

        // A looser bar keeps a superset of a stricter bar
        let strict: Vec<_> = candidates.iter().filter(|c| c.similarity >= 0.6).collect();
        let loose: Vec<_> = candidates.iter().filter(|c| c.similarity >= 0.3).collect();
        assert!(strict.len() <= loose.len());
        for c in &strict {
            assert!(loose.iter().any(|l| l.similarity == c.similarity));
        }
    }

    #[test]
    fn test_skips_sequence_steps_above_initial() {
        // Initial bar of 0.35 must not tighten to the sequence's 0.5/0.4
        let candidates = vec![candidate(0.37)];
        let outcome = relax(&candidates, 0.35, &SEQUENCE, 1);
        assert_eq!(outcome.candidates.len(), 1);
        assert!((outcome.effective_threshold - 0.35).abs() < 1e-6);
    }
}
