//! Engine configuration.
//!
//! Every tunable lives in one immutable [`EngineConfig`] value that is
//! passed explicitly into each component. No component reads ambient
//! global state.

use serde::{Deserialize, Serialize};

use crate::models::DistanceMetric;

/// How triggered boost factors are combined with the base similarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostMode {
    /// `score = base × factors`, capped at `max_total_boost` then 1.0.
    #[default]
    Multiplicative,
    /// `score = base + (factors − 1) × base`, same caps. Diverges from
    /// multiplicative mode near the 1.0 cap; kept as an explicit choice.
    Additive,
}

/// Per-factor boost multipliers applied when a heuristic check fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostFactors {
    /// Query mentions the record's media type or a synonym.
    pub media_type: f32,
    /// Record URL matches a known platform the query also names.
    pub platform: f32,
    /// Query terms found in the title.
    pub title: f32,
    /// Query terms found in the description.
    pub description: f32,
    /// Type-specific keywords present in the query.
    pub keyword: f32,
    /// Query expresses a recognized intent (tutorial, review, ...).
    pub intent: f32,
    /// Query terms found in transcribed content.
    pub transcription: f32,
    /// Record format/codec named in the query.
    pub format: f32,
    /// Maximum bonus for records created at age zero.
    pub recency: f32,
}

impl Default for BoostFactors {
    fn default() -> Self {
        Self {
            media_type: 1.15,
            platform: 1.12,
            title: 1.25,
            description: 1.15,
            keyword: 1.10,
            intent: 1.12,
            transcription: 1.20,
            format: 1.08,
            recency: 1.05,
        }
    }
}

/// Immutable configuration for the ranking and recommendation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default minimum similarity for a semantic match.
    pub default_similarity_threshold: f32,
    /// Strict threshold for high-precision callers.
    pub strict_similarity_threshold: f32,
    /// Moderate threshold.
    pub moderate_similarity_threshold: f32,
    /// Permissive threshold, last resort before the fallback.
    pub permissive_similarity_threshold: f32,
    /// Progressive relaxation sequence, strictly decreasing.
    pub relaxation_sequence: Vec<f32>,
    /// Maximum distance accepted per metric; `None` uses the metric default.
    pub max_distance_override: Option<f32>,
    /// Over-fetch factor: request `limit × candidate_multiplier` candidates.
    pub candidate_multiplier: usize,
    /// Per-factor boost multipliers.
    pub boost: BoostFactors,
    /// Cap on the combined boost multiplier.
    pub max_total_boost: f32,
    /// Candidates below this similarity are never boosted.
    pub min_similarity_for_boost: f32,
    /// How boost factors combine with the base similarity.
    pub boost_mode: BoostMode,
    /// Recency decay window in days; full bonus at age 0, none at the edge.
    pub recency_window_days: i64,
    /// Default minimum score for fuzzy search.
    pub fuzzy_min_score: f32,
    /// Word-level Levenshtein threshold inside fuzzy matching.
    pub fuzzy_word_threshold: f32,
    /// Additive context boost for exact title containment.
    pub context_title_bonus: f32,
    /// Additive context boost for partial title containment.
    pub context_title_partial_bonus: f32,
    /// Additive context boost for description containment.
    pub context_description_bonus: f32,
    /// Mean similarity below which a fallback result set is flagged
    /// low-confidence in the diagnostic message.
    pub low_confidence_threshold: f32,
    /// Maximum related concepts extracted per response.
    pub max_related_concepts: usize,
    /// Content snippet length for fuzzy search matches.
    pub snippet_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_similarity_threshold: 0.5,
            strict_similarity_threshold: 0.7,
            moderate_similarity_threshold: 0.5,
            permissive_similarity_threshold: 0.3,
            relaxation_sequence: vec![0.5, 0.4, 0.3, 0.2, 0.1],
            max_distance_override: None,
            candidate_multiplier: 3,
            boost: BoostFactors::default(),
            max_total_boost: 1.5,
            min_similarity_for_boost: 0.1,
            boost_mode: BoostMode::Multiplicative,
            recency_window_days: 30,
            fuzzy_min_score: 0.6,
            fuzzy_word_threshold: 0.7,
            context_title_bonus: 0.15,
            context_title_partial_bonus: 0.08,
            context_description_bonus: 0.05,
            low_confidence_threshold: 0.35,
            max_related_concepts: 5,
            snippet_len: 150,
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default similarity threshold.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.default_similarity_threshold = threshold;
        self
    }

    /// Set the relaxation sequence. Values must be strictly decreasing.
    pub fn with_relaxation_sequence(mut self, sequence: Vec<f32>) -> Self {
        self.relaxation_sequence = sequence;
        self
    }

    /// Set the candidate over-fetch multiplier.
    pub fn with_candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.candidate_multiplier = multiplier.max(1);
        self
    }

    /// Set the boost combination mode.
    pub fn with_boost_mode(mut self, mode: BoostMode) -> Self {
        self.boost_mode = mode;
        self
    }

    /// Set the cap on the combined boost multiplier.
    pub fn with_max_total_boost(mut self, cap: f32) -> Self {
        self.max_total_boost = cap;
        self
    }

    /// Set the recency window in days.
    pub fn with_recency_window_days(mut self, days: i64) -> Self {
        self.recency_window_days = days;
        self
    }

    /// Set the fuzzy search default minimum score.
    pub fn with_fuzzy_min_score(mut self, min_score: f32) -> Self {
        self.fuzzy_min_score = min_score;
        self
    }

    /// Effective maximum distance for a metric, honoring any override.
    pub fn max_distance(&self, metric: DistanceMetric) -> f32 {
        self.max_distance_override
            .unwrap_or_else(|| metric.default_max_distance())
    }
}
