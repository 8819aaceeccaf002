//! Semantic search orchestration.
//!
//! Single pass, no retries beyond threshold relaxation:
//! embed the query, over-fetch candidates from the vector store, relax
//! the similarity threshold, boost each survivor, sort, truncate, and
//! attach diagnostic metadata plus related concepts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use medley_core::{
    DistanceMetric, EmbeddingProvider, EngineConfig, Error, MediaRecord, RankedResult, RecordStore,
    Result, ScoredCandidate, VectorStore,
};

use crate::boost::RelevanceBooster;
use crate::fuzzy::{field_search, FuzzyMatch, SearchField};
use crate::relaxation::{relax, RelaxationOutcome};

/// Common English stop-words excluded from related-concept extraction.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "how",
    "in", "into", "is", "it", "its", "of", "on", "or", "that", "the", "their", "this", "to",
    "was", "what", "when", "where", "which", "will", "with", "you", "your",
];

/// Options for [`SemanticRanker::semantic_search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSearchOptions {
    /// Minimum similarity override; `None` uses the config default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f32>,
    /// Extract related concepts from the top results.
    pub include_related: bool,
    /// Apply the additive context boost for title/description containment.
    pub context_boost: bool,
    /// Distance metric; `None` uses cosine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<DistanceMetric>,
    /// Maximum store distance; `None` uses the metric default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f32>,
}

impl Default for SemanticSearchOptions {
    fn default() -> Self {
        Self {
            min_similarity: None,
            include_related: true,
            context_boost: true,
            metric: None,
            max_distance: None,
        }
    }
}

/// Aggregate metadata for one semantic search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Candidates fetched from the vector store before relaxation.
    pub total_candidates: usize,
    pub result_count: usize,
    /// Mean raw similarity of the returned results.
    pub avg_similarity: f32,
    /// Threshold that produced the set; 0.0 marks the fallback.
    pub effective_threshold: f32,
    pub search_time_ms: u64,
}

/// Response from [`SemanticRanker::semantic_search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSearchResponse {
    pub results: Vec<RankedResult>,
    /// Up to `max_related_concepts` terms mined from the top results.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_concepts: Vec<String>,
    /// Human-readable diagnostic, set for empty or low-confidence outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub metadata: SearchMetadata,
}

/// Embedding-based retrieval with relaxation, boosting, and diagnostics.
pub struct SemanticRanker {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    records: Arc<dyn RecordStore>,
    booster: RelevanceBooster,
    config: EngineConfig,
}

impl SemanticRanker {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorStore>,
        records: Arc<dyn RecordStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            embedder,
            vectors,
            records,
            booster: RelevanceBooster::new(config.clone()),
            config,
        }
    }

    /// Replace the default booster, e.g. to install a trace sink.
    pub fn with_booster(mut self, booster: RelevanceBooster) -> Self {
        self.booster = booster;
        self
    }

    /// Plain ranked search: embed, fetch, relax, boost, sort, truncate.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        max_distance: Option<f32>,
        metric: Option<DistanceMetric>,
    ) -> Result<Vec<RankedResult>> {
        let response = self
            .semantic_search(
                query,
                limit,
                SemanticSearchOptions {
                    include_related: false,
                    context_boost: false,
                    metric,
                    min_similarity: None,
                    max_distance,
                },
            )
            .await?;
        Ok(response.results)
    }

    /// Full semantic search with diagnostics and related concepts.
    pub async fn semantic_search(
        &self,
        query: &str,
        limit: usize,
        options: SemanticSearchOptions,
    ) -> Result<SemanticSearchResponse> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query must not be empty".into()));
        }

        let started = Instant::now();
        let metric = options.metric.unwrap_or_default();
        let threshold = options
            .min_similarity
            .unwrap_or(self.config.default_similarity_threshold);

        let vector = self.embedder.embed(query).await?;
        let candidates = self
            .fetch_candidates(
                &vector,
                limit * self.config.candidate_multiplier,
                &[],
                metric,
                options.max_distance,
            )
            .await?;
        let total_candidates = candidates.len();

        if candidates.is_empty() {
            info!(query = %query, "Semantic search found no candidates");
            return Ok(SemanticSearchResponse {
                results: Vec::new(),
                related_concepts: Vec::new(),
                message: Some(
                    "No candidates with embeddings were found in the catalog.".to_string(),
                ),
                metadata: SearchMetadata {
                    total_candidates: 0,
                    result_count: 0,
                    avg_similarity: 0.0,
                    effective_threshold: threshold,
                    search_time_ms: started.elapsed().as_millis() as u64,
                },
            });
        }

        let RelaxationOutcome {
            candidates: kept,
            effective_threshold,
            used_fallback,
        } = relax(
            &candidates,
            threshold,
            &self.config.relaxation_sequence,
            limit,
        );

        let mut results: Vec<RankedResult> = kept
            .into_iter()
            .map(|c| {
                let boosted = self.booster.boost(&c.record, query, c.similarity);
                let score = if options.context_boost {
                    apply_context_boost(&c.record, query, boosted.score, &self.config)
                } else {
                    boosted.score
                };
                RankedResult {
                    record: c.record,
                    similarity: c.similarity,
                    distance: c.distance,
                    relevance_score: score,
                    semantic_match: !used_fallback,
                    boost_trace: boosted.trace,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        let avg_similarity = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.similarity).sum::<f32>() / results.len() as f32
        };

        let message = if results.is_empty() {
            Some(format!("No results matched \"{}\".", query))
        } else if used_fallback && avg_similarity < self.config.low_confidence_threshold {
            Some(format!(
                "Results for \"{}\" are low-confidence: nothing cleared the similarity \
                 thresholds, showing the closest matches instead.",
                query
            ))
        } else {
            None
        };

        let related_concepts = if options.include_related {
            extract_related_concepts(&results, query, self.config.max_related_concepts)
        } else {
            Vec::new()
        };

        debug!(
            query = %query,
            candidate_count = total_candidates,
            result_count = results.len(),
            effective_threshold,
            "Semantic search complete"
        );

        let result_count = results.len();
        Ok(SemanticSearchResponse {
            results,
            related_concepts,
            message,
            metadata: SearchMetadata {
                total_candidates,
                result_count,
                avg_similarity,
                effective_threshold,
                search_time_ms: started.elapsed().as_millis() as u64,
            },
        })
    }

    /// Typo-tolerant text search over the stored corpus, no embeddings
    /// involved. Fetches the records through the store seam and scores
    /// the requested fields with [`field_search`].
    pub async fn fuzzy_search(
        &self,
        query: &str,
        limit: usize,
        min_score: Option<f32>,
        fields: &[SearchField],
    ) -> Result<Vec<FuzzyMatch>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query must not be empty".into()));
        }

        let records = self.records.list().await?;
        let matches = field_search(
            &records,
            query,
            min_score.unwrap_or(self.config.fuzzy_min_score),
            fields,
            self.config.fuzzy_word_threshold,
            self.config.snippet_len,
            limit,
        );
        debug!(
            query = %query,
            candidate_count = records.len(),
            result_count = matches.len(),
            "Fuzzy search complete"
        );
        Ok(matches)
    }

    /// Rank records similar to an existing record by its own embedding.
    pub async fn find_similar(
        &self,
        record_id: Uuid,
        limit: usize,
        max_distance: Option<f32>,
        metric: Option<DistanceMetric>,
    ) -> Result<Vec<RankedResult>> {
        let record = self
            .records
            .get(record_id)
            .await?
            .ok_or(Error::NotFound(record_id))?;
        let vector = record.embedding.clone().ok_or_else(|| {
            Error::MissingEmbedding(format!("record {} has no embedding", record_id))
        })?;

        let metric = metric.unwrap_or_default();
        let candidates = self
            .fetch_candidates(
                &vector,
                limit * self.config.candidate_multiplier,
                &[record_id],
                metric,
                max_distance,
            )
            .await?;

        let outcome = relax(
            &candidates,
            self.config.default_similarity_threshold,
            &self.config.relaxation_sequence,
            limit,
        );

        // No query text here, so raw similarity is the relevance score.
        let mut results: Vec<RankedResult> = outcome
            .candidates
            .into_iter()
            .map(|c| RankedResult {
                similarity: c.similarity,
                distance: c.distance,
                relevance_score: c.similarity,
                semantic_match: !outcome.used_fallback,
                boost_trace: Vec::new(),
                record: c.record,
            })
            .collect();
        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }

    /// Fetch store hits and resolve them to scored candidates.
    pub(crate) async fn fetch_candidates(
        &self,
        vector: &[f32],
        limit: usize,
        exclude_ids: &[Uuid],
        metric: DistanceMetric,
        max_distance: Option<f32>,
    ) -> Result<Vec<ScoredCandidate>> {
        let max_distance = max_distance.unwrap_or_else(|| self.config.max_distance(metric));
        let hits = self
            .vectors
            .query(vector, limit, exclude_ids, metric, max_distance)
            .await?;

        let ids: Vec<Uuid> = hits.iter().map(|(id, _)| *id).collect();
        let records = self.records.get_many(&ids).await?;
        let by_id: HashMap<Uuid, MediaRecord> =
            records.into_iter().map(|r| (r.id, r)).collect();

        Ok(hits
            .into_iter()
            .filter_map(|(id, distance)| {
                by_id
                    .get(&id)
                    .map(|record| ScoredCandidate::new(record.clone(), distance, metric))
            })
            .collect())
    }
}

/// Additive context boost: fixed bonuses for exact or partial title and
/// description containment, capped at 1.0.
fn apply_context_boost(
    record: &MediaRecord,
    query: &str,
    score: f32,
    config: &EngineConfig,
) -> f32 {
    let query_lc = query.to_lowercase();
    let query_words: Vec<&str> = query_lc.split_whitespace().collect();
    let mut boosted = score;

    let title_lc = record.title.to_lowercase();
    if title_lc.contains(&query_lc) {
        boosted += config.context_title_bonus;
    } else if query_words.iter().any(|w| title_lc.contains(w)) {
        boosted += config.context_title_partial_bonus;
    }

    if let Some(description) = &record.description {
        let desc_lc = description.to_lowercase();
        if desc_lc.contains(&query_lc) || query_words.iter().any(|w| desc_lc.contains(w)) {
            boosted += config.context_description_bonus;
        }
    }

    boosted.min(1.0)
}

/// Mine up to `max_concepts` recurring terms from the top five results'
/// titles and descriptions, excluding stop-words and query terms.
fn extract_related_concepts(
    results: &[RankedResult],
    query: &str,
    max_concepts: usize,
) -> Vec<String> {
    let query_lc = query.to_lowercase();
    let query_terms: Vec<&str> = query_lc.split_whitespace().collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for result in results.iter().take(5) {
        let mut text = result.record.title.clone();
        if let Some(description) = &result.record.description {
            text.push(' ');
            text.push_str(description);
        }

        for raw in text.to_lowercase().split_whitespace() {
            let term: String = raw.chars().filter(|c| c.is_alphanumeric()).collect();
            if term.len() < 3 || STOP_WORDS.contains(&term.as_str()) {
                continue;
            }
            if query_terms.contains(&term.as_str()) {
                continue;
            }
            let count = counts.entry(term.clone()).or_insert(0);
            if *count == 0 {
                order.push(term);
            }
            *count += 1;
        }
    }

    // Frequency-descending, first-seen order as the tiebreaker
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(max_concepts);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use medley_core::{AppliedBoost, MediaType};

    fn ranked(title: &str, description: Option<&str>, similarity: f32) -> RankedResult {
        let mut record = MediaRecord::new(title, MediaType::Text);
        record.description = description.map(String::from);
        RankedResult {
            record,
            similarity,
            distance: 1.0 - similarity,
            relevance_score: similarity,
            semantic_match: true,
            boost_trace: Vec::<AppliedBoost>::new(),
        }
    }

    #[test]
    fn test_context_boost_exact_title() {
        let config = EngineConfig::default();
        let record = MediaRecord::new("Contract Law Basics", MediaType::Text);
        let boosted = apply_context_boost(&record, "contract law", 0.5, &config);
        assert!((boosted - (0.5 + config.context_title_bonus)).abs() < 1e-6);
    }

    #[test]
    fn test_context_boost_partial_title() {
        let config = EngineConfig::default();
        let record = MediaRecord::new("Contract Basics", MediaType::Text);
        let boosted = apply_context_boost(&record, "contract negotiation", 0.5, &config);
        assert!((boosted - (0.5 + config.context_title_partial_bonus)).abs() < 1e-6);
    }

    #[test]
    fn test_context_boost_capped_at_one() {
        let config = EngineConfig::default();
        let record = MediaRecord::new("Contract Law", MediaType::Text)
            .with_description("All about contract law");
        let boosted = apply_context_boost(&record, "contract law", 0.95, &config);
        assert_eq!(boosted, 1.0);
    }

    #[test]
    fn test_context_boost_no_match_unchanged() {
        let config = EngineConfig::default();
        let record = MediaRecord::new("Gardening", MediaType::Text);
        let boosted = apply_context_boost(&record, "quantum physics", 0.5, &config);
        assert_eq!(boosted, 0.5);
    }

    #[test]
    fn test_related_concepts_exclude_query_and_stop_words() {
        let results = vec![
            ranked("Contract Law Basics", Some("the elements of a valid agreement"), 0.9),
            ranked("Contract Formation", Some("offer and acceptance"), 0.8),
        ];
        let concepts = extract_related_concepts(&results, "contract law", 5);

        assert!(!concepts.iter().any(|c| c == "contract"));
        assert!(!concepts.iter().any(|c| c == "law"));
        assert!(!concepts.iter().any(|c| c == "the"));
        assert!(concepts.iter().any(|c| c == "formation" || c == "agreement"));
    }

    #[test]
    fn test_related_concepts_limited() {
        let results = vec![ranked(
            "alpha bravo charlie delta echo foxtrot golf hotel",
            None,
            0.9,
        )];
        let concepts = extract_related_concepts(&results, "query", 5);
        assert!(concepts.len() <= 5);
    }

    #[test]
    fn test_related_concepts_frequency_ordering() {
        let results = vec![
            ranked("ownership borrowing", None, 0.9),
            ranked("ownership lifetimes", None, 0.8),
            ranked("ownership traits", None, 0.7),
        ];
        let concepts = extract_related_concepts(&results, "rust", 5);
        assert_eq!(concepts[0], "ownership");
    }

    #[test]
    fn test_related_concepts_short_terms_dropped() {
        let results = vec![ranked("Go vs C", None, 0.9)];
        let concepts = extract_related_concepts(&results, "languages", 5);
        assert!(concepts.is_empty());
    }
}
