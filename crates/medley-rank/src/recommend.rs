//! Multi-strategy recommendations.
//!
//! Four strategies share one retrieval primitive: item-based (a record's
//! own embedding), multi-item (centroid of several records), content-based
//! (an ad hoc query embedding), and hybrid (weighted merge of item and
//! content signals). All apply the same threshold-relaxation fallback as
//! search, and every result carries a human-readable reason naming its
//! source.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use medley_core::{
    DistanceMetric, EmbeddingProvider, EngineConfig, Error, MediaRecord, RecommendationResult,
    RecordStore, Result, ScoredCandidate, VectorStore,
};

use crate::relaxation::relax;

/// Recommendation strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStrategy {
    /// Anchor on one record's embedding.
    ItemBased,
    /// Anchor on the centroid of several records' embeddings.
    MultiItem,
    /// Anchor on an ad hoc query embedding.
    ContentBased,
    /// Weighted merge of item-based (or multi-item) and content-based.
    Hybrid,
}

impl std::fmt::Display for RecommendationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemBased => write!(f, "item_based"),
            Self::MultiItem => write!(f, "multi_item"),
            Self::ContentBased => write!(f, "content_based"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Weights for the hybrid merge. Default 0.5/0.5; they need not sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    pub item: f32,
    pub content: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            item: 0.5,
            content: 0.5,
        }
    }
}

/// A recommendation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub strategy: RecommendationStrategy,
    /// Source records for item-based / multi-item / hybrid.
    #[serde(default)]
    pub item_ids: Vec<Uuid>,
    /// Query text for content-based / hybrid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub limit: usize,
    /// Similarity floor; `None` uses the config default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_similarity: Option<f32>,
    /// Records never to recommend, on top of the sources themselves.
    #[serde(default)]
    pub exclude_ids: Vec<Uuid>,
    #[serde(default)]
    pub weights: HybridWeights,
}

impl RecommendationRequest {
    /// Item-based request for a single record.
    pub fn for_item(item_id: Uuid, limit: usize) -> Self {
        Self {
            strategy: RecommendationStrategy::ItemBased,
            item_ids: vec![item_id],
            query: None,
            limit,
            min_similarity: None,
            exclude_ids: Vec::new(),
            weights: HybridWeights::default(),
        }
    }

    /// Multi-item request anchored on a centroid.
    pub fn for_items(item_ids: Vec<Uuid>, limit: usize) -> Self {
        Self {
            strategy: RecommendationStrategy::MultiItem,
            item_ids,
            query: None,
            limit,
            min_similarity: None,
            exclude_ids: Vec::new(),
            weights: HybridWeights::default(),
        }
    }

    /// Content-based request for a query string.
    pub fn for_query(query: impl Into<String>, limit: usize) -> Self {
        Self {
            strategy: RecommendationStrategy::ContentBased,
            item_ids: Vec::new(),
            query: Some(query.into()),
            limit,
            min_similarity: None,
            exclude_ids: Vec::new(),
            weights: HybridWeights::default(),
        }
    }

    /// Hybrid request mixing item and content signals.
    pub fn hybrid(item_ids: Vec<Uuid>, query: impl Into<String>, limit: usize) -> Self {
        Self {
            strategy: RecommendationStrategy::Hybrid,
            item_ids,
            query: Some(query.into()),
            limit,
            min_similarity: None,
            exclude_ids: Vec::new(),
            weights: HybridWeights::default(),
        }
    }

    /// Override the hybrid weights.
    pub fn with_weights(mut self, item: f32, content: f32) -> Self {
        self.weights = HybridWeights { item, content };
        self
    }

    /// Override the similarity floor.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = Some(min_similarity);
        self
    }

    /// Add records that must never be recommended.
    pub fn with_excluded(mut self, ids: Vec<Uuid>) -> Self {
        self.exclude_ids = ids;
        self
    }
}

/// Response from [`Recommender::recommend`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub strategy: RecommendationStrategy,
    pub results: Vec<RecommendationResult>,
    /// Candidates considered before relaxation and truncation.
    pub total_candidates: usize,
    /// Threshold that produced the set; 0.0 marks the fallback.
    pub effective_threshold: f32,
}

/// Element-wise arithmetic mean of several vectors.
///
/// Fails with [`Error::InvalidInput`] on an empty slice or mismatched
/// dimensions; no normalization is performed.
pub fn centroid(vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
    let Some(first) = vectors.first() else {
        return Err(Error::InvalidInput("cannot average zero vectors".into()));
    };
    let dim = first.len();
    for v in vectors {
        if v.len() != dim {
            return Err(Error::InvalidInput(format!(
                "embedding dimension mismatch: expected {}, got {}",
                dim,
                v.len()
            )));
        }
    }

    let mut mean = vec![0.0f32; dim];
    for v in vectors {
        for (slot, value) in mean.iter_mut().zip(v) {
            *slot += value;
        }
    }
    for slot in &mut mean {
        *slot /= vectors.len() as f32;
    }
    Ok(mean)
}

/// Recommendation engine over the shared candidate-retrieval contract.
pub struct Recommender {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    records: Arc<dyn RecordStore>,
    config: EngineConfig,
}

impl Recommender {
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
            config,
        }
    }

    /// Produce recommendations per the request's strategy.
    pub async fn recommend(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        if request.weights.item < 0.0 || request.weights.content < 0.0 {
            return Err(Error::InvalidInput("weights must be non-negative".into()));
        }

        let response = match request.strategy {
            RecommendationStrategy::ItemBased => self.item_based(request).await?,
            RecommendationStrategy::MultiItem => self.multi_item(request).await?,
            RecommendationStrategy::ContentBased => self.content_based(request).await?,
            RecommendationStrategy::Hybrid => self.hybrid(request).await?,
        };

        debug!(
            strategy = %request.strategy,
            result_count = response.results.len(),
            effective_threshold = response.effective_threshold,
            "Recommendation complete"
        );
        Ok(response)
    }

    async fn item_based(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        let (source, vector) = self.single_source(request).await?;
        let reason = format!("Similar to \"{}\"", source.title);

        let candidates = self
            .find_similar_candidates(&vector, request, &[source.id])
            .await?;
        Ok(self.finish(RecommendationStrategy::ItemBased, candidates, request, |_| reason.clone()))
    }

    async fn multi_item(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        if request.item_ids.is_empty() {
            return Err(Error::InvalidInput("item_ids must not be empty".into()));
        }
        let sources = self.records.get_many(&request.item_ids).await?;
        if sources.is_empty() {
            return Err(Error::NotFound(request.item_ids[0]));
        }

        let embeddings: Vec<Vec<f32>> = sources
            .iter()
            .filter_map(|r| r.embedding.clone())
            .collect();
        if embeddings.is_empty() {
            return Err(Error::MissingEmbedding(
                "none of the source records has an embedding".into(),
            ));
        }
        let vector = centroid(&embeddings)?;

        let titles: Vec<String> = sources.iter().map(|r| format!("\"{}\"", r.title)).collect();
        let reason = format!(
            "Matches the combined profile of {} items: {}",
            sources.len(),
            titles.join(", ")
        );

        let source_ids: Vec<Uuid> = sources.iter().map(|r| r.id).collect();
        let candidates = self
            .find_similar_candidates(&vector, request, &source_ids)
            .await?;
        Ok(self.finish(RecommendationStrategy::MultiItem, candidates, request, |_| reason.clone()))
    }

    async fn content_based(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse> {
        let query = request
            .query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| Error::InvalidInput("content strategy requires a query".into()))?;

        let vector = self.embedder.embed(query).await?;
        let reason = format!("Related to your query \"{}\"", query);

        let candidates = self.find_similar_candidates(&vector, request, &[]).await?;
        Ok(self.finish(RecommendationStrategy::ContentBased, candidates, request, |_| {
            reason.clone()
        }))
    }

    async fn hybrid(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        let query = request
            .query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| Error::InvalidInput("hybrid strategy requires a query".into()))?;
        if request.item_ids.is_empty() {
            return Err(Error::InvalidInput(
                "hybrid strategy requires at least one item id".into(),
            ));
        }

        // Item side: single embedding or centroid, depending on id count.
        let sources = self.records.get_many(&request.item_ids).await?;
        if sources.is_empty() {
            return Err(Error::NotFound(request.item_ids[0]));
        }
        let embeddings: Vec<Vec<f32>> = sources
            .iter()
            .filter_map(|r| r.embedding.clone())
            .collect();
        if embeddings.is_empty() {
            return Err(Error::MissingEmbedding(
                "none of the source records has an embedding".into(),
            ));
        }
        let item_vector = if embeddings.len() == 1 {
            embeddings.into_iter().next().unwrap()
        } else {
            centroid(&embeddings)?
        };
        let source_ids: Vec<Uuid> = sources.iter().map(|r| r.id).collect();
        let source_titles: Vec<String> =
            sources.iter().map(|r| format!("\"{}\"", r.title)).collect();

        // Run both retrievals independently, then merge by record id.
        let item_candidates = self
            .find_similar_candidates(&item_vector, request, &source_ids)
            .await?;
        let query_vector = self.embedder.embed(query).await?;
        let content_candidates = self
            .find_similar_candidates(&query_vector, request, &source_ids)
            .await?;

        let w = request.weights;
        let mut merged: HashMap<Uuid, (ScoredCandidate, f32, bool, bool)> = HashMap::new();
        for c in item_candidates {
            let score = c.similarity * w.item;
            merged.insert(c.record.id, (c, score, true, false));
        }
        for c in content_candidates {
            match merged.get_mut(&c.record.id) {
                Some(entry) => {
                    entry.1 += c.similarity * w.content;
                    // Reachable through both signals; report the stronger
                    // raw retrieval similarity.
                    if c.similarity > entry.0.similarity {
                        entry.0.similarity = c.similarity;
                        entry.0.distance = c.distance;
                    }
                    entry.3 = true;
                }
                None => {
                    let score = c.similarity * w.content;
                    merged.insert(c.record.id, (c, score, false, true));
                }
            }
        }

        let item_reason = format!("Similar to {}", source_titles.join(", "));

        let mut combined: Vec<(ScoredCandidate, f32, String)> = merged
            .into_values()
            .map(|(candidate, score, from_item, from_content)| {
                let reason = match (from_item, from_content) {
                    (true, true) => {
                        format!("{} and related to your query \"{}\"", item_reason, query)
                    }
                    (true, false) => item_reason.clone(),
                    (false, _) => format!("Related to your query \"{}\"", query),
                };
                (candidate, score, reason)
            })
            .collect();
        combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let total_candidates = combined.len();

        // Relax on the merged score so the fallback behaves like the
        // other strategies; raw retrieval similarities are kept aside
        // for the result payload.
        let reasons: HashMap<Uuid, String> = combined
            .iter()
            .map(|(c, _, reason)| (c.record.id, reason.clone()))
            .collect();
        let raw: HashMap<Uuid, (f32, f32)> = combined
            .iter()
            .map(|(c, _, _)| (c.record.id, (c.similarity, c.distance)))
            .collect();
        let scored: Vec<ScoredCandidate> = combined
            .into_iter()
            .map(|(mut c, score, _)| {
                c.similarity = score;
                c
            })
            .collect();

        let threshold = request
            .min_similarity
            .unwrap_or(self.config.default_similarity_threshold);
        let outcome = relax(
            &scored,
            threshold,
            &self.config.relaxation_sequence,
            request.limit,
        );

        let mut results: Vec<RecommendationResult> = outcome
            .candidates
            .into_iter()
            .map(|c| {
                let (similarity, distance) = raw
                    .get(&c.record.id)
                    .copied()
                    .unwrap_or((c.similarity, c.distance));
                RecommendationResult {
                    reason: reasons.get(&c.record.id).cloned().unwrap_or_default(),
                    similarity,
                    distance,
                    recommendation_score: c.similarity,
                    record: c.record,
                }
            })
            .collect();
        results.sort_by(|a, b| {
            b.recommendation_score
                .partial_cmp(&a.recommendation_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(request.limit);

        Ok(RecommendationResponse {
            strategy: RecommendationStrategy::Hybrid,
            results,
            total_candidates,
            effective_threshold: outcome.effective_threshold,
        })
    }

    /// Resolve the single source record and its embedding.
    async fn single_source(
        &self,
        request: &RecommendationRequest,
    ) -> Result<(MediaRecord, Vec<f32>)> {
        let [item_id] = request.item_ids[..] else {
            return Err(Error::InvalidInput(
                "item strategy requires exactly one item id".into(),
            ));
        };
        let record = self
            .records
            .get(item_id)
            .await?
            .ok_or(Error::NotFound(item_id))?;
        let vector = record.embedding.clone().ok_or_else(|| {
            Error::MissingEmbedding(format!("record {} has no embedding", item_id))
        })?;
        Ok((record, vector))
    }

    /// Shared retrieval primitive: fetch and resolve scored candidates
    /// for a source vector, excluding sources and requested exclusions.
    async fn find_similar_candidates(
        &self,
        vector: &[f32],
        request: &RecommendationRequest,
        source_ids: &[Uuid],
    ) -> Result<Vec<ScoredCandidate>> {
        let metric = DistanceMetric::default();
        let mut exclude: Vec<Uuid> = source_ids.to_vec();
        exclude.extend_from_slice(&request.exclude_ids);

        let hits = self
            .vectors
            .query(
                vector,
                request.limit * self.config.candidate_multiplier,
                &exclude,
                metric,
                self.config.max_distance(metric),
            )
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

    /// Apply relaxation and package results for single-signal strategies.
    fn finish(
        &self,
        strategy: RecommendationStrategy,
        candidates: Vec<ScoredCandidate>,
        request: &RecommendationRequest,
        reason: impl Fn(&MediaRecord) -> String,
    ) -> RecommendationResponse {
        let total_candidates = candidates.len();
        let threshold = request
            .min_similarity
            .unwrap_or(self.config.default_similarity_threshold);
        let outcome = relax(
            &candidates,
            threshold,
            &self.config.relaxation_sequence,
            request.limit,
        );

        let mut results: Vec<RecommendationResult> = outcome
            .candidates
            .into_iter()
            .map(|c| RecommendationResult {
                reason: reason(&c.record),
                similarity: c.similarity,
                distance: c.distance,
                recommendation_score: c.similarity,
                record: c.record,
            })
            .collect();
        results.sort_by(|a, b| {
            b.recommendation_score
                .partial_cmp(&a.recommendation_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(request.limit);

        RecommendationResponse {
            strategy,
            results,
            total_candidates,
            effective_threshold: outcome.effective_threshold,
        }
    }
}
