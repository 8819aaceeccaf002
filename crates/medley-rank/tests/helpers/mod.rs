//! Test helpers: in-memory stores and a stub embedding provider.
//!
//! The engine only sees the trait seams, so tests wire it to a corpus
//! held in a plain `Vec` with brute-force cosine search and an embedder
//! that maps known query strings to fixed vectors.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use medley_core::{
    DistanceMetric, EmbeddingProvider, Error, MediaRecord, RecordStore, Result, VectorStore,
};

/// In-memory record + vector store over a fixed corpus.
pub struct InMemoryCatalog {
    records: Vec<MediaRecord>,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<MediaRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryCatalog {
    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        exclude_ids: &[Uuid],
        metric: DistanceMetric,
        max_distance: f32,
    ) -> Result<Vec<(Uuid, f32)>> {
        assert_eq!(metric, DistanceMetric::Cosine, "tests use cosine only");

        let mut hits: Vec<(Uuid, f32)> = self
            .records
            .iter()
            .filter(|r| !exclude_ids.contains(&r.id))
            .filter_map(|r| {
                // Records without an embedding are never returned
                r.embedding
                    .as_ref()
                    .map(|e| (r.id, cosine_distance(vector, e)))
            })
            .filter(|(_, d)| *d <= max_distance)
            .collect();

        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl RecordStore for InMemoryCatalog {
    async fn get(&self, id: Uuid) -> Result<Option<MediaRecord>> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<MediaRecord>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.records.iter().find(|r| r.id == *id).cloned())
            .collect())
    }

    async fn list(&self) -> Result<Vec<MediaRecord>> {
        Ok(self.records.clone())
    }
}

/// Embedder returning pre-registered vectors for known texts.
pub struct StubEmbedder {
    dimension: usize,
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    default: Option<Vec<f32>>,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Mutex::new(HashMap::new()),
            default: None,
        }
    }

    /// Map an exact input text to a fixed vector.
    pub fn with_vector(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.lock().unwrap().insert(text.into(), vector);
        self
    }

    /// Vector returned for any unregistered text.
    pub fn with_default(mut self, vector: Vec<f32>) -> Self {
        self.default = Some(vector);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(v) = self.vectors.lock().unwrap().get(text) {
            return Ok(v.clone());
        }
        self.default
            .clone()
            .ok_or_else(|| Error::Provider(format!("no stub vector for \"{}\"", text)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
