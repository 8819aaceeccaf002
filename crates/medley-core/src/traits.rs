//! Trait seams for the engine's external collaborators.
//!
//! The ranking core never talks to a network or a database directly; it
//! consumes these traits. Production backends live in `medley-inference`
//! (embeddings) and whatever store the host application wires in; tests
//! use in-memory implementations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DistanceMetric, MediaRecord};

/// Generates fixed-length embedding vectors for text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. Fails with [`crate::Error::Provider`] when the
    /// backing API is misconfigured or the call errors.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Vector dimension this provider produces, fixed per corpus.
    fn dimension(&self) -> usize;
}

/// Nearest-neighbor candidate retrieval.
///
/// Implementations must return hits ordered ascending by distance, must
/// tolerate zero matches (empty list, not an error), and must never
/// return records that have no embedding.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `limit` `(record_id, distance)` pairs for the query
    /// vector, excluding `exclude_ids`, under the given metric. Hits with
    /// distance above `max_distance` are dropped.
    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        exclude_ids: &[Uuid],
        metric: DistanceMetric,
        max_distance: f32,
    ) -> Result<Vec<(Uuid, f32)>>;
}

/// Record CRUD at the granularity the engine needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one record; `Ok(None)` when the id is unknown.
    async fn get(&self, id: Uuid) -> Result<Option<MediaRecord>>;

    /// Bulk fetch, preserving input order; unknown ids are skipped.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<MediaRecord>>;

    /// Full corpus scan, used by fuzzy search.
    async fn list(&self) -> Result<Vec<MediaRecord>>;
}
