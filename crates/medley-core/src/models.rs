//! Data model for the medley catalog engine.
//!
//! The central type is [`MediaRecord`], a catalog entry with optional
//! transcription content and an optional embedding vector. Candidate and
//! result types carry both the raw vector-store distance and derived
//! similarity so callers can always see where a score came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of media a catalog record holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Plain text document (default)
    #[default]
    Text,
    /// Audio file (podcast, music, recording)
    Audio,
    /// Video file or linked video
    Video,
    /// Still image
    Image,
}

impl MediaType {
    /// Canonical lowercase name, used by the relevance booster for
    /// type-in-query matching.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Image => "image",
        }
    }

    /// Query synonyms that count as mentioning this media type.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Self::Text => &["text", "document", "article", "note"],
            Self::Audio => &["audio", "podcast", "music", "song", "recording", "sound"],
            Self::Video => &["video", "movie", "clip", "film", "footage"],
            Self::Image => &["image", "photo", "picture", "screenshot"],
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "image" => Ok(Self::Image),
            _ => Err(format!("Invalid media type: {}", s)),
        }
    }
}

/// A catalog entry.
///
/// `embedding`, when present, always has exactly the corpus dimension;
/// records without an embedding are excluded from vector retrieval but
/// remain eligible for fuzzy search. Embeddings are generated
/// asynchronously after ingestion and attached later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: Uuid,
    pub title: String,
    pub media_type: MediaType,
    /// Text payload or transcription, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Local path for uploaded files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    /// Origin URL for linked media.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl MediaRecord {
    /// Create a minimal record with a fresh id and the current timestamp.
    pub fn new(title: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            media_type,
            content: None,
            description: None,
            source_path: None,
            source_url: None,
            mime_type: None,
            embedding: None,
            created_at: Utc::now(),
        }
    }

    /// Attach text content (transcription or document body).
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a source URL.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Attach a MIME type.
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Attach an embedding vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Override the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether this record can participate in vector retrieval.
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// Distance metric used by the external vector store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine distance: 0 = identical direction, 2 = opposite.
    #[default]
    Cosine,
    /// Euclidean (L2) distance, unbounded above.
    Euclidean,
    /// Negative inner product, as returned by IP indexes.
    InnerProduct,
}

impl DistanceMetric {
    /// Transform a raw store distance into a similarity in [0, 1].
    ///
    /// Cosine uses `1 - d`; Euclidean uses `1 / (1 + d)` since L2 distance
    /// is unbounded; inner product stores return negated dot products, so
    /// the negation is undone and clamped.
    pub fn similarity(&self, distance: f32) -> f32 {
        let s = match self {
            Self::Cosine => 1.0 - distance,
            Self::Euclidean => 1.0 / (1.0 + distance.max(0.0)),
            Self::InnerProduct => -distance,
        };
        s.clamp(0.0, 1.0)
    }

    /// Default maximum distance accepted from the store for this metric.
    pub fn default_max_distance(&self) -> f32 {
        match self {
            Self::Cosine => 1.3,
            Self::Euclidean => 20.0,
            Self::InnerProduct => 0.0,
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::Euclidean => write!(f, "euclidean"),
            Self::InnerProduct => write!(f, "inner_product"),
        }
    }
}

/// A record returned by the vector store for a query vector, before
/// ranking. Produced only by the store; immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub record: MediaRecord,
    pub distance: f32,
    pub similarity: f32,
}

impl ScoredCandidate {
    /// Build a candidate from a raw store hit under the given metric.
    pub fn new(record: MediaRecord, distance: f32, metric: DistanceMetric) -> Self {
        Self {
            record,
            distance,
            similarity: metric.similarity(distance),
        }
    }
}

/// One boost factor that fired during relevance boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedBoost {
    /// Factor name, e.g. "type", "platform", "title", "transcription".
    pub name: String,
    /// Multiplier contributed by this factor (> 1.0 when it fired).
    pub factor: f32,
}

/// A ranked search result. Derived, not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub record: MediaRecord,
    /// Raw similarity from the vector store.
    pub similarity: f32,
    pub distance: f32,
    /// Similarity after relevance boosting.
    pub relevance_score: f32,
    /// False when this result only survived the best-available fallback.
    pub semantic_match: bool,
    /// Ordered factors applied by the booster, for diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boost_trace: Vec<AppliedBoost>,
}

/// A scored recommendation. Derived, not persisted.
///
/// `recommendation_score` may be a weighted combination of several
/// underlying similarities when the record is reachable through more than
/// one source signal (hybrid strategy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub record: MediaRecord,
    pub similarity: f32,
    pub distance: f32,
    pub recommendation_score: f32,
    /// Human-readable explanation naming the source item(s) or query.
    pub reason: String,
}
