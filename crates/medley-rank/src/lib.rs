//! # medley-rank
//!
//! Ranking and recommendation engine for the medley catalog.
//!
//! This crate provides:
//! - Levenshtein edit-distance similarity and typo-tolerant fuzzy search
//! - Progressive similarity-threshold relaxation with best-available fallback
//! - Multi-factor relevance boosting (type, platform, field, keyword,
//!   intent, transcription, format, recency)
//! - Semantic search orchestration with related-concept extraction
//! - Item-based, multi-item centroid, content-based, and hybrid
//!   recommendations
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use medley_core::EngineConfig;
//! use medley_rank::{SemanticRanker, SemanticSearchOptions};
//!
//! let ranker = SemanticRanker::new(embedder, vector_store, record_store,
//!     EngineConfig::default());
//! let response = ranker
//!     .semantic_search("rust ownership tutorial", 10,
//!         SemanticSearchOptions::default())
//!     .await?;
//! ```

pub mod boost;
pub mod fuzzy;
pub mod levenshtein;
pub mod ranker;
pub mod recommend;
pub mod relaxation;

// Re-export core types
pub use medley_core::*;

// Re-export engine types
pub use boost::{BoostOutcome, RelevanceBooster, TraceSink};
pub use fuzzy::{field_search, fuzzy_match, FuzzyMatch, SearchField};
pub use ranker::{SearchMetadata, SemanticRanker, SemanticSearchOptions, SemanticSearchResponse};
pub use recommend::{
    centroid, HybridWeights, RecommendationRequest, RecommendationResponse,
    RecommendationStrategy, Recommender,
};
pub use relaxation::{relax, RelaxationOutcome};
