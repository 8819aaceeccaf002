//! # medley-core
//!
//! Core types, traits, and configuration for the medley catalog engine.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the ranking engine (`medley-rank`) and the embedding
//! backends (`medley-inference`) depend on.

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{BoostFactors, BoostMode, EngineConfig};
pub use error::{Error, Result};
pub use models::{
    AppliedBoost, DistanceMetric, MediaRecord, MediaType, RankedResult, RecommendationResult,
    ScoredCandidate,
};
pub use traits::{EmbeddingProvider, RecordStore, VectorStore};
