//! # medley-inference
//!
//! Embedding provider backends for the medley catalog.
//!
//! - [`OllamaEmbeddingBackend`]: talks to a local or remote Ollama server
//! - [`embed_corpus`]: sequential batch embedding with throttling
//! - `MockEmbeddingBackend` (feature `mock`): deterministic vectors for tests

pub mod batch;
pub mod ollama;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use batch::{embed_corpus, embedding_text, BatchConfig, EmbedOutcome};
pub use ollama::{
    OllamaEmbeddingBackend, DEFAULT_DIMENSION, DEFAULT_EMBED_MODEL, DEFAULT_OLLAMA_URL,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbeddingBackend;
