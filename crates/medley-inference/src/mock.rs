//! Deterministic mock embedding backend for tests.
//!
//! Produces the same vector for the same input text on every call, so
//! tests that compare or rank embeddings are reproducible without a
//! model server. Specific inputs can be pinned to fixed vectors and
//! failures can be injected.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use medley_core::{EmbeddingProvider, Error, Result};

/// Mock backend generating deterministic pseudo-random vectors.
pub struct MockEmbeddingBackend {
    dimension: usize,
    pinned: Mutex<HashMap<String, Vec<f32>>>,
    fail_on: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockEmbeddingBackend {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            pinned: Mutex::new(HashMap::new()),
            fail_on: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Pin an exact input text to a fixed vector.
    pub fn with_pinned(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.pinned.lock().unwrap().insert(text.into(), vector);
        self
    }

    /// Fail with `Error::Provider` when asked to embed this exact text.
    pub fn with_failure_on(self, text: impl Into<String>) -> Self {
        *self.fail_on.lock().unwrap() = Some(text.into());
        self
    }

    /// Texts embedded so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        // Seed a splitmix-style generator from the text hash; components
        // land in [-1, 1].
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        (0..self.dimension)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let bits = (state >> 33) as u32;
                (bits as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());

        if let Some(fail) = self.fail_on.lock().unwrap().as_deref() {
            if fail == text {
                return Err(Error::Provider(format!(
                    "mock failure injected for \"{}\"",
                    text
                )));
            }
        }

        if let Some(v) = self.pinned.lock().unwrap().get(text) {
            return Ok(v.clone());
        }

        Ok(self.generate(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
