//! Batch corpus embedding.
//!
//! Re-embeds a set of records sequentially with a throttle delay between
//! provider calls, collecting per-record outcomes so one failure does not
//! abort the rest of the batch.

use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use medley_core::{EmbeddingProvider, MediaRecord};

/// Default pause between embedding calls (milliseconds).
pub const DEFAULT_INTER_CALL_DELAY_MS: u64 = 100;

/// Settings for a batch embedding run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause between consecutive provider calls.
    pub inter_call_delay: Duration,
    /// Skip records that already carry an embedding.
    pub skip_embedded: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_call_delay: Duration::from_millis(DEFAULT_INTER_CALL_DELAY_MS),
            skip_embedded: true,
        }
    }
}

/// Result of embedding one record.
#[derive(Debug, Clone)]
pub struct EmbedOutcome {
    pub record_id: Uuid,
    pub embedding: Option<Vec<f32>>,
    pub error: Option<String>,
    pub skipped: bool,
}

/// Text fed to the embedding model for a record: title plus whatever
/// descriptive fields are present.
pub fn embedding_text(record: &MediaRecord) -> String {
    let mut parts = vec![record.title.clone()];
    if let Some(d) = &record.description {
        parts.push(d.clone());
    }
    if let Some(c) = &record.content {
        parts.push(c.clone());
    }
    parts.join("\n")
}

/// Embed each record in turn, pausing between calls.
pub async fn embed_corpus(
    provider: &dyn EmbeddingProvider,
    records: &[MediaRecord],
    config: &BatchConfig,
) -> Vec<EmbedOutcome> {
    let mut outcomes = Vec::with_capacity(records.len());
    let mut first_call = true;

    for record in records {
        if config.skip_embedded && record.has_embedding() {
            outcomes.push(EmbedOutcome {
                record_id: record.id,
                embedding: None,
                error: None,
                skipped: true,
            });
            continue;
        }

        if !first_call && !config.inter_call_delay.is_zero() {
            tokio::time::sleep(config.inter_call_delay).await;
        }
        first_call = false;

        let text = embedding_text(record);
        match provider.embed(&text).await {
            Ok(embedding) => {
                debug!(record_id = %record.id, "Record embedded");
                outcomes.push(EmbedOutcome {
                    record_id: record.id,
                    embedding: Some(embedding),
                    error: None,
                    skipped: false,
                });
            }
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Failed to embed record");
                outcomes.push(EmbedOutcome {
                    record_id: record.id,
                    embedding: None,
                    error: Some(e.to_string()),
                    skipped: false,
                });
            }
        }
    }

    outcomes
}
