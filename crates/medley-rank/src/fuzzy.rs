//! Typo-tolerant fuzzy text search over catalog records.
//!
//! Scans a candidate set field-by-field using Levenshtein similarity.
//! Explicitly unindexed: complexity is
//! O(records × fields × |query words| × |text words| × edit distance),
//! acceptable for in-memory corpora.

use serde::{Deserialize, Serialize};
use tracing::debug;

use medley_core::MediaRecord;

use crate::levenshtein;

/// Score awarded when a text word starts with the query word.
const PREFIX_MATCH_SCORE: f32 = 0.9;

/// Record field scanned by fuzzy search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Description,
    Content,
}

impl SearchField {
    /// All scannable fields, in scan order.
    pub const ALL: [SearchField; 3] = [Self::Title, Self::Description, Self::Content];
}

impl std::fmt::Display for SearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Description => write!(f, "description"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// A fuzzy search hit: the best-matching field of one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub record: MediaRecord,
    pub score: f32,
    pub matched_field: SearchField,
    /// Bounded excerpt of the matched field.
    pub matched_text: String,
}

/// Score how well `text` matches `query`, in [0, 1].
///
/// Strategy, taking the best score found:
/// 1. Exact substring containment scores 1.0.
/// 2. Word-level matching: each query word takes the best of a prefix
///    match (0.9) or Levenshtein similarity when that clears `threshold`.
///    Scores are averaged over the *total* query word count, so query
///    words with no acceptable candidate drag the average down.
pub fn fuzzy_match(text: &str, query: &str, threshold: f32) -> f32 {
    let text = text.to_lowercase();
    let query = query.to_lowercase();

    if query.is_empty() || text.is_empty() {
        return 0.0;
    }

    if text.contains(&query) {
        return 1.0;
    }

    let text_words: Vec<&str> = text.split_whitespace().collect();
    let query_words: Vec<&str> = query.split_whitespace().collect();
    if query_words.is_empty() || text_words.is_empty() {
        return 0.0;
    }

    let mut total_score = 0.0;
    for query_word in &query_words {
        let mut best = 0.0f32;
        for text_word in &text_words {
            let score = if text_word.starts_with(query_word) {
                PREFIX_MATCH_SCORE
            } else {
                let sim = levenshtein::similarity(text_word, query_word);
                if sim >= threshold {
                    sim
                } else {
                    0.0
                }
            };
            if score > best {
                best = score;
            }
        }
        total_score += best;
    }

    // Denominator is always the full query word count; partial coverage
    // is penalized.
    total_score / query_words.len() as f32
}

/// Scan `records` field-by-field, keeping the single best (score, field,
/// snippet) per record. Records whose best score clears `min_score` are
/// returned sorted descending by score and truncated to `limit`.
pub fn field_search(
    records: &[MediaRecord],
    query: &str,
    min_score: f32,
    fields: &[SearchField],
    word_threshold: f32,
    snippet_len: usize,
    limit: usize,
) -> Vec<FuzzyMatch> {
    let mut matches: Vec<FuzzyMatch> = Vec::new();

    for record in records {
        let mut best: Option<(f32, SearchField, String)> = None;

        for &field in fields {
            let text = match field {
                SearchField::Title => Some(record.title.as_str()),
                SearchField::Description => record.description.as_deref(),
                SearchField::Content => record.content.as_deref(),
            };
            let Some(text) = text else { continue };

            let score = fuzzy_match(text, query, word_threshold);
            if score > best.as_ref().map_or(0.0, |(s, _, _)| *s) {
                let snippet = match field {
                    SearchField::Content => truncate_snippet(text, snippet_len),
                    _ => text.to_string(),
                };
                best = Some((score, field, snippet));
            }
        }

        if let Some((score, field, snippet)) = best {
            if score >= min_score {
                matches.push(FuzzyMatch {
                    record: record.clone(),
                    score,
                    matched_field: field,
                    matched_text: snippet,
                });
            }
        }
    }

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(limit);

    debug!(
        query = %query,
        min_score,
        result_count = matches.len(),
        "Fuzzy field search complete"
    );

    matches
}

/// Truncate text to a bounded preview on a char boundary.
fn truncate_snippet(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len).collect();
    format!("{}...", truncated)
}
