//! Multi-factor relevance boosting.
//!
//! Takes one retrieved candidate plus the original query and applies a
//! capped stack of boost factors: media type, platform, title/description
//! field match, format, keyword, intent, transcription, recency. Each
//! factor is computed independently as a `(name, multiplier)` pair and the
//! pairs are folded into one capped adjustment, which yields the
//! diagnostic trace for free.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use medley_core::{AppliedBoost, BoostMode, EngineConfig, MediaRecord, MediaType};

/// Outcome of relevance boosting for one candidate.
#[derive(Debug, Clone)]
pub struct BoostOutcome {
    /// Final score in `[base, min(1.0, base × max_total_boost)]`.
    pub score: f32,
    /// Capped combined multiplier actually applied.
    pub multiplier: f32,
    /// Ordered factors that fired.
    pub trace: Vec<AppliedBoost>,
}

/// Injected diagnostic sink receiving the trace of every boosted
/// candidate. Optional; correctness never depends on it.
pub type TraceSink = dyn Fn(&MediaRecord, &[AppliedBoost]) + Send + Sync;

/// Known media platform: canonical name, query aliases, URL pattern.
struct Platform {
    name: &'static str,
    aliases: &'static [&'static str],
    url_pattern: &'static Lazy<Regex>,
}

static YOUTUBE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(youtube\.com|youtu\.be)").expect("valid regex"));
static VIMEO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)vimeo\.com").expect("valid regex"));
static SPOTIFY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)spotify\.com").expect("valid regex"));
static SOUNDCLOUD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)soundcloud\.com").expect("valid regex"));
static TWITCH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)twitch\.tv").expect("valid regex"));

static PLATFORMS: &[Platform] = &[
    Platform {
        name: "youtube",
        aliases: &["youtube", "yt"],
        url_pattern: &YOUTUBE_RE,
    },
    Platform {
        name: "vimeo",
        aliases: &["vimeo"],
        url_pattern: &VIMEO_RE,
    },
    Platform {
        name: "spotify",
        aliases: &["spotify"],
        url_pattern: &SPOTIFY_RE,
    },
    Platform {
        name: "soundcloud",
        aliases: &["soundcloud"],
        url_pattern: &SOUNDCLOUD_RE,
    },
    Platform {
        name: "twitch",
        aliases: &["twitch"],
        url_pattern: &TWITCH_RE,
    },
];

/// Format names recognized from MIME subtypes and URL extensions.
static FORMATS: &[(&str, &[&str])] = &[
    ("mp3", &["audio/mpeg", "audio/mp3", ".mp3"]),
    ("wav", &["audio/wav", "audio/x-wav", ".wav"]),
    ("flac", &["audio/flac", ".flac"]),
    ("ogg", &["audio/ogg", ".ogg"]),
    ("mp4", &["video/mp4", ".mp4"]),
    ("webm", &["video/webm", ".webm"]),
    ("mov", &["video/quicktime", ".mov"]),
    ("mkv", &["video/x-matroska", ".mkv"]),
    ("avi", &["video/x-msvideo", ".avi"]),
    ("png", &["image/png", ".png"]),
    ("jpeg", &["image/jpeg", ".jpg", ".jpeg"]),
    ("gif", &["image/gif", ".gif"]),
    ("pdf", &["application/pdf", ".pdf"]),
];

/// Type-specific query keywords, expanded beyond the type synonyms.
fn type_keywords(media_type: MediaType) -> &'static [&'static str] {
    match media_type {
        MediaType::Audio => &[
            "listen", "hear", "playlist", "album", "track", "radio", "episode", "audiobook",
        ],
        MediaType::Video => &[
            "watch", "stream", "trailer", "documentary", "series", "episode", "screencast",
        ],
        MediaType::Image => &["view", "gallery", "wallpaper", "diagram", "chart", "infographic"],
        MediaType::Text => &["read", "article", "blog", "paper", "guide", "documentation"],
    }
}

/// Intent category: name, trigger keywords, optional media-type restriction.
static INTENTS: &[(&str, &[&str], Option<MediaType>)] = &[
    ("tutorial", &["tutorial", "how to", "learn", "course", "lesson"], None),
    ("review", &["review", "opinion", "rating", "comparison", "versus"], None),
    ("music", &["music", "song", "album", "listen"], Some(MediaType::Audio)),
    ("interview", &["interview", "conversation", "q&a"], None),
    ("lecture", &["lecture", "seminar", "class", "keynote"], None),
    ("demo", &["demo", "demonstration", "walkthrough", "showcase"], Some(MediaType::Video)),
    ("news", &["news", "report", "announcement", "update"], None),
];

/// Relevance booster with an immutable config and an optional trace sink.
pub struct RelevanceBooster {
    config: EngineConfig,
    sink: Option<Box<TraceSink>>,
}

impl RelevanceBooster {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, sink: None }
    }

    /// Install a diagnostic sink receiving every non-empty boost trace.
    pub fn with_trace_sink(mut self, sink: Box<TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Boost `base_similarity` for `record` against `query`, evaluated now.
    pub fn boost(&self, record: &MediaRecord, query: &str, base_similarity: f32) -> BoostOutcome {
        self.boost_at(record, query, base_similarity, Utc::now())
    }

    /// Boost with an explicit evaluation time for the recency factor.
    pub fn boost_at(
        &self,
        record: &MediaRecord,
        query: &str,
        base_similarity: f32,
        now: DateTime<Utc>,
    ) -> BoostOutcome {
        if base_similarity < self.config.min_similarity_for_boost {
            return BoostOutcome {
                score: base_similarity,
                multiplier: 1.0,
                trace: Vec::new(),
            };
        }

        let query_lc = query.to_lowercase();
        let query_words = words(&query_lc);
        let b = &self.config.boost;

        let checks: [(&'static str, Option<f32>); 9] = [
            ("type", media_type_factor(record, &query_lc, b.media_type)),
            ("platform", platform_factor(record, &query_lc, b.platform)),
            (
                "title",
                field_factor(&record.title.to_lowercase(), &query_lc, &query_words, b.title),
            ),
            (
                "description",
                record.description.as_deref().and_then(|d| {
                    field_factor(&d.to_lowercase(), &query_lc, &query_words, b.description)
                }),
            ),
            ("format", format_factor(record, &query_lc, b.format)),
            (
                "keyword",
                keyword_factor(record.media_type, &query_lc, b.keyword),
            ),
            ("intent", intent_factor(record.media_type, &query_lc, b.intent)),
            (
                "transcription",
                record.content.as_deref().and_then(|c| {
                    transcription_factor(&c.to_lowercase(), &query_lc, &query_words, b.transcription)
                }),
            ),
            (
                "recency",
                recency_factor(record, now, self.config.recency_window_days, b.recency),
            ),
        ];

        let trace: Vec<AppliedBoost> = checks
            .into_iter()
            .filter_map(|(name, factor)| {
                factor.filter(|f| *f > 1.0).map(|factor| AppliedBoost {
                    name: name.to_string(),
                    factor,
                })
            })
            .collect();

        let multiplier = match self.config.boost_mode {
            BoostMode::Multiplicative => trace.iter().fold(1.0f32, |acc, a| acc * a.factor),
            // Additive mode sums each factor's adjustment instead of
            // compounding; diverges from multiplicative near the cap.
            BoostMode::Additive => 1.0 + trace.iter().map(|a| a.factor - 1.0).sum::<f32>(),
        };
        let multiplier = multiplier.min(self.config.max_total_boost);
        let score = (base_similarity * multiplier).min(1.0);

        if !trace.is_empty() {
            debug!(
                record_id = %record.id,
                boost_multiplier = multiplier,
                factors = trace.len(),
                "Relevance boost applied"
            );
            if let Some(sink) = &self.sink {
                sink(record, &trace);
            }
        }

        BoostOutcome {
            score,
            multiplier,
            trace,
        }
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Query mentions the record's media type name or a synonym.
fn media_type_factor(record: &MediaRecord, query_lc: &str, boost: f32) -> Option<f32> {
    record
        .media_type
        .synonyms()
        .iter()
        .any(|syn| query_lc.contains(syn))
        .then_some(boost)
}

/// Record URL matches a known platform the query also names.
fn platform_factor(record: &MediaRecord, query_lc: &str, boost: f32) -> Option<f32> {
    let url = record.source_url.as_deref()?;
    PLATFORMS
        .iter()
        .any(|p| {
            p.url_pattern.is_match(url) && p.aliases.iter().any(|alias| query_lc.contains(alias))
        })
        .then_some(boost)
}

/// Tiered field matching: exact phrase and all-words get the full boost,
/// partial coverage gets 90% of it.
fn field_factor(field_lc: &str, query_lc: &str, query_words: &[&str], boost: f32) -> Option<f32> {
    if query_words.is_empty() || field_lc.is_empty() {
        return None;
    }
    if field_lc.contains(query_lc) {
        return Some(boost);
    }

    let present = query_words
        .iter()
        .filter(|w| field_lc.contains(*w))
        .count();
    let coverage = present as f32 / query_words.len() as f32;

    if coverage >= 1.0 {
        Some(boost)
    } else if present > 0 {
        // Both the ≥60% tier and the any-words tier take 90% of the
        // boost amount
        Some(1.0 + (boost - 1.0) * 0.9)
    } else {
        None
    }
}

/// Record format/codec named in the query, from MIME type or extension.
fn format_factor(record: &MediaRecord, query_lc: &str, boost: f32) -> Option<f32> {
    let mime = record.mime_type.as_deref().unwrap_or("").to_lowercase();
    let url = record.source_url.as_deref().unwrap_or("").to_lowercase();
    let path = record.source_path.as_deref().unwrap_or("").to_lowercase();

    FORMATS
        .iter()
        .any(|(name, markers)| {
            let declared = markers.iter().any(|m| {
                if let Some(ext) = m.strip_prefix('.') {
                    has_extension(&url, ext) || has_extension(&path, ext)
                } else {
                    mime == *m
                }
            });
            declared && query_lc.contains(name)
        })
        .then_some(boost)
}

fn has_extension(location: &str, ext: &str) -> bool {
    let trimmed = location.split(['?', '#']).next().unwrap_or(location);
    trimmed.ends_with(&format!(".{}", ext))
}

/// Type-specific keyword list; strength scales with distinct hits.
fn keyword_factor(media_type: MediaType, query_lc: &str, boost: f32) -> Option<f32> {
    let hits = type_keywords(media_type)
        .iter()
        .filter(|kw| query_lc.contains(*kw))
        .count();
    if hits == 0 {
        return None;
    }
    let scale = (0.5 + 0.25 * hits as f32).min(1.0);
    Some(1.0 + (boost - 1.0) * scale)
}

/// Query expresses a recognizable intent category, some type-restricted.
fn intent_factor(media_type: MediaType, query_lc: &str, boost: f32) -> Option<f32> {
    INTENTS
        .iter()
        .any(|(_, keywords, restriction)| {
            if let Some(required) = restriction {
                if *required != media_type {
                    return false;
                }
            }
            keywords.iter().any(|kw| query_lc.contains(kw))
        })
        .then_some(boost)
}

/// Transcription matching tiers, strongest first: exact phrase, any
/// consecutive 2-word sub-phrase, all words, ≥60% of words, any word.
fn transcription_factor(
    content_lc: &str,
    query_lc: &str,
    query_words: &[&str],
    boost: f32,
) -> Option<f32> {
    if content_lc.is_empty() || query_words.is_empty() {
        return None;
    }

    let strength = if content_lc.contains(query_lc) {
        1.0
    } else if query_words
        .windows(2)
        .any(|pair| content_lc.contains(&format!("{} {}", pair[0], pair[1])))
    {
        0.8
    } else {
        let present = query_words
            .iter()
            .filter(|w| content_lc.contains(*w))
            .count();
        let coverage = present as f32 / query_words.len() as f32;
        if present == query_words.len() {
            0.7
        } else if coverage >= 0.6 {
            0.5
        } else if present > 0 {
            0.3
        } else {
            return None;
        }
    };

    Some(1.0 + (boost - 1.0) * strength)
}

/// Linearly-decaying bonus inside the recency window.
fn recency_factor(
    record: &MediaRecord,
    now: DateTime<Utc>,
    window_days: i64,
    boost: f32,
) -> Option<f32> {
    if window_days <= 0 {
        return None;
    }
    let age = now.signed_duration_since(record.created_at);
    let age_days = age.num_seconds() as f32 / 86_400.0;
    if age_days < 0.0 || age_days >= window_days as f32 {
        return None;
    }
    let freshness = 1.0 - age_days / window_days as f32;
    Some(1.0 + (boost - 1.0) * freshness)
}
