//! Word timing resolution.
//!
//! Transcribed timestamps are the primary source. When the transcriber
//! produced nothing, every whitespace-separated token of the narration gets
//! an equal slice of the audio.

use serde::Serialize;
use wordcast_project_model::timing::{RawWord, WordTiming};

/// Where a resolved timing track came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingSource {
    /// Word timestamps reported by transcription.
    Transcribed,
    /// Uniform split of the narration text over the audio duration.
    Uniform,
}

/// Output of [`resolve_timings`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTimings {
    pub words: Vec<WordTiming>,
    pub source: TimingSource,
}

impl ResolvedTimings {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

/// Produce the caption timing track for one narration.
///
/// Non-empty `raw_words` are trimmed, words that become empty are dropped,
/// and `start`/`end` are kept verbatim in the given order. An empty
/// `raw_words` falls back to [`uniform_timings`] over `full_text`.
pub fn resolve_timings(
    raw_words: &[RawWord],
    total_duration_secs: f64,
    full_text: &str,
) -> ResolvedTimings {
    if raw_words.is_empty() {
        let words = uniform_timings(full_text, total_duration_secs);
        tracing::debug!(
            words = words.len(),
            duration_secs = total_duration_secs,
            "No transcribed words, using uniform timing"
        );
        return ResolvedTimings {
            words,
            source: TimingSource::Uniform,
        };
    }

    let words: Vec<WordTiming> = raw_words
        .iter()
        .filter_map(|raw| {
            let word = raw.word.trim();
            (!word.is_empty()).then(|| WordTiming::new(word, raw.start, raw.end))
        })
        .collect();

    let dropped = raw_words.len() - words.len();
    if dropped > 0 {
        tracing::debug!(dropped, "Dropped blank transcribed words");
    }

    ResolvedTimings {
        words,
        source: TimingSource::Transcribed,
    }
}

/// Split `text` on whitespace and give every token an equal share of
/// `total_duration_secs`.
///
/// Token `k` of `n` spans `[k·avg, (k+1)·avg)` with `avg = total / n`; the
/// last token ends exactly at `total_duration_secs`. A non-positive or
/// non-finite duration yields zero-length intervals at `0.0`.
pub fn uniform_timings(text: &str, total_duration_secs: f64) -> Vec<WordTiming> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let total = if total_duration_secs.is_finite() {
        total_duration_secs.max(0.0)
    } else {
        0.0
    };
    let count = tokens.len().max(1);
    let avg = total / count as f64;

    tokens
        .iter()
        .enumerate()
        .map(|(k, token)| {
            let start = k as f64 * avg;
            let end = if k + 1 == count {
                total
            } else {
                (k + 1) as f64 * avg
            };
            WordTiming::new(*token, start, end)
        })
        .collect()
}
