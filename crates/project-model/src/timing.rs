//! Word timing types.
//!
//! All times are in seconds from the start of the narration audio.

use serde::{Deserialize, Serialize};

/// Shortest on-screen time for a caption word.
///
/// Zero or negative spans would otherwise produce overlays that never show.
pub const MIN_OVERLAY_SECS: f64 = 0.05;

/// One word as reported by a transcription source, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWord {
    /// Word text, possibly with surrounding whitespace.
    pub word: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

impl RawWord {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }
}

/// A caption word with its spoken interval.
///
/// `word` is trimmed and non-empty. Sequences are ordered by `start`.
/// Intervals coming from transcription keep the source's values verbatim, so
/// `end > start` holds for generated timings but is not re-validated for
/// transcribed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
        }
    }

    /// Raw span `end - start` (may be zero or negative for transcribed words).
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// On-screen duration with the [`MIN_OVERLAY_SECS`] floor applied.
    pub fn overlay_duration(&self) -> f64 {
        self.span().max(MIN_OVERLAY_SECS)
    }
}
