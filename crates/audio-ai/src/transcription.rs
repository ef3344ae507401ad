//! Word-level transcription of the narration.
//!
//! Transcription is best effort: any failure is reported as
//! [`TranscriptionOutcome::Unavailable`] and the caller falls back to
//! uniform timing. It never fails an entry.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wordcast_common::config::{TranscriptionEngine, TranscriptionSettings};
use wordcast_common::error::{WordcastError, WordcastResult};
use wordcast_common::process::{command_exists, stderr_tail};
use wordcast_project_model::timing::RawWord;

/// Whisper model size selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhisperModel {
    /// Fastest, least accurate (~39 MB).
    Tiny,
    /// Good balance of speed and accuracy (~142 MB).
    Base,
    /// Better accuracy, slower (~466 MB).
    Small,
    /// High accuracy (~1.5 GB).
    Medium,
    /// Best accuracy, slowest (~2.9 GB).
    Large,
}

impl WhisperModel {
    /// Name passed to `whisper --model`.
    pub fn as_str(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "tiny",
            WhisperModel::Base => "base",
            WhisperModel::Small => "small",
            WhisperModel::Medium => "medium",
            WhisperModel::Large => "large",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tiny" => Some(WhisperModel::Tiny),
            "base" => Some(WhisperModel::Base),
            "small" => Some(WhisperModel::Small),
            "medium" => Some(WhisperModel::Medium),
            "large" => Some(WhisperModel::Large),
            _ => None,
        }
    }
}

/// Result of asking a [`Transcriber`] for word timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionOutcome {
    /// Words in spoken order; may be empty.
    Words(Vec<RawWord>),
    /// No timestamps could be produced.
    Unavailable { reason: String },
}

impl TranscriptionOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Raw words for the timing resolver; `Unavailable` yields none.
    pub fn into_words(self) -> Vec<RawWord> {
        match self {
            TranscriptionOutcome::Words(words) => words,
            TranscriptionOutcome::Unavailable { .. } => Vec::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, TranscriptionOutcome::Words(_))
    }
}

/// Speech-to-word-timestamps backend.
pub trait Transcriber: Send + Sync {
    /// Transcribe the narration at `audio_path`.
    ///
    /// Intermediate files go next to the audio, inside the entry's scratch
    /// directory.
    fn transcribe(&self, audio_path: &Path, language: &str) -> TranscriptionOutcome;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// The `whisper` CLI with `--word_timestamps True`.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    binary: String,
    model: WhisperModel,
}

impl WhisperTranscriber {
    pub fn new(model: WhisperModel) -> Self {
        Self {
            binary: "whisper".to_string(),
            model,
        }
    }

    pub fn model(&self) -> WhisperModel {
        self.model
    }

    fn run(&self, audio_path: &Path, language: &str) -> WordcastResult<Vec<RawWord>> {
        let out_dir = audio_path.parent().unwrap_or_else(|| Path::new("."));
        let output = Command::new(&self.binary)
            .arg(audio_path)
            .args([
                "--model",
                self.model.as_str(),
                "--language",
                language,
                "--word_timestamps",
                "True",
                "--output_format",
                "json",
                "--fp16",
                "False",
                "--verbose",
                "False",
                "--output_dir",
            ])
            .arg(out_dir)
            .output()
            .map_err(|e| {
                WordcastError::transcription(format!("Failed to start {}: {e}", self.binary))
            })?;

        if !output.status.success() {
            return Err(WordcastError::transcription(format!(
                "{} failed (status {}): {}",
                self.binary,
                output.status,
                stderr_tail(&output.stderr, 5)
            )));
        }

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("narration");
        let json_path = out_dir.join(format!("{stem}.json"));
        let content = std::fs::read_to_string(&json_path).map_err(|e| {
            WordcastError::transcription(format!(
                "Missing whisper output {}: {e}",
                json_path.display()
            ))
        })?;
        parse_whisper_json(&content)
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio_path: &Path, language: &str) -> TranscriptionOutcome {
        tracing::info!(
            path = %audio_path.display(),
            model = self.model.as_str(),
            "Starting transcription"
        );

        if !audio_path.exists() {
            return TranscriptionOutcome::unavailable(format!(
                "audio file {} does not exist",
                audio_path.display()
            ));
        }

        let started = std::time::Instant::now();
        match self.run(audio_path, language) {
            Ok(words) => {
                tracing::info!(
                    words = words.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Transcription finished"
                );
                TranscriptionOutcome::Words(words)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Transcription unavailable");
                TranscriptionOutcome::unavailable(e.to_string())
            }
        }
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "whisper"
    }
}

/// Never produces timestamps; every entry uses uniform timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTranscriber;

impl Transcriber for NullTranscriber {
    fn transcribe(&self, _audio_path: &Path, _language: &str) -> TranscriptionOutcome {
        TranscriptionOutcome::unavailable("transcription disabled")
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Build the transcriber selected by `settings.engine`.
///
/// An unknown model name falls back to `base` with a warning.
pub fn transcriber_for(settings: &TranscriptionSettings) -> Arc<dyn Transcriber> {
    match settings.engine {
        TranscriptionEngine::None => Arc::new(NullTranscriber),
        TranscriptionEngine::Whisper => {
            let model = WhisperModel::parse(&settings.model).unwrap_or_else(|| {
                tracing::warn!(model = %settings.model, "Unknown whisper model, using base");
                WhisperModel::Base
            });
            Arc::new(WhisperTranscriber::new(model))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// Flatten `segments[].words[]` of a whisper JSON result into raw words.
///
/// Words are returned untrimmed and in file order.
pub fn parse_whisper_json(content: &str) -> WordcastResult<Vec<RawWord>> {
    let output: WhisperOutput = serde_json::from_str(content)
        .map_err(|e| WordcastError::transcription(format!("Invalid whisper JSON: {e}")))?;

    Ok(output
        .segments
        .into_iter()
        .flat_map(|segment| segment.words)
        .map(|w| RawWord::new(w.word, w.start, w.end))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> String {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("fixtures")
            .join("whisper")
            .join(name);
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_parse_whisper_fixture_flattens_segments() {
        let words = parse_whisper_json(&fixture("hello_world.json")).unwrap();
        assert_eq!(
            words,
            vec![
                RawWord::new(" Hello", 0.0, 0.62),
                RawWord::new(" world.", 0.62, 1.6),
                RawWord::new(" Goodbye.", 1.6, 2.4),
            ]
        );
    }

    #[test]
    fn test_parse_whisper_without_segments() {
        assert!(parse_whisper_json(r#"{"text": ""}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_whisper_rejects_garbage() {
        let err = parse_whisper_json("not json").unwrap_err();
        assert!(matches!(err, WordcastError::Transcription { .. }));
    }

    #[test]
    fn test_null_transcriber_is_unavailable() {
        let outcome = NullTranscriber.transcribe(Path::new("/nope.wav"), "en");
        assert!(!outcome.is_available());
        assert!(outcome.into_words().is_empty());
    }

    #[test]
    fn test_missing_audio_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let whisper = WhisperTranscriber::new(WhisperModel::Tiny);
        let outcome = whisper.transcribe(&dir.path().join("narration.mp3"), "en");
        assert!(matches!(outcome, TranscriptionOutcome::Unavailable { .. }));
    }

    #[test]
    fn test_missing_binary_is_unavailable_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("narration.mp3");
        std::fs::write(&audio, b"").unwrap();
        let whisper = WhisperTranscriber {
            binary: "wordcast-no-such-whisper".to_string(),
            model: WhisperModel::Base,
        };
        match whisper.transcribe(&audio, "en") {
            TranscriptionOutcome::Unavailable { reason } => {
                assert!(reason.contains("wordcast-no-such-whisper"));
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_factory_follows_engine_and_model() {
        let mut settings = TranscriptionSettings::default();
        assert_eq!(transcriber_for(&settings).name(), "whisper");

        settings.model = "gigantic".to_string();
        assert_eq!(transcriber_for(&settings).name(), "whisper");

        settings.engine = TranscriptionEngine::None;
        assert_eq!(transcriber_for(&settings).name(), "none");
    }

    #[test]
    fn test_whisper_model_names() {
        assert_eq!(WhisperModel::parse("Small"), Some(WhisperModel::Small));
        assert_eq!(WhisperModel::Large.as_str(), "large");
        assert_eq!(WhisperModel::parse("xl"), None);
    }
}
