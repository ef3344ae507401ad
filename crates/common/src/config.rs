//! Application configuration.
//!
//! Every component receives its settings from an [`AppConfig`] value that is
//! built once per invocation and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output frame geometry.
    pub canvas: CanvasConfig,

    /// Caption styling.
    pub style: StyleConfig,

    /// Encoder settings.
    pub export: ExportSettings,

    /// Speech synthesis settings.
    pub narration: NarrationConfig,

    /// Word timing extraction settings.
    pub transcription: TranscriptionSettings,

    /// Batch scheduling.
    pub batch: BatchConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

/// Caption text styling: one font, one size, one fill and one outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// TrueType/OpenType font file.
    pub font_path: PathBuf,

    /// Font size in pixels.
    pub font_size: f32,

    /// Foreground color (RGBA).
    pub fill_rgba: [u8; 4],

    /// Outline color (RGBA).
    pub outline_rgba: [u8; 4],

    /// Outline radius in pixels.
    pub outline_thickness: u32,
}

/// Output container/codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    #[serde(rename = "mp4-h264")]
    Mp4H264,
    #[serde(rename = "mp4-h265")]
    Mp4H265,
    #[serde(rename = "webm")]
    Webm,
}

impl ExportFormat {
    /// File extension for the container.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Mp4H264 | ExportFormat::Mp4H265 => "mp4",
            ExportFormat::Webm => "webm",
        }
    }

    /// Parse the CLI/config spelling (`mp4-h264`, `mp4-h265`, `webm`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mp4-h264" | "mp4" | "h264" => Some(ExportFormat::Mp4H264),
            "mp4-h265" | "h265" | "hevc" => Some(ExportFormat::Mp4H265),
            "webm" | "vp9" => Some(ExportFormat::Webm),
            _ => None,
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Output format.
    pub format: ExportFormat,

    /// Output frame rate.
    pub fps: u32,

    /// Encoder thread count (0 = let ffmpeg decide).
    pub threads: u32,

    /// Video bitrate in kbps (0 = codec default quality).
    pub video_bitrate_kbps: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,
}

/// Speech synthesis backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisEngine {
    /// `gtts-cli` (Google Translate TTS).
    Gtts,
    /// `espeak-ng`, fully offline.
    Espeak,
}

/// Narration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Language code passed to the synthesizer (e.g. "en").
    pub language: String,

    /// Which synthesizer to run.
    pub engine: SynthesisEngine,
}

/// Word timing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionEngine {
    /// The `whisper` CLI with word timestamps.
    Whisper,
    /// No transcription; always use uniform timing.
    None,
}

/// Transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub engine: TranscriptionEngine,

    /// Whisper model name (tiny, base, small, medium, large).
    pub model: String,
}

/// Batch scheduling.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Concurrent entries (0 = one per available CPU core).
    pub jobs: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "wordcast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from(
                "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
            ),
            font_size: 80.0,
            fill_rgba: [255, 255, 255, 255],
            outline_rgba: [0, 0, 0, 255],
            outline_thickness: 4,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Mp4H264,
            fps: 24,
            threads: 4,
            video_bitrate_kbps: 0,
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            engine: SynthesisEngine::Gtts,
        }
    }
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            engine: TranscriptionEngine::Whisper,
            model: "base".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl BatchConfig {
    /// Worker count with `0` resolved to the number of available cores.
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("wordcast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_vertical_short() {
        let config = AppConfig::default();
        assert_eq!(config.canvas.width, 1080);
        assert_eq!(config.canvas.height, 1920);
        assert_eq!(config.style.font_size, 80.0);
        assert_eq!(config.style.outline_thickness, 4);
        assert_eq!(config.export.fps, 24);
        assert_eq!(config.export.format.extension(), "mp4");
        assert_eq!(config.narration.language, "en");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"narration":{"language":"es"},"export":{"fps":30}}"#)
                .unwrap();
        assert_eq!(config.narration.language, "es");
        assert_eq!(config.narration.engine, SynthesisEngine::Gtts);
        assert_eq!(config.export.fps, 30);
        assert_eq!(config.export.threads, 4);
        assert_eq!(config.canvas, CanvasConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.style.font_size = 64.0;
        config.transcription.engine = TranscriptionEngine::None;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.style.font_size, 64.0);
        assert_eq!(loaded.transcription.engine, TranscriptionEngine::None);
    }

    #[test]
    fn test_unparseable_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.canvas, CanvasConfig::default());
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!(ExportFormat::parse("MP4-H264"), Some(ExportFormat::Mp4H264));
        assert_eq!(ExportFormat::parse("webm"), Some(ExportFormat::Webm));
        assert_eq!(ExportFormat::parse("gif"), None);
    }

    #[test]
    fn test_effective_jobs_never_zero() {
        assert!(BatchConfig { jobs: 0 }.effective_jobs() >= 1);
        assert_eq!(BatchConfig { jobs: 3 }.effective_jobs(), 3);
    }
}
