//! Error types shared across Wordcast crates.

use std::path::PathBuf;

/// Top-level error type for Wordcast operations.
#[derive(Debug, thiserror::Error)]
pub enum WordcastError {
    #[error("No image found for id '{id}'")]
    AssetMissing { id: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Records error: {message}")]
    Records { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using WordcastError.
pub type WordcastResult<T> = Result<T, WordcastError>;

/// Coarse classification of a [`WordcastError`], used for per-entry reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AssetMissing,
    Synthesis,
    Transcription,
    Decode,
    Export,
    Render,
    Records,
    Config,
    Cancelled,
    Io,
    Other,
}

impl WordcastError {
    pub fn asset_missing(id: impl Into<String>) -> Self {
        Self::AssetMissing { id: id.into() }
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis {
            message: msg.into(),
        }
    }

    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn records(msg: impl Into<String>) -> Self {
        Self::Records {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AssetMissing { .. } => ErrorKind::AssetMissing,
            Self::Synthesis { .. } => ErrorKind::Synthesis,
            Self::Transcription { .. } => ErrorKind::Transcription,
            Self::Decode { .. } | Self::Image(_) => ErrorKind::Decode,
            Self::Export { .. } => ErrorKind::Export,
            Self::Render { .. } => ErrorKind::Render,
            Self::Records { .. } | Self::Json(_) => ErrorKind::Records,
            Self::Config { .. } => ErrorKind::Config,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) | Self::FileNotFound { .. } => ErrorKind::Io,
            Self::Unsupported { .. } | Self::Other(_) => ErrorKind::Other,
        }
    }
}
