//! Speech synthesis.
//!
//! Each engine is an external CLI that reads the narration from stdin and
//! writes one audio file into the caller's scratch directory. The duration of
//! that file is the authoritative length of the final video.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use serde::Serialize;
use wordcast_common::config::{NarrationConfig, SynthesisEngine};
use wordcast_common::error::{WordcastError, WordcastResult};
use wordcast_common::process::{command_exists, stderr_tail};

use crate::probe::audio_duration;

/// A narration file produced by a [`SpeechSynthesizer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedAudio {
    /// Audio file inside the scratch directory.
    pub path: PathBuf,
    /// Duration in seconds; always positive.
    pub duration_secs: f64,
}

/// Text-to-speech backend.
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` in `language`, writing the audio into `out_dir`.
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        out_dir: &Path,
    ) -> WordcastResult<SynthesizedAudio>;

    /// Check if this engine is available on the system.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}

/// Google Translate TTS through `gtts-cli`; produces MP3.
#[derive(Debug, Clone)]
pub struct GttsSynthesizer {
    binary: String,
}

impl GttsSynthesizer {
    pub fn new() -> Self {
        Self {
            binary: "gtts-cli".to_string(),
        }
    }
}

impl Default for GttsSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for GttsSynthesizer {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        out_dir: &Path,
    ) -> WordcastResult<SynthesizedAudio> {
        let path = out_dir.join("narration.mp3");
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--lang", language, "--output"])
            .arg(&path)
            .arg("-");
        run_engine(&self.binary, cmd, text, &path)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "gtts"
    }
}

/// Offline synthesis through `espeak-ng`; produces WAV.
#[derive(Debug, Clone)]
pub struct EspeakSynthesizer {
    binary: String,
}

impl EspeakSynthesizer {
    pub fn new() -> Self {
        Self {
            binary: "espeak-ng".to_string(),
        }
    }
}

impl Default for EspeakSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for EspeakSynthesizer {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        out_dir: &Path,
    ) -> WordcastResult<SynthesizedAudio> {
        let path = out_dir.join("narration.wav");
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-v", language, "-w"]).arg(&path).arg("--stdin");
        run_engine(&self.binary, cmd, text, &path)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "espeak"
    }
}

/// Build the synthesizer selected by `config.engine`.
pub fn synthesizer_for(config: &NarrationConfig) -> Arc<dyn SpeechSynthesizer> {
    match config.engine {
        SynthesisEngine::Gtts => Arc::new(GttsSynthesizer::new()),
        SynthesisEngine::Espeak => Arc::new(EspeakSynthesizer::new()),
    }
}

fn run_engine(
    binary: &str,
    mut cmd: Command,
    text: &str,
    output: &Path,
) -> WordcastResult<SynthesizedAudio> {
    if text.trim().is_empty() {
        return Err(WordcastError::synthesis("narration text is empty"));
    }

    tracing::debug!(engine = binary, output = %output.display(), chars = text.len(), "Synthesizing narration");
    let started = std::time::Instant::now();

    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| WordcastError::synthesis(format!("Failed to start {binary}: {e}")))?;

    {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WordcastError::synthesis(format!("Failed to open {binary} stdin")))?;
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| WordcastError::synthesis(format!("Failed writing to {binary}: {e}")))?;
    }

    let result = child
        .wait_with_output()
        .map_err(|e| WordcastError::synthesis(format!("Failed to wait on {binary}: {e}")))?;

    if !result.status.success() {
        return Err(WordcastError::synthesis(format!(
            "{binary} failed (status {}): {}",
            result.status,
            stderr_tail(&result.stderr, 5)
        )));
    }

    if !output.is_file() {
        return Err(WordcastError::synthesis(format!(
            "{binary} exited successfully but wrote no audio to {}",
            output.display()
        )));
    }

    let duration_secs = audio_duration(output)
        .map_err(|e| WordcastError::synthesis(format!("Cannot measure narration: {e}")))?;
    if duration_secs <= 0.0 {
        return Err(WordcastError::synthesis(format!(
            "{binary} produced empty audio ({duration_secs}s)"
        )));
    }

    tracing::info!(
        engine = binary,
        duration_secs,
        elapsed_ms = started.elapsed().as_millis(),
        "Narration synthesized"
    );

    Ok(SynthesizedAudio {
        path: output.to_path_buf(),
        duration_secs,
    })
}
