//! Audio duration probing with `ffprobe`.

use std::path::Path;
use std::process::Command;

use wordcast_common::error::{WordcastError, WordcastResult};
use wordcast_common::process::stderr_tail;

/// Container duration of the audio file at `path`, in seconds.
pub fn audio_duration(path: &Path) -> WordcastResult<f64> {
    if !path.exists() {
        return Err(WordcastError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .map_err(|e| WordcastError::decode(format!("Failed to start ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(WordcastError::decode(format!(
            "ffprobe failed on {} (status {}): {}",
            path.display(),
            output.status,
            stderr_tail(&output.stderr, 5)
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    parse_duration(&raw).ok_or_else(|| {
        WordcastError::decode(format!(
            "ffprobe reported no usable duration for {}: {:?}",
            path.display(),
            raw.trim()
        ))
    })
}

/// Parse the first line of `ffprobe` duration output.
///
/// Returns `None` for `N/A`, garbage, or a non-finite value.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let secs = line.parse::<f64>().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}
