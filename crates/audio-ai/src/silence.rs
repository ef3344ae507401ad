//! Silent narration.
//!
//! An entry with blank text still becomes a video: the background alone over
//! a short silent track. No engine is involved, so this works without any
//! synthesis tool installed.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use wordcast_common::error::{WordcastError, WordcastResult};

use crate::synthesis::SynthesizedAudio;

/// Length of the track written for blank narration.
pub const SILENT_NARRATION_SECS: f64 = 1.0;

const SAMPLE_RATE: u32 = 22_050;

/// Write `duration_secs` of mono silence to `out_dir/narration.wav`.
pub fn write_silence(out_dir: &Path, duration_secs: f64) -> WordcastResult<SynthesizedAudio> {
    if !(duration_secs.is_finite() && duration_secs > 0.0) {
        return Err(WordcastError::synthesis(format!(
            "Silent track needs a positive duration, got {duration_secs}"
        )));
    }

    let path = out_dir.join("narration.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let samples = (duration_secs * SAMPLE_RATE as f64).round() as u64;

    let file = File::create(&path)?;
    let mut writer = hound::WavWriter::new(BufWriter::new(file), spec)
        .map_err(|e| WordcastError::synthesis(format!("Cannot start silent track: {e}")))?;
    for _ in 0..samples {
        writer
            .write_sample(0i16)
            .map_err(|e| WordcastError::synthesis(format!("Cannot write silent track: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| WordcastError::synthesis(format!("Cannot finish silent track: {e}")))?;

    tracing::debug!(path = %path.display(), duration_secs, "Wrote silent narration");

    Ok(SynthesizedAudio {
        path,
        duration_secs: samples as f64 / SAMPLE_RATE as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_has_requested_length_and_only_zero_samples() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_silence(dir.path(), SILENT_NARRATION_SECS).unwrap();

        assert_eq!(audio.path, dir.path().join("narration.wav"));
        assert_eq!(audio.duration_secs, 1.0);

        let mut reader = hound::WavReader::open(&audio.path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22_050);
        assert_eq!(reader.duration(), 22_050);
        assert!(reader.samples::<i16>().all(|s| s.unwrap() == 0));
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for bad in [0.0, -1.0, f64::NAN] {
            let err = write_silence(dir.path(), bad).unwrap_err();
            assert!(matches!(err, WordcastError::Synthesis { .. }), "{bad}");
        }
        assert!(!dir.path().join("narration.wav").exists());
    }
}
