//! Wordcast Audio
//!
//! The external audio collaborators of a narrated video:
//! - **Synthesis:** Narration text to an audio file (`gtts-cli`, `espeak-ng`)
//! - **Transcription:** Word-level timestamps from the narration (`whisper`)
//! - **Probing:** Audio duration via `ffprobe`
//! - **Silence:** A fixed-length silent track for entries with nothing to say

pub mod probe;
pub mod silence;
pub mod synthesis;
pub mod transcription;

pub use probe::audio_duration;
pub use silence::{write_silence, SILENT_NARRATION_SECS};
pub use synthesis::*;
pub use transcription::*;
