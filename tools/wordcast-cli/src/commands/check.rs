//! Check external tools and fonts.

use wordcast_audio_ai::{synthesizer_for, transcriber_for};
use wordcast_common::config::AppConfig;
use wordcast_common::process::command_exists;
use wordcast_render_engine::{CaptionFont, FfmpegBackend, RenderBackend};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Wordcast System Check");
    println!("{}", "=".repeat(50));

    let mut required_ok = true;

    let backend = FfmpegBackend::new();
    if backend.is_available() {
        println!("[OK] Encoder: {}", backend.name());
    } else {
        println!("[MISSING] Encoder: ffmpeg not found on PATH");
        required_ok = false;
    }

    if command_exists("ffprobe") {
        println!("[OK] Duration probe: ffprobe");
    } else {
        println!("[MISSING] Duration probe: ffprobe not found on PATH");
        required_ok = false;
    }

    let synthesizer = synthesizer_for(&config.narration);
    if synthesizer.is_available() {
        println!(
            "[OK] Speech synthesis: {} (language: {})",
            synthesizer.name(),
            config.narration.language
        );
    } else {
        println!("[MISSING] Speech synthesis: {} not found", synthesizer.name());
        required_ok = false;
    }

    let transcriber = transcriber_for(&config.transcription);
    if transcriber.is_available() {
        println!("[OK] Word timing: {}", transcriber.name());
    } else {
        println!(
            "[WARN] Word timing: {} unavailable, captions use uniform timing",
            transcriber.name()
        );
    }

    let font = CaptionFont::resolve(&config.style.font_path);
    if font.is_builtin() {
        println!(
            "[WARN] Font: {} not found, using {}",
            config.style.font_path.display(),
            font.describe()
        );
    } else {
        println!("[OK] Font: {}", font.describe());
    }

    println!();
    if required_ok {
        println!("All required tools are available. Wordcast is ready.");
    } else {
        println!("Some required tools are missing. See above.");
    }

    Ok(())
}
