//! One entry from record to video.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use wordcast_audio_ai::silence::{write_silence, SILENT_NARRATION_SECS};
use wordcast_audio_ai::synthesis::SpeechSynthesizer;
use wordcast_audio_ai::transcription::{Transcriber, TranscriptionOutcome};
use wordcast_common::config::{AppConfig, ExportSettings};
use wordcast_common::error::{WordcastError, WordcastResult};
use wordcast_processing_core::timing::resolve_timings;
use wordcast_project_model::canvas::Canvas;
use wordcast_project_model::entry::Entry;
use wordcast_render_engine::compositor::{compose, decode_background, AudioTrack};
use wordcast_render_engine::export::{
    export_composition, ExportJob, ExportProgress, ExportStage, ProgressCallback, RenderBackend,
};
use wordcast_render_engine::font::CaptionFont;
use wordcast_render_engine::glyph::{render_word, GlyphRaster, GlyphStyle};

use crate::report::EntryReport;
use crate::state::{CancelFlag, EntryOutcome, EntryState, SkipReason};

/// Settings shared by every entry of a batch.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Folder holding `<image_id>.<ext>` background images.
    pub image_dir: PathBuf,
    /// Folder receiving finished videos.
    pub output_dir: PathBuf,
    /// Narration language code.
    pub language: String,
    pub style: GlyphStyle,
    pub export: ExportSettings,
    /// Parent of per-entry scratch directories (system temp dir if `None`).
    pub scratch_root: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_app_config(
        config: &AppConfig,
        image_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let canvas = Canvas::from(config.canvas);
        Self {
            image_dir: image_dir.into(),
            output_dir: output_dir.into(),
            language: config.narration.language.clone(),
            style: GlyphStyle::from_config(canvas, &config.style),
            export: config.export.clone(),
            scratch_root: None,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.style.canvas
    }

    /// Output file of `entry`.
    pub fn output_path(&self, entry: &Entry) -> PathBuf {
        entry.output_path(&self.output_dir, self.export.format.extension())
    }
}

/// External services an entry depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub backend: Arc<dyn RenderBackend>,
}

/// Runs single entries. Holds no per-entry state, so one instance serves
/// every worker of a batch.
pub struct EntryPipeline {
    config: PipelineConfig,
    font: Arc<CaptionFont>,
    collaborators: Collaborators,
    cancel: CancelFlag,
}

/// Mutable bookkeeping of one run.
struct Run<'a> {
    name: &'a str,
    state: EntryState,
    history: Vec<EntryState>,
    cancel: &'a CancelFlag,
    audio_duration_secs: Option<f64>,
    timing_source: Option<wordcast_processing_core::timing::TimingSource>,
    words: usize,
}

impl<'a> Run<'a> {
    fn new(name: &'a str, cancel: &'a CancelFlag) -> Self {
        Self {
            name,
            state: EntryState::Pending,
            history: vec![EntryState::Pending],
            cancel,
            audio_duration_secs: None,
            timing_source: None,
            words: 0,
        }
    }

    /// Move to `next`, honoring cancellation.
    fn advance(&mut self, next: EntryState) -> WordcastResult<()> {
        if self.cancel.is_cancelled() {
            return Err(WordcastError::Cancelled);
        }
        self.enter(next)
    }

    fn enter(&mut self, next: EntryState) -> WordcastResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(WordcastError::unsupported(format!(
                "invalid entry transition {:?} -> {:?}",
                self.state, next
            )));
        }
        tracing::debug!(entry = %self.name, from = ?self.state, to = ?next, "Entry transition");
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}

impl EntryPipeline {
    pub fn new(
        config: PipelineConfig,
        font: Arc<CaptionFont>,
        collaborators: Collaborators,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            config,
            font,
            collaborators,
            cancel,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Drive `entry` to a terminal state. Never panics on entry errors and
    /// never affects other entries.
    pub fn run(&self, entry: &Entry) -> EntryReport {
        let started = Instant::now();
        let output = self.config.output_path(entry);
        let mut run = Run::new(&entry.name, &self.cancel);

        let outcome = match self.drive(&mut run, entry, &output) {
            Ok(outcome) => outcome,
            Err(e) => {
                let kind = e.kind();
                match &e {
                    WordcastError::Cancelled => {
                        tracing::info!(entry = %entry.name, state = ?run.state, "Entry cancelled");
                    }
                    WordcastError::AssetMissing { .. } => {
                        tracing::warn!(entry = %entry.name, error = %e, "Skipping entry without image");
                    }
                    _ => {
                        tracing::error!(entry = %entry.name, state = ?run.state, error = %e, "Entry failed");
                    }
                }
                run.state = EntryState::Failed;
                run.history.push(EntryState::Failed);
                EntryOutcome::Failed {
                    kind,
                    message: e.to_string(),
                }
            }
        };

        EntryReport {
            name: entry.name.clone(),
            output,
            outcome,
            states: run.history,
            audio_duration_secs: run.audio_duration_secs,
            timing_source: run.timing_source,
            words: run.words,
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }

    fn drive(&self, run: &mut Run<'_>, entry: &Entry, output: &Path) -> WordcastResult<EntryOutcome> {
        if self.cancel.is_cancelled() {
            return Err(WordcastError::Cancelled);
        }

        if output.exists() {
            tracing::info!(entry = %entry.name, output = %output.display(), "Output exists, skipping");
            run.enter(EntryState::Skipped)?;
            return Ok(EntryOutcome::Skipped {
                reason: SkipReason::AlreadyExists,
            });
        }

        let image_path = entry
            .resolve_image(&self.config.image_dir)
            .ok_or_else(|| WordcastError::asset_missing(&entry.image_id))?;

        tracing::info!(entry = %entry.name, image = %image_path.display(), "Processing entry");
        self.produce(run, entry, &image_path, output)?;
        run.enter(EntryState::Done)?;

        tracing::info!(entry = %entry.name, output = %output.display(), "Entry done");
        Ok(EntryOutcome::Done {
            output: output.to_path_buf(),
        })
    }

    fn produce(
        &self,
        run: &mut Run<'_>,
        entry: &Entry,
        image_path: &Path,
        output: &Path,
    ) -> WordcastResult<()> {
        run.advance(EntryState::ResolvingAudio)?;
        // Dropped on every exit path, removing the audio and transcripts.
        let scratch = self.scratch_dir()?;
        let silent = entry.text.trim().is_empty();
        let audio = if silent {
            tracing::info!(entry = %entry.name, "Blank narration, using a silent track");
            write_silence(scratch.path(), SILENT_NARRATION_SECS)?
        } else {
            self.collaborators.synthesizer.synthesize(
                &entry.text,
                &self.config.language,
                scratch.path(),
            )?
        };
        run.audio_duration_secs = Some(audio.duration_secs);

        run.advance(EntryState::Timing)?;
        let raw_words = if silent {
            Vec::new()
        } else {
            let transcription = self
                .collaborators
                .transcriber
                .transcribe(&audio.path, &self.config.language);
            if let TranscriptionOutcome::Unavailable { reason } = &transcription {
                tracing::info!(entry = %entry.name, reason = %reason, "No word timestamps, using uniform timing");
            }
            transcription.into_words()
        };
        let timings = resolve_timings(&raw_words, audio.duration_secs, &entry.text);
        run.timing_source = Some(timings.source);
        run.words = timings.len();

        run.advance(EntryState::RenderingOverlays)?;
        let rasters: Vec<GlyphRaster> = timings
            .words
            .iter()
            .map(|w| render_word(&w.word, &self.font, &self.config.style))
            .collect();

        run.advance(EntryState::Composing)?;
        let background = decode_background(image_path)?;
        let composition = compose(
            &background,
            self.config.canvas(),
            AudioTrack {
                path: audio.path.clone(),
                duration_secs: audio.duration_secs,
            },
            &timings.words,
            rasters,
        )?;

        run.advance(EntryState::Exporting)?;
        let job = ExportJob::new(output, self.config.export.clone());
        export_composition(
            self.collaborators.backend.as_ref(),
            &composition,
            &job,
            Some(progress_logger(&entry.name)),
        )?;

        drop(scratch);
        Ok(())
    }

    fn scratch_dir(&self) -> WordcastResult<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("wordcast-");
        let dir = match &self.config.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

fn progress_logger(name: &str) -> ProgressCallback {
    let name = name.to_string();
    Box::new(move |p: ExportProgress| match p.stage {
        ExportStage::Rendering => {
            tracing::debug!(
                entry = %name,
                progress = p.progress,
                frames = p.frames_rendered,
                total_frames = p.total_frames,
                eta_secs = p.eta_secs,
                "Export progress"
            );
        }
        ExportStage::Failed => {
            tracing::debug!(entry = %name, "Export failed");
        }
        _ => {}
    })
}
