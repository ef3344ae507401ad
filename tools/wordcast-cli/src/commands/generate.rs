//! Render every record into a video.

use std::path::PathBuf;
use std::sync::Arc;

use wordcast_audio_ai::{synthesizer_for, transcriber_for};
use wordcast_common::config::AppConfig;
use wordcast_pipeline::report::RecordFailure;
use wordcast_pipeline::{BatchRunner, CancelFlag, Collaborators, EntryPipeline, PipelineConfig};
use wordcast_project_model::entry::RecordSet;
use wordcast_render_engine::{CaptionFont, FfmpegBackend};

pub async fn run(
    config: AppConfig,
    json_folder: PathBuf,
    image_folder: PathBuf,
    output_folder: PathBuf,
    report_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let records = RecordSet::load(&json_folder)
        .map_err(|e| anyhow::anyhow!("Failed to load records: {e}"))?;
    let entries: Vec<_> = records.entries().cloned().collect();

    println!(
        "Loaded {} entries from {} file(s) in {}",
        entries.len(),
        records.files.len(),
        json_folder.display()
    );
    for (path, reason) in &records.failures {
        println!("  [WARN] {}: {reason}", path.display());
    }

    std::fs::create_dir_all(&output_folder)?;

    let font = Arc::new(CaptionFont::resolve(&config.style.font_path));
    let collaborators = Collaborators {
        synthesizer: synthesizer_for(&config.narration),
        transcriber: transcriber_for(&config.transcription),
        backend: Arc::new(FfmpegBackend::new()),
    };
    let cancel = CancelFlag::new();

    let pipeline = EntryPipeline::new(
        PipelineConfig::from_app_config(&config, image_folder, output_folder),
        font,
        collaborators,
        cancel.clone(),
    );
    let runner = BatchRunner::new(Arc::new(pipeline), config.batch.effective_jobs());

    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nCancelling: entries in flight stop at their next step...");
            cancel.cancel();
        }
    });

    let mut report = runner.run(entries).await;
    watcher.abort();

    report.record_failures = records
        .failures
        .into_iter()
        .map(|(path, message)| RecordFailure { path, message })
        .collect();

    for entry in &report.entries {
        let status = match entry.outcome.state() {
            wordcast_pipeline::EntryState::Done => "done",
            wordcast_pipeline::EntryState::Skipped => "skipped",
            _ => "FAILED",
        };
        match &entry.outcome {
            wordcast_pipeline::EntryOutcome::Failed { message, .. } => {
                println!("  [{status}] {}: {message}", entry.name);
            }
            _ => println!("  [{status}] {}", entry.name),
        }
    }
    println!("\n{}", report.summary_line());

    if let Some(path) = report_path {
        report
            .write_json(&path)
            .map_err(|e| anyhow::anyhow!("Failed to write report: {e}"))?;
        println!("Report written to {}", path.display());
    }

    if report.failed() > 0 {
        anyhow::bail!("{} of {} entries failed", report.failed(), report.entries.len());
    }
    Ok(())
}
