//! Export configuration and job management.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::RgbaImage;
use wordcast_common::config::{ExportFormat, ExportSettings};
use wordcast_common::error::{WordcastError, WordcastResult};
use wordcast_common::process::{command_exists, stderr_tail};

use crate::compositor::Composition;

/// An export job ready to be rendered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Output file path.
    pub output_path: PathBuf,

    /// Encoder settings.
    pub settings: ExportSettings,
}

impl ExportJob {
    pub fn new(output_path: impl Into<PathBuf>, settings: ExportSettings) -> Self {
        Self {
            output_path: output_path.into(),
            settings,
        }
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames encoded so far.
    pub frames_rendered: u64,

    /// Total frames to encode.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Trait for render backends.
pub trait RenderBackend: Send + Sync {
    /// Encode `composition` into `job.output_path`.
    fn render(
        &self,
        composition: &Composition,
        job: &ExportJob,
        progress: Option<ProgressCallback>,
    ) -> WordcastResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// `<dir>/<stem>.partial.<ext>` next to `output`.
pub fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    output.with_file_name(name)
}

/// Export the composition to a video file.
///
/// The backend writes to a `.partial` sibling which is renamed into place
/// only after a successful encode, so a failed or interrupted export never
/// leaves a file at `job.output_path`.
pub fn export_composition(
    backend: &dyn RenderBackend,
    composition: &Composition,
    job: &ExportJob,
    progress: Option<ProgressCallback>,
) -> WordcastResult<PathBuf> {
    tracing::info!(
        output = %job.output_path.display(),
        format = ?job.settings.format,
        backend = backend.name(),
        "Starting export"
    );

    if let Some(parent) = job.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !backend.is_available() {
        return Err(WordcastError::export(format!(
            "Render backend '{}' is not available",
            backend.name()
        )));
    }

    let partial = partial_path(&job.output_path);
    if partial.exists() {
        tracing::debug!(path = %partial.display(), "Removing stale partial export");
        std::fs::remove_file(&partial)?;
    }

    let partial_job = ExportJob {
        output_path: partial.clone(),
        settings: job.settings.clone(),
    };

    let started = std::time::Instant::now();
    if let Err(e) = backend.render(composition, &partial_job, progress) {
        if partial.exists() {
            if let Err(rm) = std::fs::remove_file(&partial) {
                tracing::warn!(path = %partial.display(), error = %rm, "Failed to remove partial export");
            }
        }
        return Err(e);
    }

    if !partial.is_file() {
        return Err(WordcastError::export(format!(
            "{} reported success but wrote no file",
            backend.name()
        )));
    }
    std::fs::rename(&partial, &job.output_path)?;

    tracing::info!(
        output = %job.output_path.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Export finished"
    );
    Ok(job.output_path.clone())
}

/// Encodes by piping raw RGBA frames into the system `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    binary: String,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters from [`write_frames`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frames written to the sink.
    pub frames: u64,
    /// Frames that had to be repainted because the visible overlays changed.
    pub repainted: u64,
}

/// Stream every frame of `composition` as raw RGBA into `sink`.
///
/// Frame `i` shows time `i / fps`. A frame is only repainted when the set of
/// visible overlays differs from the previous frame's.
pub fn write_frames(
    composition: &Composition,
    fps: u32,
    sink: &mut dyn Write,
) -> std::io::Result<FrameStats> {
    let total = composition.frame_count(fps);
    let mut frame = RgbaImage::new(composition.canvas.width, composition.canvas.height);
    let mut shown: Option<Vec<usize>> = None;
    let mut stats = FrameStats::default();

    for i in 0..total {
        let t = i as f64 / fps as f64;
        let active: Vec<usize> = composition.active_overlays(t).map(|(idx, _)| idx).collect();
        if shown.as_ref() != Some(&active) {
            composition.rasterize_frame(t, &mut frame);
            shown = Some(active);
            stats.repainted += 1;
        }
        sink.write_all(frame.as_raw())?;
        stats.frames += 1;
    }

    Ok(stats)
}

/// Full ffmpeg argument list for encoding `composition` into `job.output_path`.
pub fn ffmpeg_args(composition: &Composition, job: &ExportJob) -> Vec<String> {
    let settings = &job.settings;
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostats".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", composition.canvas.width, composition.canvas.height),
        "-r".into(),
        settings.fps.to_string(),
        "-i".into(),
        "pipe:0".into(),
        "-i".into(),
        composition.audio.path.to_string_lossy().into_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
    ];
    args.extend(codec_args_for_settings(settings));
    if settings.threads > 0 {
        args.push("-threads".into());
        args.push(settings.threads.to_string());
    }
    args.push("-r".into());
    args.push(settings.fps.to_string());
    args.push("-t".into());
    args.push(format!("{:.3}", composition.total_duration_secs));
    args.push(job.output_path.to_string_lossy().into_owned());
    args
}

impl FfmpegBackend {
    fn validate(&self, composition: &Composition, job: &ExportJob) -> WordcastResult<()> {
        if job.settings.fps == 0 {
            return Err(WordcastError::export("fps must be non-zero"));
        }
        let canvas = composition.canvas;
        if job.settings.format != ExportFormat::Webm
            && (canvas.width % 2 != 0 || canvas.height % 2 != 0)
        {
            return Err(WordcastError::export(format!(
                "canvas {}x{} must have even sides for yuv420p output",
                canvas.width, canvas.height
            )));
        }
        if !composition.audio.path.is_file() {
            return Err(WordcastError::export(format!(
                "audio track {} does not exist",
                composition.audio.path.display()
            )));
        }
        Ok(())
    }
}

impl RenderBackend for FfmpegBackend {
    fn render(
        &self,
        composition: &Composition,
        job: &ExportJob,
        progress: Option<ProgressCallback>,
    ) -> WordcastResult<()> {
        self.validate(composition, job)?;

        let fps = job.settings.fps;
        let total_frames = composition.frame_count(fps);
        let expected_duration_secs = composition.total_duration_secs;
        let args = ffmpeg_args(composition, job);

        if let Some(cb) = &progress {
            cb(ExportProgress {
                progress: 0.0,
                frames_rendered: 0,
                total_frames,
                eta_secs: 0.0,
                stage: ExportStage::Preparing,
            });
        }

        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WordcastError::export(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            total_frames,
            overlays = composition.overlays.len(),
            "ffmpeg process started"
        );

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WordcastError::export("Failed to open ffmpeg stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WordcastError::export("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| WordcastError::export("Failed to capture ffmpeg stderr"))?;

        // Drain stderr on its own thread while frames are written.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let start = std::time::Instant::now();
        let progress_task = std::thread::spawn(move || -> Option<ProgressCallback> {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            let mut latest = ProgressState::default();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let Some((key, value)) = line.trim().split_once('=') else {
                    continue;
                };
                latest.update(key, value);
                if key == "progress" {
                    if let Some(cb) = &progress {
                        cb(progress_report(
                            &latest,
                            total_frames,
                            expected_duration_secs,
                            start.elapsed().as_secs_f64(),
                        ));
                    }
                }
            }
            progress
        });

        let written = write_frames(composition, fps, &mut stdin);
        drop(stdin);

        let status = child
            .wait()
            .map_err(|e| WordcastError::export(format!("Failed to wait on ffmpeg: {e}")))?;
        let progress = progress_task.join().unwrap_or(None);
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            if let Some(cb) = &progress {
                cb(ExportProgress {
                    progress: 0.0,
                    frames_rendered: 0,
                    total_frames,
                    eta_secs: 0.0,
                    stage: ExportStage::Failed,
                });
            }
            return Err(WordcastError::export(format!(
                "ffmpeg export failed (status {status}): {}",
                stderr_tail(stderr_output.as_bytes(), 10)
            )));
        }

        let stats = written
            .map_err(|e| WordcastError::export(format!("Failed writing frames to ffmpeg: {e}")))?;
        tracing::debug!(
            frames = stats.frames,
            repainted = stats.repainted,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Frames streamed"
        );

        if let Some(cb) = &progress {
            cb(ExportProgress {
                progress: 1.0,
                frames_rendered: total_frames,
                total_frames,
                eta_secs: 0.0,
                stage: ExportStage::Complete,
            });
        }

        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn codec_args_for_settings(settings: &ExportSettings) -> Vec<String> {
    let audio_bitrate = format!("{}k", settings.audio_bitrate_kbps.max(64));
    let video_rate: Vec<String> = if settings.video_bitrate_kbps > 0 {
        vec!["-b:v".into(), format!("{}k", settings.video_bitrate_kbps)]
    } else {
        match settings.format {
            ExportFormat::Mp4H264 => vec!["-crf".into(), "23".into()],
            ExportFormat::Mp4H265 => vec!["-crf".into(), "28".into()],
            ExportFormat::Webm => {
                vec!["-crf".into(), "32".into(), "-b:v".into(), "0".into()]
            }
        }
    };

    let mut args: Vec<String> = match settings.format {
        ExportFormat::Mp4H264 => vec![
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "medium".into(),
            "-profile:v".into(),
            "high".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ],
        ExportFormat::Mp4H265 => vec![
            "-c:v".into(),
            "libx265".into(),
            "-preset".into(),
            "medium".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ],
        ExportFormat::Webm => vec![
            "-c:v".into(),
            "libvpx-vp9".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ],
    };
    args.extend(video_rate);

    match settings.format {
        ExportFormat::Mp4H264 | ExportFormat::Mp4H265 => args.extend([
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            audio_bitrate,
            "-movflags".into(),
            "+faststart".into(),
        ]),
        ExportFormat::Webm => args.extend([
            "-c:a".into(),
            "libopus".into(),
            "-b:a".into(),
            audio_bitrate,
        ]),
    }
    args
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    total_frames: u64,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> ExportProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let frames_rendered = (progress * total_frames as f64).round() as u64;
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress: if state.complete { 1.0 } else { progress },
        frames_rendered,
        total_frames,
        eta_secs,
        stage: if state.complete {
            ExportStage::Finalizing
        } else {
            ExportStage::Rendering
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{compose, AudioTrack};
    use crate::font::CaptionFont;
    use crate::glyph::{render_word, GlyphStyle};
    use image::{DynamicImage, Rgba};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use wordcast_project_model::canvas::Canvas;
    use wordcast_project_model::timing::WordTiming;

    fn composition(timings: &[WordTiming], duration: f64) -> Composition {
        let canvas = Canvas::new(40, 60);
        let style = GlyphStyle {
            canvas,
            font_size: 8.0,
            fill: Rgba([255, 255, 255, 255]),
            outline: Rgba([0, 0, 0, 255]),
            outline_thickness: 1,
        };
        let rasters = timings
            .iter()
            .map(|t| render_word(&t.word, &CaptionFont::Bitmap, &style))
            .collect();
        let bg = DynamicImage::ImageRgba8(RgbaImage::from_pixel(80, 60, Rgba([9, 9, 9, 255])));
        let audio = AudioTrack {
            path: PathBuf::from("/tmp/narration.mp3"),
            duration_secs: duration,
        };
        compose(&bg, canvas, audio, timings, rasters).unwrap()
    }

    struct FakeBackend {
        fail: bool,
        available: bool,
        called: AtomicBool,
        seen_output: Mutex<Option<PathBuf>>,
    }

    impl FakeBackend {
        fn new(fail: bool, available: bool) -> Self {
            Self {
                fail,
                available,
                called: AtomicBool::new(false),
                seen_output: Mutex::new(None),
            }
        }
    }

    impl RenderBackend for FakeBackend {
        fn render(
            &self,
            _composition: &Composition,
            job: &ExportJob,
            _progress: Option<ProgressCallback>,
        ) -> WordcastResult<()> {
            self.called.store(true, Ordering::SeqCst);
            *self.seen_output.lock().unwrap() = Some(job.output_path.clone());
            std::fs::write(&job.output_path, b"video")?;
            if self.fail {
                return Err(WordcastError::export("encoder exploded"));
            }
            Ok(())
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/out/Ada.mp4")),
            PathBuf::from("/out/Ada.partial.mp4")
        );
        assert_eq!(
            partial_path(Path::new("out/St__Jude.webm")),
            PathBuf::from("out/St__Jude.partial.webm")
        );
    }

    #[test]
    fn test_export_renames_partial_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("videos").join("Ada.mp4");
        let backend = FakeBackend::new(false, true);
        let job = ExportJob::new(&output, ExportSettings::default());

        let written = export_composition(&backend, &composition(&[], 1.0), &job, None).unwrap();
        assert_eq!(written, output);
        assert!(output.is_file());
        assert!(!partial_path(&output).exists());
        assert_eq!(
            backend.seen_output.lock().unwrap().as_deref(),
            Some(partial_path(&output).as_path())
        );
    }

    #[test]
    fn test_failed_export_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Ada.mp4");
        let backend = FakeBackend::new(true, true);
        let job = ExportJob::new(&output, ExportSettings::default());

        let err = export_composition(&backend, &composition(&[], 1.0), &job, None).unwrap_err();
        assert!(matches!(err, WordcastError::Export { .. }));
        assert!(!output.exists());
        assert!(!partial_path(&output).exists());
    }

    #[test]
    fn test_unavailable_backend_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(false, false);
        let job = ExportJob::new(dir.path().join("Ada.mp4"), ExportSettings::default());

        let err = export_composition(&backend, &composition(&[], 1.0), &job, None).unwrap_err();
        assert!(matches!(err, WordcastError::Export { .. }));
        assert!(!backend.called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_write_frames_repaints_only_on_change() {
        let timings = vec![
            WordTiming::new("a", 0.0, 0.5),
            WordTiming::new("b", 0.5, 1.0),
        ];
        let comp = composition(&timings, 1.0);
        let mut sink = Vec::new();
        let stats = write_frames(&comp, 10, &mut sink).unwrap();

        assert_eq!(stats.frames, 10);
        assert_eq!(stats.repainted, 2);
        assert_eq!(sink.len(), 10 * comp.canvas.rgba_len());
    }

    #[test]
    fn test_write_frames_gap_repaints_background() {
        let timings = vec![WordTiming::new("a", 0.2, 0.4)];
        let comp = composition(&timings, 1.0);
        let mut sink = Vec::new();
        let stats = write_frames(&comp, 10, &mut sink).unwrap();

        // background, caption, background again
        assert_eq!(stats.repainted, 3);
        let frame_len = comp.canvas.rgba_len();
        assert_eq!(&sink[..frame_len], comp.background.image.as_raw().as_slice());
        assert_eq!(&sink[9 * frame_len..], comp.background.image.as_raw().as_slice());
    }

    #[test]
    fn test_ffmpeg_args_bind_audio_and_duration() {
        let comp = composition(&[], 2.5);
        let job = ExportJob::new("/out/Ada.partial.mp4", ExportSettings::default());
        let args = ffmpeg_args(&comp, &job);

        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 40x60 -r 24 -i pipe:0"));
        assert!(joined.contains("-i /tmp/narration.mp3"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-threads 4"));
        assert!(joined.contains("-t 2.500"));
        assert_eq!(args.last().map(String::as_str), Some("/out/Ada.partial.mp4"));
    }

    #[test]
    fn test_codec_args_per_format() {
        let mut settings = ExportSettings::default();
        let h264 = codec_args_for_settings(&settings).join(" ");
        assert!(h264.contains("libx264") && h264.contains("-crf 23") && h264.contains("aac"));

        settings.format = ExportFormat::Mp4H265;
        settings.video_bitrate_kbps = 4000;
        let h265 = codec_args_for_settings(&settings).join(" ");
        assert!(h265.contains("libx265") && h265.contains("-b:v 4000k"));

        settings.format = ExportFormat::Webm;
        let webm = codec_args_for_settings(&settings).join(" ");
        assert!(webm.contains("libvpx-vp9") && webm.contains("libopus"));
        assert!(!webm.contains("faststart"));
    }

    #[test]
    fn test_ffmpeg_backend_validates_before_spawning() {
        let comp = composition(&[], 1.0);
        let backend = FfmpegBackend::new();
        let job = ExportJob::new("/nonexistent/out.mp4", ExportSettings::default());
        // The audio track of the test composition does not exist.
        let err = backend.render(&comp, &job, None).unwrap_err();
        assert!(err.to_string().contains("audio track"));

        let mut settings = ExportSettings::default();
        settings.fps = 0;
        let err = backend
            .render(&comp, &ExportJob::new("/nonexistent/out.mp4", settings), None)
            .unwrap_err();
        assert!(err.to_string().contains("fps"));
    }

    #[test]
    fn test_progress_report() {
        let state = ProgressState {
            out_time_secs: 1.0,
            complete: false,
        };
        let report = progress_report(&state, 48, 2.0, 3.0);
        assert!((report.progress - 0.5).abs() < 1e-9);
        assert_eq!(report.frames_rendered, 24);
        assert!((report.eta_secs - 3.0).abs() < 1e-9);
        assert_eq!(report.stage, ExportStage::Rendering);

        let mut state = ProgressState::default();
        state.update("out_time_us", "2000000");
        state.update("progress", "end");
        let report = progress_report(&state, 48, 2.0, 3.0);
        assert_eq!(report.progress, 1.0);
        assert_eq!(report.stage, ExportStage::Finalizing);
    }

    #[test]
    fn test_progress_callback_is_shareable() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p.stage));
        cb(progress_report(&ProgressState::default(), 1, 1.0, 0.0));
        assert_eq!(*seen.lock().unwrap(), vec![ExportStage::Rendering]);
    }
}
