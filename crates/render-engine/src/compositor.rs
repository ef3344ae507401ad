//! Timeline composition.
//!
//! A [`Composition`] is the ordered layer stack of one video: a full-length
//! background, one overlay per caption word in timing order, and the
//! narration audio. Its `total_duration_secs` is the audio duration and is
//! authoritative; overlays that run past it are cut at render time.

use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage, RgbaImage};
use wordcast_common::error::{WordcastError, WordcastResult};
use wordcast_processing_core::framing::cover_plan;
use wordcast_project_model::canvas::Canvas;
use wordcast_project_model::timing::WordTiming;

use crate::glyph::GlyphRaster;

/// The still image behind every frame, already canvas-sized and opaque.
#[derive(Debug, Clone)]
pub struct BackgroundLayer {
    pub image: RgbaImage,
    pub duration_secs: f64,
}

/// One caption word on the timeline.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    pub raster: GlyphRaster,
    pub start_secs: f64,
    /// `max(end - start, MIN_OVERLAY_SECS)`.
    pub duration_secs: f64,
}

impl OverlayLayer {
    pub fn from_timing(timing: &WordTiming, raster: GlyphRaster) -> Self {
        Self {
            raster,
            start_secs: timing.start,
            duration_secs: timing.overlay_duration(),
        }
    }

    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Whether this overlay is on screen at `t`.
    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start_secs && t < self.end_secs()
    }
}

/// The narration track bound to a composition.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Everything needed to encode one video.
#[derive(Debug, Clone)]
pub struct Composition {
    pub canvas: Canvas,
    pub background: BackgroundLayer,
    /// Caption overlays in timing order, stacked above the background.
    pub overlays: Vec<OverlayLayer>,
    pub audio: AudioTrack,
    pub total_duration_secs: f64,
}

impl Composition {
    /// Overlays visible at `t`, in stacking order. Nothing is visible at or
    /// after the total duration.
    pub fn active_overlays(&self, t: f64) -> impl Iterator<Item = (usize, &OverlayLayer)> {
        let in_range = t < self.total_duration_secs;
        self.overlays
            .iter()
            .enumerate()
            .filter(move |(_, overlay)| in_range && overlay.is_active(t))
    }

    /// Number of frames at `fps`: `ceil(total_duration · fps)`.
    pub fn frame_count(&self, fps: u32) -> u64 {
        if self.total_duration_secs <= 0.0 || fps == 0 {
            return 0;
        }
        (self.total_duration_secs * fps as f64).ceil() as u64
    }

    /// Paint the frame at `t` into `frame` (resized to the canvas if needed).
    pub fn rasterize_frame(&self, t: f64, frame: &mut RgbaImage) {
        if frame.dimensions() != (self.canvas.width, self.canvas.height) {
            *frame = RgbaImage::new(self.canvas.width, self.canvas.height);
        }
        frame.copy_from_slice(self.background.image.as_raw());
        for (_, overlay) in self.active_overlays(t) {
            overlay.raster.draw_over(frame);
        }
    }

    /// Largest amount by which an overlay outlasts the audio.
    pub fn max_overrun_secs(&self) -> f64 {
        self.overlays
            .iter()
            .map(|o| o.end_secs() - self.total_duration_secs)
            .fold(0.0, f64::max)
    }

    pub fn has_captions(&self) -> bool {
        !self.overlays.is_empty()
    }
}

/// Decode the background image at `path`.
///
/// The format is sniffed from the file contents, not the extension.
pub fn decode_background(path: &Path) -> WordcastResult<DynamicImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        WordcastError::decode(format!("Cannot read image {}: {e}", path.display()))
    })?;
    image::load_from_memory(&bytes)
        .map_err(|e| WordcastError::decode(format!("Cannot decode image {}: {e}", path.display())))
}

/// Center-crop `image` to the canvas aspect ratio and resize it to exactly
/// canvas size.
pub fn stage_background(
    image: &DynamicImage,
    canvas: Canvas,
    duration_secs: f64,
) -> WordcastResult<BackgroundLayer> {
    let plan = cover_plan(image.width(), image.height(), canvas)
        .ok_or_else(|| WordcastError::decode("Background image has zero size"))?;

    tracing::debug!(
        src_width = image.width(),
        src_height = image.height(),
        crop_x = plan.crop.x,
        crop_y = plan.crop.y,
        crop_width = plan.crop.width,
        crop_height = plan.crop.height,
        scale = plan.scale(),
        "Staging background"
    );

    let mut cropped = image
        .crop_imm(plan.crop.x, plan.crop.y, plan.crop.width, plan.crop.height)
        .resize_exact(plan.canvas.width, plan.canvas.height, FilterType::Triangle)
        .to_rgba8();

    // Transparent source pixels would leave holes in the video.
    for pixel in cropped.pixels_mut() {
        pixel.0[3] = 255;
    }

    Ok(BackgroundLayer {
        image: cropped,
        duration_secs,
    })
}

/// Build the composition for one entry.
///
/// `rasters` holds one rendered word per timing, in the same order. Empty
/// timings give a background-and-audio composition without captions.
pub fn compose(
    background_image: &DynamicImage,
    canvas: Canvas,
    audio: AudioTrack,
    timings: &[WordTiming],
    rasters: Vec<GlyphRaster>,
) -> WordcastResult<Composition> {
    if timings.len() != rasters.len() {
        return Err(WordcastError::render(format!(
            "{} word timings but {} glyph rasters",
            timings.len(),
            rasters.len()
        )));
    }

    let total_duration_secs = audio.duration_secs.max(0.0);
    let background = stage_background(background_image, canvas, total_duration_secs)?;

    let overlays: Vec<OverlayLayer> = timings
        .iter()
        .zip(rasters)
        .map(|(timing, raster)| OverlayLayer::from_timing(timing, raster))
        .collect();

    let composition = Composition {
        canvas,
        background,
        overlays,
        audio,
        total_duration_secs,
    };

    tracing::debug!(
        overlays = composition.overlays.len(),
        total_duration_secs,
        max_overrun_secs = composition.max_overrun_secs(),
        "Composition built"
    );

    Ok(composition)
}
