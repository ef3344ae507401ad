//! Wordcast Render Engine
//!
//! Turns a timed narration into a finished vertical video.
//!
//! # Pipeline Architecture
//!
//! ```text
//! image.png ──── Decode ── Scale/Center-crop ──┐
//!                                              ├── Composition ── RGBA frames ──┐
//! word timings ── Glyph rasters (one/word) ────┘                                ├── ffmpeg ── Ada.mp4
//! narration.mp3 ────────────────────────────────────────────────────────────────┘
//! ```

pub mod compositor;
pub mod export;
pub mod font;
pub mod glyph;

pub use compositor::{
    compose, decode_background, stage_background, AudioTrack, BackgroundLayer, Composition,
    OverlayLayer,
};
pub use export::*;
pub use font::CaptionFont;
pub use glyph::{render_word, GlyphRaster, GlyphStyle};
