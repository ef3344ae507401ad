//! Caption font loading and word coverage masks.
//!
//! A missing or unreadable font never fails an entry: resolution walks the
//! configured file, then well-known system fonts, then a built-in 8×8 bitmap
//! font scaled up to the requested size.

use std::fmt;
use std::path::{Path, PathBuf};

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rusttype::{point, Font, Scale};
use wordcast_common::error::{WordcastError, WordcastResult};

/// Bold sans fonts tried, in order, when the configured font is unusable.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// A font able to rasterize caption words. Immutable once loaded.
#[derive(Clone)]
pub enum CaptionFont {
    /// A TrueType/OpenType font file.
    Outline {
        font: Font<'static>,
        source: PathBuf,
    },
    /// The built-in 8×8 bitmap font.
    Bitmap,
}

impl fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionFont::Outline { source, .. } => {
                f.debug_struct("Outline").field("source", source).finish()
            }
            CaptionFont::Bitmap => f.write_str("Bitmap"),
        }
    }
}

impl CaptionFont {
    /// Load a font file.
    pub fn load(path: &Path) -> WordcastResult<Self> {
        if !path.is_file() {
            return Err(WordcastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| {
            WordcastError::render(format!("{} is not a usable font", path.display()))
        })?;
        Ok(CaptionFont::Outline {
            font,
            source: path.to_path_buf(),
        })
    }

    /// Resolve `configured` with system and built-in fallbacks.
    pub fn resolve(configured: &Path) -> Self {
        match Self::load(configured) {
            Ok(font) => {
                tracing::debug!(font = %configured.display(), "Loaded caption font");
                return font;
            }
            Err(e) => {
                tracing::warn!(font = %configured.display(), error = %e, "Configured font unavailable");
            }
        }

        for candidate in SYSTEM_FONT_CANDIDATES.iter().map(Path::new) {
            if candidate == configured || !candidate.is_file() {
                continue;
            }
            match Self::load(candidate) {
                Ok(font) => {
                    tracing::warn!(font = %candidate.display(), "Using fallback system font");
                    return font;
                }
                Err(e) => {
                    tracing::debug!(font = %candidate.display(), error = %e, "Skipping system font");
                }
            }
        }

        tracing::warn!("No TrueType font found, using built-in bitmap font");
        CaptionFont::Bitmap
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, CaptionFont::Bitmap)
    }

    /// Human-readable font origin for logs and `wordcast check`.
    pub fn describe(&self) -> String {
        match self {
            CaptionFont::Outline { source, .. } => source.display().to_string(),
            CaptionFont::Bitmap => "built-in 8x8 bitmap".to_string(),
        }
    }

    /// Coverage mask of `word` at `size` pixels, cropped to its ink bounds.
    ///
    /// A word without visible ink yields a 0×0 mask.
    pub fn coverage(&self, word: &str, size: f32) -> GrayImage {
        match self {
            CaptionFont::Outline { font, .. } => outline_coverage(font, word, size),
            CaptionFont::Bitmap => trim_to_ink(&bitmap_coverage(word, size)),
        }
    }
}

fn outline_coverage(font: &Font<'static>, word: &str, size: f32) -> GrayImage {
    let scale = Scale::uniform(size.max(1.0));
    let v_metrics = font.v_metrics(scale);

    let glyphs: Vec<_> = font
        .layout(word, scale, point(0.0, v_metrics.ascent))
        .filter_map(|g| g.pixel_bounding_box().map(|bb| (g, bb)))
        .collect();

    let Some((min_x, min_y, max_x, max_y)) = glyphs.iter().map(|(_, bb)| bb).fold(
        None,
        |acc: Option<(i32, i32, i32, i32)>, bb| {
            Some(match acc {
                None => (bb.min.x, bb.min.y, bb.max.x, bb.max.y),
                Some((x0, y0, x1, y1)) => (
                    x0.min(bb.min.x),
                    y0.min(bb.min.y),
                    x1.max(bb.max.x),
                    y1.max(bb.max.y),
                ),
            })
        },
    ) else {
        return GrayImage::new(0, 0);
    };

    let width = (max_x - min_x).max(0) as u32;
    let height = (max_y - min_y).max(0) as u32;
    let mut mask = GrayImage::new(width, height);

    for (glyph, bb) in &glyphs {
        let off_x = bb.min.x - min_x;
        let off_y = bb.min.y - min_y;
        glyph.draw(|x, y, v| {
            let px = off_x + x as i32;
            let py = off_y + y as i32;
            if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                return;
            }
            let value = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            let pixel = mask.get_pixel_mut(px as u32, py as u32);
            pixel.0[0] = pixel.0[0].max(value);
        });
    }

    mask
}

fn bitmap_glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn bitmap_coverage(word: &str, size: f32) -> GrayImage {
    let cell = ((size / 8.0).round() as u32).max(1);
    let glyphs: Vec<[u8; 8]> = word.chars().map(bitmap_glyph).collect();
    let mut mask = GrayImage::new(glyphs.len() as u32 * 8 * cell, 8 * cell);

    for (i, rows) in glyphs.iter().enumerate() {
        let base_x = i as u32 * 8 * cell;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..8u32 {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let x = base_x + col * cell;
                let y = row as u32 * cell;
                draw_filled_rect_mut(
                    &mut mask,
                    Rect::at(x as i32, y as i32).of_size(cell, cell),
                    Luma([255]),
                );
            }
        }
    }

    mask
}

/// Crop a mask to the bounding box of its non-zero pixels.
fn trim_to_ink(mask: &GrayImage) -> GrayImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => {
            image::imageops::crop_imm(mask, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
        }
        None => GrayImage::new(0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CaptionFont::load(&dir.path().join("missing.ttf")).unwrap_err();
        assert!(matches!(err, WordcastError::FileNotFound { .. }));
    }

    #[test]
    fn test_garbage_font_file_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        let err = CaptionFont::load(&path).unwrap_err();
        assert!(matches!(err, WordcastError::Render { .. }));
    }

    #[test]
    fn test_resolve_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let font = CaptionFont::resolve(&dir.path().join("missing.ttf"));
        assert!(!font.describe().is_empty());
        assert!(font.coverage("Hi", 40.0).width() > 0);
    }

    #[test]
    fn test_bitmap_coverage_scales_with_size() {
        let small = CaptionFont::Bitmap.coverage("I", 8.0);
        let large = CaptionFont::Bitmap.coverage("I", 80.0);
        assert!(small.width() > 0 && small.height() > 0);
        assert_eq!(large.width(), small.width() * 10);
        assert_eq!(large.height(), small.height() * 10);
        assert!(large.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_bitmap_coverage_is_ink_tight() {
        let mask = CaptionFont::Bitmap.coverage("hello", 16.0);
        let last_col = mask.width() - 1;
        let last_row = mask.height() - 1;
        assert!((0..mask.height()).any(|y| mask.get_pixel(0, y).0[0] > 0));
        assert!((0..mask.height()).any(|y| mask.get_pixel(last_col, y).0[0] > 0));
        assert!((0..mask.width()).any(|x| mask.get_pixel(x, 0).0[0] > 0));
        assert!((0..mask.width()).any(|x| mask.get_pixel(x, last_row).0[0] > 0));
    }

    #[test]
    fn test_bitmap_unknown_chars_still_render() {
        assert!(CaptionFont::Bitmap.coverage("日本", 16.0).width() > 0);
        assert!(CaptionFont::Bitmap.coverage("é", 16.0).width() > 0);
    }

    #[test]
    fn test_empty_word_has_empty_mask() {
        let mask = CaptionFont::Bitmap.coverage("", 80.0);
        assert_eq!((mask.width(), mask.height()), (0, 0));
    }
}
