//! Word glyph rendering.
//!
//! A [`GlyphRaster`] stands for a full transparent canvas holding one word,
//! centered, with an outline and a fill. Only the painted sprite is stored,
//! together with its position on the canvas.

use image::{GrayImage, Rgba, RgbaImage};
use imageproc::morphology::{grayscale_dilate, Mask};
use wordcast_common::config::StyleConfig;
use wordcast_project_model::canvas::{Canvas, PixelRect};

use crate::font::CaptionFont;

/// Caption styling for one composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphStyle {
    pub canvas: Canvas,
    pub font_size: f32,
    pub fill: Rgba<u8>,
    pub outline: Rgba<u8>,
    /// Outline radius in pixels; the outline covers the full
    /// `(2t+1) × (2t+1)` neighborhood of every inked pixel.
    pub outline_thickness: u32,
}

impl GlyphStyle {
    pub fn from_config(canvas: Canvas, style: &StyleConfig) -> Self {
        Self {
            canvas,
            font_size: style.font_size,
            fill: Rgba(style.fill_rgba),
            outline: Rgba(style.outline_rgba),
            outline_thickness: style.outline_thickness,
        }
    }
}

/// One rendered word.
#[derive(Debug, Clone)]
pub struct GlyphRaster {
    pub word: String,
    pub canvas: Canvas,
    /// Painted pixels, sized to `painted`; `None` for a word without ink.
    pub sprite: Option<RgbaImage>,
    /// Where the sprite sits on the canvas.
    pub painted: Option<PixelRect>,
}

impl GlyphRaster {
    fn empty(word: &str, canvas: Canvas) -> Self {
        Self {
            word: word.to_string(),
            canvas,
            sprite: None,
            painted: None,
        }
    }

    /// Canvas pixel at `(x, y)`; transparent outside the painted area.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        match (&self.sprite, self.painted) {
            (Some(sprite), Some(rect)) if rect.contains(x, y) => {
                *sprite.get_pixel(x - rect.x, y - rect.y)
            }
            _ => Rgba([0, 0, 0, 0]),
        }
    }

    /// Materialize the full canvas-sized raster.
    pub fn to_canvas_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.canvas.width, self.canvas.height);
        if let (Some(sprite), Some(rect)) = (&self.sprite, self.painted) {
            image::imageops::replace(&mut image, sprite, rect.x as i64, rect.y as i64);
        }
        image
    }

    /// Alpha-composite this word over `frame`, touching only painted pixels.
    pub fn draw_over(&self, frame: &mut RgbaImage) {
        let (Some(sprite), Some(rect)) = (&self.sprite, self.painted) else {
            return;
        };
        for (sx, sy, src) in sprite.enumerate_pixels() {
            let (fx, fy) = (rect.x + sx, rect.y + sy);
            if fx >= frame.width() || fy >= frame.height() {
                continue;
            }
            let alpha = src.0[3] as f32 / 255.0;
            if alpha > 0.0 {
                blend_over(frame.get_pixel_mut(fx, fy), *src, alpha);
            }
        }
    }
}

/// Render `word` centered on the style's canvas.
///
/// Pure: the same inputs always give the same raster and nothing is shared
/// between calls.
pub fn render_word(word: &str, font: &CaptionFont, style: &GlyphStyle) -> GlyphRaster {
    let mask = font.coverage(word, style.font_size);
    if mask.width() == 0 || mask.height() == 0 {
        return GlyphRaster::empty(word, style.canvas);
    }

    let radius = outline_radius(style.outline_thickness);
    let t = radius as u32;
    let padded = pad(&mask, t);
    let outline_mask = if radius > 0 {
        grayscale_dilate(&padded, &Mask::square(radius))
    } else {
        padded.clone()
    };

    let mut sprite = RgbaImage::new(padded.width(), padded.height());
    for (x, y, pixel) in sprite.enumerate_pixels_mut() {
        let outline_cov = outline_mask.get_pixel(x, y).0[0] as f32 / 255.0;
        if outline_cov > 0.0 {
            let alpha = outline_cov * style.outline.0[3] as f32 / 255.0;
            blend_over(pixel, style.outline, alpha);
        }
        let fill_cov = padded.get_pixel(x, y).0[0] as f32 / 255.0;
        if fill_cov > 0.0 {
            let alpha = fill_cov * style.fill.0[3] as f32 / 255.0;
            blend_over(pixel, style.fill, alpha);
        }
    }

    let (ink_x, ink_y) = style.canvas.centered_origin(mask.width(), mask.height());
    place_on_canvas(word, style.canvas, sprite, ink_x - t as i64, ink_y - t as i64)
}

/// Clip a sprite whose top-left is at `(x, y)` (possibly negative) to the canvas.
fn place_on_canvas(word: &str, canvas: Canvas, sprite: RgbaImage, x: i64, y: i64) -> GlyphRaster {
    let left = x.max(0);
    let top = y.max(0);
    let right = (x + sprite.width() as i64).min(canvas.width as i64);
    let bottom = (y + sprite.height() as i64).min(canvas.height as i64);
    if left >= right || top >= bottom {
        return GlyphRaster::empty(word, canvas);
    }

    let rect = PixelRect::new(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    );
    let sprite = if rect.width == sprite.width() && rect.height == sprite.height() {
        sprite
    } else {
        image::imageops::crop_imm(
            &sprite,
            (left - x) as u32,
            (top - y) as u32,
            rect.width,
            rect.height,
        )
        .to_image()
    };

    GlyphRaster {
        word: word.to_string(),
        canvas,
        sprite: Some(sprite),
        painted: Some(rect),
    }
}

/// Square dilation radius for an outline thickness; the mask radius is a u8.
fn outline_radius(thickness: u32) -> u8 {
    thickness.min(u8::MAX as u32) as u8
}

fn pad(mask: &GrayImage, t: u32) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2 * t, mask.height() + 2 * t);
    image::imageops::replace(&mut padded, mask, t as i64, t as i64);
    padded
}

/// Straight-alpha "over": paint `color` with opacity `alpha` onto `dst`.
pub(crate) fn blend_over(dst: &mut Rgba<u8>, color: Rgba<u8>, alpha: f32) {
    let sa = alpha.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let sc = color.0[c] as f32;
        let dc = dst.0[c] as f32;
        let v = (sc * sa + dc * da * (1.0 - sa)) / out_a;
        dst.0[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn style(width: u32, height: u32, thickness: u32) -> GlyphStyle {
        GlyphStyle {
            canvas: Canvas::new(width, height),
            font_size: 16.0,
            fill: WHITE,
            outline: BLACK,
            outline_thickness: thickness,
        }
    }

    #[test]
    fn test_word_is_centered_on_canvas() {
        let style = style(200, 100, 2);
        let raster = render_word("I", &CaptionFont::Bitmap, &style);
        let rect = raster.painted.unwrap();

        let left_margin = rect.x;
        let right_margin = 200 - rect.right();
        let top_margin = rect.y;
        let bottom_margin = 100 - rect.bottom();
        assert!(left_margin.abs_diff(right_margin) <= 1);
        assert!(top_margin.abs_diff(bottom_margin) <= 1);
    }

    #[test]
    fn test_outline_surrounds_fill() {
        let style = style(200, 100, 2);
        let raster = render_word("I", &CaptionFont::Bitmap, &style);
        let rect = raster.painted.unwrap();

        // The serif row of "I" spans the full ink width, so the padded
        // border next to it is pure outline, corners included.
        assert_eq!(raster.pixel(rect.x, rect.y + 2), BLACK);
        assert_eq!(raster.pixel(rect.right() - 1, rect.y + 2), BLACK);
        assert_eq!(raster.pixel(rect.x, rect.y), BLACK);

        let pixels: Vec<Rgba<u8>> = (rect.y..rect.bottom())
            .flat_map(|y| (rect.x..rect.right()).map(move |x| (x, y)))
            .map(|(x, y)| raster.pixel(x, y))
            .collect();
        assert!(pixels.contains(&WHITE));
        assert!(pixels.contains(&BLACK));
    }

    #[test]
    fn test_outline_fills_the_square_around_a_single_dot() {
        // "." is a small block; a thickness-3 outline grows it by a full
        // 7x7 square, so the sprite corners are outline, not rounded off.
        let dot = render_word(".", &CaptionFont::Bitmap, &style(200, 100, 0));
        let outlined = render_word(".", &CaptionFont::Bitmap, &style(200, 100, 3));
        let (a, b) = (dot.painted.unwrap(), outlined.painted.unwrap());
        assert_eq!((b.width, b.height), (a.width + 6, a.height + 6));
        let (right, bottom) = (b.right() - 1, b.bottom() - 1);
        for (x, y) in [(b.x, b.y), (right, b.y), (b.x, bottom), (right, bottom)] {
            assert_eq!(outlined.pixel(x, y), BLACK, "corner {x},{y}");
        }
    }

    #[test]
    fn test_oversized_outline_thickness_is_capped() {
        assert_eq!(outline_radius(0), 0);
        assert_eq!(outline_radius(4), 4);
        assert_eq!(outline_radius(255), 255);
        assert_eq!(outline_radius(1000), 255);
    }

    #[test]
    fn test_background_stays_transparent() {
        let style = style(200, 100, 2);
        let raster = render_word("I", &CaptionFont::Bitmap, &style);
        let full = raster.to_canvas_image();
        assert_eq!(full.dimensions(), (200, 100));
        assert_eq!(full.get_pixel(0, 0).0[3], 0);
        assert_eq!(full.get_pixel(199, 99).0[3], 0);

        let rect = raster.painted.unwrap();
        let painted = full
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .all(|(x, y, _)| rect.contains(x, y));
        assert!(painted);
    }

    #[test]
    fn test_outline_thickness_grows_sprite() {
        let thin = render_word("I", &CaptionFont::Bitmap, &style(200, 100, 0));
        let thick = render_word("I", &CaptionFont::Bitmap, &style(200, 100, 4));
        let (a, b) = (thin.painted.unwrap(), thick.painted.unwrap());
        assert_eq!(b.width, a.width + 8);
        assert_eq!(b.height, a.height + 8);
        assert!(!(0..a.width).any(|x| thin.pixel(a.x + x, a.y) == BLACK));
    }

    #[test]
    fn test_oversized_word_is_clipped_to_canvas() {
        let style = style(20, 20, 1);
        let raster = render_word("WORDCAST", &CaptionFont::Bitmap, &style);
        let rect = raster.painted.unwrap();
        assert_eq!((rect.x, rect.width), (0, 20));
        assert!(rect.bottom() <= 20);
        assert_eq!(raster.sprite.as_ref().unwrap().width(), 20);
    }

    #[test]
    fn test_render_is_deterministic() {
        let style = style(120, 60, 3);
        let a = render_word("ok", &CaptionFont::Bitmap, &style);
        let b = render_word("ok", &CaptionFont::Bitmap, &style);
        assert_eq!(a.painted, b.painted);
        assert_eq!(a.sprite, b.sprite);
    }

    #[test]
    fn test_draw_over_opaque_frame() {
        let style = style(120, 60, 2);
        let raster = render_word("I", &CaptionFont::Bitmap, &style);
        let mut frame = RgbaImage::from_pixel(120, 60, Rgba([10, 20, 30, 255]));
        raster.draw_over(&mut frame);

        let rect = raster.painted.unwrap();
        assert_eq!(*frame.get_pixel(rect.x, rect.y), BLACK);
        assert_eq!(*frame.get_pixel(0, 0), Rgba([10, 20, 30, 255]));
        assert!(frame.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_blend_over() {
        let mut px = Rgba([0, 0, 0, 0]);
        blend_over(&mut px, WHITE, 1.0);
        assert_eq!(px, WHITE);

        let mut px = Rgba([0, 0, 0, 255]);
        blend_over(&mut px, Rgba([255, 255, 255, 255]), 0.5);
        assert_eq!(px, Rgba([128, 128, 128, 255]));

        let mut px = Rgba([7, 7, 7, 255]);
        blend_over(&mut px, WHITE, 0.0);
        assert_eq!(px, Rgba([7, 7, 7, 255]));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn painted_bounds_stay_on_canvas(
                word in "[ -~]{0,24}",
                width in 8u32..160,
                height in 8u32..160,
                thickness in 0u32..6,
            ) {
                let style = style(width, height, thickness);
                let raster = render_word(&word, &CaptionFont::Bitmap, &style);
                if let Some(rect) = raster.painted {
                    prop_assert!(rect.right() <= width);
                    prop_assert!(rect.bottom() <= height);
                    prop_assert!(!rect.is_empty());
                }
                prop_assert_eq!(raster.to_canvas_image().dimensions(), (width, height));
            }
        }
    }
}
