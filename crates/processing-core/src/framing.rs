//! Background framing.
//!
//! A still image is cut down to the canvas aspect ratio around its center,
//! then that region is resized to exactly the canvas size. For a source wider
//! than the canvas this is the same as scaling to the canvas height and
//! cropping the sides; for a narrower one, scaling to the canvas width and
//! cropping top and bottom. Cropping first keeps the resize bounded by the
//! canvas size whatever the source aspect ratio.

use serde::Serialize;
use wordcast_project_model::canvas::{Canvas, PixelRect};

/// How to turn a source image into a canvas-sized background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverPlan {
    /// Centered region of the source image, in source pixels, with the
    /// canvas aspect ratio.
    pub crop: PixelRect,
    /// Size the crop is resized to.
    pub canvas: Canvas,
}

impl CoverPlan {
    /// Uniform scale factor from source pixels to canvas pixels.
    pub fn scale(&self) -> f64 {
        self.canvas.height as f64 / self.crop.height.max(1) as f64
    }
}

/// Plan the crop for an image of `src_width × src_height`.
///
/// Either the full source width or the full source height is kept. Returns
/// `None` for a zero-sized source or canvas.
pub fn cover_plan(src_width: u32, src_height: u32, canvas: Canvas) -> Option<CoverPlan> {
    if src_width == 0 || src_height == 0 || canvas.width == 0 || canvas.height == 0 {
        return None;
    }

    let (sw, sh) = (src_width as u64, src_height as u64);
    let (cw, ch) = (canvas.width as u64, canvas.height as u64);

    // Rounded to the nearest source pixel, never empty, never past the source.
    let (crop_w, crop_h) = if sw * ch >= cw * sh {
        let w = (sh * cw * 2 + ch) / (ch * 2);
        (w.clamp(1, sw) as u32, src_height)
    } else {
        let h = (sw * ch * 2 + cw) / (cw * 2);
        (src_width, h.clamp(1, sh) as u32)
    };

    let crop = PixelRect::new(
        (src_width - crop_w) / 2,
        (src_height - crop_h) / 2,
        crop_w,
        crop_h,
    );

    Some(CoverPlan { crop, canvas })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_image_keeps_full_height_and_crops_sides() {
        let plan = cover_plan(1920, 1080, Canvas::VERTICAL_HD).unwrap();
        assert_eq!(plan.crop, PixelRect::new(656, 0, 608, 1080));
        assert!((plan.scale() - 1920.0 / 1080.0).abs() < 1e-12);
    }

    #[test]
    fn test_matching_aspect_is_whole_image() {
        let plan = cover_plan(540, 960, Canvas::VERTICAL_HD).unwrap();
        assert_eq!(plan.crop, PixelRect::new(0, 0, 540, 960));
        assert!((plan.scale() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_narrow_image_keeps_full_width_and_crops_top_bottom() {
        let plan = cover_plan(500, 2000, Canvas::VERTICAL_HD).unwrap();
        assert_eq!(plan.crop, PixelRect::new(0, 555, 500, 889));
    }

    #[test]
    fn test_extreme_aspect_crops_a_tiny_source_region() {
        let plan = cover_plan(4000, 2, Canvas::VERTICAL_HD).unwrap();
        assert_eq!(plan.crop, PixelRect::new(1999, 0, 1, 2));

        let plan = cover_plan(2, 4000, Canvas::VERTICAL_HD).unwrap();
        assert_eq!(plan.crop, PixelRect::new(0, 1998, 2, 4));

        let plan = cover_plan(u32::MAX, 1, Canvas::VERTICAL_HD).unwrap();
        assert_eq!((plan.crop.width, plan.crop.height), (1, 1));
    }

    #[test]
    fn test_zero_sized_source() {
        assert_eq!(cover_plan(0, 10, Canvas::VERTICAL_HD), None);
        assert_eq!(cover_plan(10, 0, Canvas::VERTICAL_HD), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn crop_is_centered_inside_source_with_canvas_aspect(
                src_w in 1u32..100_000,
                src_h in 1u32..100_000,
                canvas_w in 1u32..2500,
                canvas_h in 1u32..2500,
            ) {
                let canvas = Canvas::new(canvas_w, canvas_h);
                let crop = cover_plan(src_w, src_h, canvas).unwrap().crop;

                prop_assert!(!crop.is_empty());
                prop_assert!(crop.right() <= src_w);
                prop_assert!(crop.bottom() <= src_h);
                prop_assert!(crop.width == src_w || crop.height == src_h);

                let slack_x = src_w - crop.width;
                let slack_y = src_h - crop.height;
                prop_assert!(slack_x / 2 == crop.x && slack_y / 2 == crop.y);

                // Within half a source pixel of the canvas aspect, unless
                // clamped to a single pixel.
                let lhs = crop.width as f64 * canvas_h as f64;
                let rhs = crop.height as f64 * canvas_w as f64;
                let tolerance = 0.5 * canvas_w.max(canvas_h) as f64 + 1e-6;
                prop_assert!(
                    (lhs - rhs).abs() <= tolerance || crop.width == 1 || crop.height == 1
                );
            }
        }
    }
}
