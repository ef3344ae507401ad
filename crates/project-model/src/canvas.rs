//! Output frame geometry.
//!
//! Unlike normalized capture coordinates, everything here is in whole
//! output pixels with `(0, 0)` at the top-left corner.

use serde::{Deserialize, Serialize};
use wordcast_common::config::CanvasConfig;

/// Size of every frame, background raster and glyph raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// 1080×1920 portrait frame used for shorts.
    pub const VERTICAL_HD: Canvas = Canvas {
        width: 1080,
        height: 1920,
    };

    /// Create a canvas, clamping each side to at least one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Number of pixels in one frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of one RGBA8 frame.
    pub fn rgba_len(&self) -> usize {
        self.pixel_count() * 4
    }

    /// Rectangle covering the whole canvas.
    pub fn bounds(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }

    /// Top-left position that centers a `w × h` box on the canvas.
    ///
    /// The result may be negative when the box is larger than the canvas.
    pub fn centered_origin(&self, w: u32, h: u32) -> (i64, i64) {
        (
            (self.width as i64 - w as i64) / 2,
            (self.height as i64 - h as i64) / 2,
        )
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::VERTICAL_HD
    }
}

impl From<CanvasConfig> for Canvas {
    fn from(config: CanvasConfig) -> Self {
        Self::new(config.width, config.height)
    }
}

/// An axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Check if a pixel lies inside this rectangle.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        PixelRect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Clip to `canvas`, returning `None` when nothing remains.
    pub fn clip_to(&self, canvas: Canvas) -> Option<PixelRect> {
        let right = self.right().min(canvas.width);
        let bottom = self.bottom().min(canvas.height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(PixelRect::new(self.x, self.y, right - self.x, bottom - self.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_canvas() {
        let canvas = Canvas::default();
        assert_eq!(canvas, Canvas::VERTICAL_HD);
        assert!((canvas.aspect() - 9.0 / 16.0).abs() < 1e-9);
        assert_eq!(canvas.rgba_len(), 1080 * 1920 * 4);
    }

    #[test]
    fn test_new_clamps_zero_sides() {
        let canvas = Canvas::new(0, 0);
        assert_eq!((canvas.width, canvas.height), (1, 1));
    }

    #[test]
    fn test_centered_origin() {
        let canvas = Canvas::new(100, 200);
        assert_eq!(canvas.centered_origin(40, 20), (30, 90));
        assert_eq!(canvas.centered_origin(140, 20), (-20, 90));
    }

    #[test]
    fn test_rect_union_and_contains() {
        let a = PixelRect::new(10, 10, 5, 5);
        let b = PixelRect::new(20, 2, 2, 2);
        let u = a.union(&b);
        assert_eq!(u, PixelRect::new(10, 2, 12, 13));
        assert!(u.contains(21, 3));
        assert!(!u.contains(22, 3));

        let empty = PixelRect::new(0, 0, 0, 0);
        assert_eq!(empty.union(&a), a);
    }

    #[test]
    fn test_clip_to_canvas() {
        let canvas = Canvas::new(100, 100);
        let r = PixelRect::new(90, 95, 20, 20);
        assert_eq!(r.clip_to(canvas), Some(PixelRect::new(90, 95, 10, 5)));
        assert_eq!(PixelRect::new(100, 0, 5, 5).clip_to(canvas), None);
    }

    #[test]
    fn test_from_config() {
        let canvas: Canvas = CanvasConfig::default().into();
        assert_eq!(canvas, Canvas::VERTICAL_HD);
    }
}
