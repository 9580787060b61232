use std::sync::Arc;

use crate::config::DEFAULT_EMU_PER_PX;
use crate::deck::model::{EmuRect, Shape, TextRun};
use crate::foundation::core::Resolution;

/// Maps native document units to output pixels at a fixed ratio.
///
/// Positions are additionally shifted by `origin`, which centres a slide whose aspect ratio
/// differs from the output frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitConverter {
    emu_per_px: i64,
    origin: (i32, i32),
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self {
            emu_per_px: DEFAULT_EMU_PER_PX,
            origin: (0, 0),
        }
    }
}

impl UnitConverter {
    /// Create a converter; a non-positive ratio falls back to the 96 DPI default.
    pub fn new(emu_per_px: i64) -> Self {
        if emu_per_px <= 0 {
            return Self::default();
        }
        Self {
            emu_per_px,
            origin: (0, 0),
        }
    }

    /// Converter that scales a `slide_emu` sized slide to fill `frame`.
    ///
    /// The ratio is rounded up so the whole slide stays inside the frame; any leftover band is
    /// split evenly on both sides. `None` for a degenerate slide size.
    pub fn fit(slide_emu: (i64, i64), frame: Resolution) -> Option<Self> {
        let (cx, cy) = slide_emu;
        if cx <= 0 || cy <= 0 || frame.width == 0 || frame.height == 0 {
            return None;
        }
        let per_w = div_ceil(cx, i64::from(frame.width));
        let per_h = div_ceil(cy, i64::from(frame.height));
        let conv = Self::new(per_w.max(per_h));
        let used_w = i64::from(conv.convert(cx));
        let used_h = i64::from(conv.convert(cy));
        let origin = (
            ((i64::from(frame.width) - used_w) / 2).max(0) as i32,
            ((i64::from(frame.height) - used_h) / 2).max(0) as i32,
        );
        Some(Self { origin, ..conv })
    }

    /// Pixel offset added to every converted position.
    pub fn origin(self) -> (i32, i32) {
        self.origin
    }

    /// Native units per pixel.
    pub fn emu_per_px(self) -> i64 {
        self.emu_per_px
    }

    /// `floor(native / emu_per_px)`, saturating at the `i32` range.
    ///
    /// Negative positions stay negative; clipping is the rasterizer's job.
    pub fn convert(self, native: i64) -> i32 {
        let px = native.div_euclid(self.emu_per_px);
        px.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    /// Convert a rectangle; width and height are clamped to be >= 0.
    pub fn convert_rect(self, r: EmuRect) -> PxRect {
        PxRect {
            x: self.convert(r.x).saturating_add(self.origin.0),
            y: self.convert(r.y).saturating_add(self.origin.1),
            width: self.convert(r.cx).max(0),
            height: self.convert(r.cy).max(0),
        }
    }

    /// Convert a shape into a paint-ready element.
    pub fn normalize(self, shape: &Shape) -> NormalizedElement {
        match shape {
            Shape::Text(t) => NormalizedElement::Text {
                rect: self.convert_rect(t.frame),
                runs: t.runs.clone(),
            },
            Shape::Picture(p) => NormalizedElement::Picture {
                rect: self.convert_rect(p.frame),
                payload: p.payload.clone(),
            },
        }
    }

    /// Convert every shape of a slide, keeping document order.
    pub fn normalize_all(self, shapes: &[Shape]) -> Vec<NormalizedElement> {
        shapes.iter().map(|s| self.normalize(s)).collect()
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    a.saturating_add(b - 1) / b
}

/// Integer pixel rectangle. `width`/`height` are never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PxRect {
    /// Left edge (may be negative).
    pub x: i32,
    /// Top edge (may be negative).
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl PxRect {
    /// Return `true` when the rectangle has no area.
    pub fn is_degenerate(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// A shape in pixel space, ready for painting.
#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedElement {
    /// Text block anchored at `rect`'s top-left corner.
    Text {
        /// Pixel geometry.
        rect: PxRect,
        /// Runs in document order.
        runs: Vec<TextRun>,
    },
    /// Picture resampled into `rect`.
    Picture {
        /// Pixel geometry.
        rect: PxRect,
        /// Encoded image bytes.
        payload: Arc<Vec<u8>>,
    },
}

impl NormalizedElement {
    /// Pixel geometry of the element.
    pub fn rect(&self) -> PxRect {
        match self {
            NormalizedElement::Text { rect, .. } | NormalizedElement::Picture { rect, .. } => {
                *rect
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/units.rs"]
mod tests;
