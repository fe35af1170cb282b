//! Axis-aligned bounding boxes on the placement plane.
//!
//! A [`BBox`] is the closed-open rectangle `[xl, xh) × [yl, yh)` in site
//! units. Regions, clock regions, and the die outline are all boxes; the
//! legalizers clamp and test containment against them.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in site units, `[xl, xh) × [yl, yh)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Left edge (inclusive).
    pub xl: f32,
    /// Bottom edge (inclusive).
    pub yl: f32,
    /// Right edge (exclusive).
    pub xh: f32,
    /// Top edge (exclusive).
    pub yh: f32,
}

impl BBox {
    /// Creates a box from its four edges.
    pub fn new(xl: f32, yl: f32, xh: f32, yh: f32) -> Self {
        Self { xl, yl, xh, yh }
    }

    /// Returns the width of the box.
    pub fn width(&self) -> f32 {
        self.xh - self.xl
    }

    /// Returns the height of the box.
    pub fn height(&self) -> f32 {
        self.yh - self.yl
    }

    /// Returns whether the point `(x, y)` lies inside the box.
    ///
    /// The left and bottom edges are inclusive, the right and top edges
    /// exclusive, matching the site-grid convention.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.xl <= x && x < self.xh && self.yl <= y && y < self.yh
    }

    /// Clamps the point `(x, y)` into the box on both axes.
    ///
    /// Each coordinate is clamped against both its minimum and maximum
    /// bound. The maximum is pulled in by `margin` so that an instance of
    /// that extent still fits inside the box after clamping.
    pub fn clamp(&self, x: f32, y: f32, margin_x: f32, margin_y: f32) -> (f32, f32) {
        let cx = x.max(self.xl).min(self.xh - margin_x);
        let cy = y.max(self.yl).min(self.yh - margin_y);
        (cx, cy)
    }
}
