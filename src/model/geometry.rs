//! Page geometry.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in top-left-origin page space (points, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub top: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl BBox {
    /// Create a box from its edges.
    pub fn new(x0: f32, top: f32, x1: f32, bottom: f32) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Smallest box containing all given points.
    pub fn from_points(points: &[(f32, f32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bbox = Self::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            bbox.x0 = bbox.x0.min(x);
            bbox.x1 = bbox.x1.max(x);
            bbox.top = bbox.top.min(y);
            bbox.bottom = bbox.bottom.max(y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Center point as (x, y).
    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grow (or shrink, for negative values) horizontally by `dx` and vertically by `dy`.
    pub fn expand(&self, dx: f32, dy: f32) -> BBox {
        BBox {
            x0: self.x0 - dx,
            top: self.top - dy,
            x1: self.x1 + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Strict overlap test after padding `self` on every side.
    pub fn overlaps(&self, other: &BBox, padding: f32) -> bool {
        self.x0 - padding < other.x1
            && self.x1 + padding > other.x0
            && self.top - padding < other.bottom
            && self.bottom + padding > other.top
    }

    /// Inclusive point containment with tolerance.
    pub fn contains_point(&self, x: f32, y: f32, padding: f32) -> bool {
        self.x0 - padding <= x
            && x <= self.x1 + padding
            && self.top - padding <= y
            && y <= self.bottom + padding
    }

    /// Whether the center of `other` lies inside this box (with tolerance).
    pub fn contains_center_of(&self, other: &BBox, padding: f32) -> bool {
        let (cx, cy) = other.center();
        self.contains_point(cx, cy, padding)
    }

    /// Vertical gap between two boxes; `-1.0` when they overlap vertically.
    pub fn vertical_distance(&self, other: &BBox) -> f32 {
        if self.bottom <= other.top {
            other.top - self.bottom
        } else if other.bottom <= self.top {
            self.top - other.bottom
        } else {
            -1.0
        }
    }
}
