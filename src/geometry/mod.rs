//! Bounding Geometry
//!
//! Pure helpers over the 8-number bounding quadrilaterals returned by text
//! recognizers. Coordinates are pixels with the origin at the top-left corner
//! and Y increasing downward.
//!
//! Malformed boxes never panic: every operation returns `None` ("unknown
//! geometry") and callers fall back to a single ASCII space.

use serde::{Deserialize, Serialize};

/// Number of values in a well-formed quadrilateral.
pub const QUAD_LEN: usize = 8;

/// Bounding quadrilateral: top-left, top-right, bottom-right, bottom-left
/// corners as `[x0, y0, x1, y1, x2, y2, x3, y3]`.
///
/// Deserializes from a plain JSON number array. Short or non-finite input is
/// kept as-is and reported as unknown by [`extent`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quad(pub Vec<f64>);

impl Quad {
    pub fn new(points: [f64; QUAD_LEN]) -> Self {
        Self(points.to_vec())
    }

    /// Axis-aligned box given its top-left corner and size
    pub fn from_rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        let right = left + width;
        let bottom = top + height;
        Self::new([left, top, right, top, right, bottom, left, bottom])
    }

    /// Leftmost corner X, if the quad is well formed
    pub fn left(&self) -> Option<f64> {
        extent(self).map(|e| e.left)
    }

    /// Largest corner Y (the bottom edge in top-origin space)
    pub fn max_y(&self) -> Option<f64> {
        extent(self).map(|e| e.bottom)
    }
}

/// Axis-aligned extent of a quadrilateral
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
    pub center_y: f64,
}

impl Extent {
    /// Zero-width or zero-height boxes carry no usable geometry
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Compute the axis-aligned extent of a quad.
///
/// Returns `None` for fewer than 8 values or any non-finite value.
pub fn extent(quad: &Quad) -> Option<Extent> {
    let points = quad.0.get(..QUAD_LEN)?;
    if points.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let xs = [points[0], points[2], points[4], points[6]];
    let ys = [points[1], points[3], points[5], points[7]];

    let left = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let right = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let top = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let bottom = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(Extent {
        left,
        right,
        top,
        bottom,
        width: right - left,
        height: bottom - top,
        center_y: (top + bottom) / 2.0,
    })
}

/// Extent that is both well formed and non-degenerate
pub fn known_extent(quad: &Quad) -> Option<Extent> {
    extent(quad).filter(|e| !e.is_degenerate())
}

/// Horizontal gap from the right edge of `a` to the left edge of `b`.
/// Negative when the boxes overlap.
pub fn horizontal_gap(a: &Quad, b: &Quad) -> Option<f64> {
    let (a, b) = (extent(a)?, extent(b)?);
    Some(b.left - a.right)
}

/// Vertical gap from the bottom edge of `a` to the top edge of `b`.
pub fn vertical_gap(a: &Quad, b: &Quad) -> Option<f64> {
    let (a, b) = (extent(a)?, extent(b)?);
    Some(b.top - a.bottom)
}

/// Vertical distance between the box centers
pub fn center_distance(a: &Quad, b: &Quad) -> Option<f64> {
    let (a, b) = (extent(a)?, extent(b)?);
    Some((a.center_y - b.center_y).abs())
}

/// Smallest extent covering all inputs, `None` when the input is empty
pub fn union<I>(extents: I) -> Option<Extent>
where
    I: IntoIterator<Item = Extent>,
{
    extents.into_iter().reduce(|acc, e| {
        let left = acc.left.min(e.left);
        let right = acc.right.max(e.right);
        let top = acc.top.min(e.top);
        let bottom = acc.bottom.max(e.bottom);
        Extent {
            left,
            right,
            top,
            bottom,
            width: right - left,
            height: bottom - top,
            center_y: (top + bottom) / 2.0,
        }
    })
}
