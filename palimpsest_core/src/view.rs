// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View geometry: buffer size, visible world area, world-to-pixel transform.
//!
//! Two views with the same buffer size can share pixels only when one maps
//! onto the other by a whole number of pixels. [`integer_translation`] is the
//! test for that.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Affine, Point, Rect, Vec2};

use crate::geom;

/// Tolerance used by [`integer_translation`] unless configured otherwise.
pub const DEFAULT_TRANSLATION_EPSILON: f64 = 2e-6;

/// Size of a pixel buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Creates a size.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if the buffer would hold no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels.
    #[inline]
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// The full buffer as a rectangle anchored at the origin.
    #[inline]
    #[must_use]
    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// A whole-pixel displacement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelOffset {
    /// Horizontal displacement; positive moves content right.
    pub dx: i32,
    /// Vertical displacement; positive moves content down.
    pub dy: i32,
}

impl PixelOffset {
    /// No displacement.
    pub const ZERO: Self = Self { dx: 0, dy: 0 };

    /// Creates an offset.
    #[inline]
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// The offset as a vector.
    #[inline]
    #[must_use]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(f64::from(self.dx), f64::from(self.dy))
    }
}

/// Everything that determines the content of a cached buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    /// Buffer dimensions.
    pub pixel_size: PixelSize,
    /// The world area the buffer shows.
    pub world_area: Rect,
    /// Maps world coordinates to buffer pixels.
    pub transform: Affine,
}

impl ViewState {
    /// Creates a view state.
    #[inline]
    #[must_use]
    pub const fn new(pixel_size: PixelSize, world_area: Rect, transform: Affine) -> Self {
        Self {
            pixel_size,
            world_area,
            transform,
        }
    }

    /// The whole buffer in pixel coordinates.
    #[inline]
    #[must_use]
    pub fn pixel_bounds(&self) -> Rect {
        self.pixel_size.bounds()
    }

    /// World-space length of one buffer pixel.
    ///
    /// Renderers use this to skip detail too small to show. Returns infinity
    /// for a degenerate transform.
    #[must_use]
    pub fn min_resolution(&self) -> f64 {
        let det = self.transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return f64::INFINITY;
        }
        let inv = self.transform.inverse();
        (inv * Point::new(1.0, 0.0) - inv * Point::ORIGIN).hypot()
    }

    /// Smallest whole-pixel rectangle covering `world` in this view.
    ///
    /// The result is not clipped to the buffer. An empty or inverted `world`
    /// maps to [`Rect::ZERO`].
    #[must_use]
    pub fn world_to_pixels(&self, world: Rect) -> Rect {
        if geom::is_empty(world) {
            return Rect::ZERO;
        }
        self.transform.transform_rect_bbox(world).expand()
    }
}

/// Returns the whole-pixel offset that carries pixels rendered under `old`
/// onto the same world points under `new`, if there is one.
///
/// The change `new ∘ old⁻¹` must have a linear part within `epsilon` of the
/// identity and a translation within `epsilon` of whole numbers. Anything
/// else (scale, rotation, shear, sub-pixel pan, degenerate transforms) yields
/// `None`.
#[must_use]
pub fn integer_translation(old: Affine, new: Affine, epsilon: f64) -> Option<PixelOffset> {
    let det = old.determinant();
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let [a, b, c, d, e, f] = (new * old.inverse()).as_coeffs();
    let near = |v: f64, target: f64| (v - target).abs() <= epsilon;
    if !(near(a, 1.0) && near(b, 0.0) && near(c, 0.0) && near(d, 1.0)) {
        return None;
    }
    let (rx, ry) = (e.round(), f.round());
    if !(near(e, rx) && near(f, ry)) {
        return None;
    }
    Some(PixelOffset::new(to_i32(rx)?, to_i32(ry)?))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "range checked before the cast"
)]
fn to_i32(v: f64) -> Option<i32> {
    (v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX)).then_some(v as i32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
