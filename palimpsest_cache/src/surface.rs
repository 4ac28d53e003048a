// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawing target handed to a [`Renderer`](crate::Renderer).

use kurbo::{Affine, Rect};
use palimpsest_core::rect_set::RectSet;
use palimpsest_core::view::PixelSize;
use tiny_skia::{
    Color, FillRule, Mask, Paint, Path, Pixmap, PixmapMut, Stroke, Transform,
};

/// Converts a kurbo affine transform to its tiny-skia equivalent.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32"
)]
pub fn to_skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Converts a kurbo rectangle to its tiny-skia equivalent, or `None` if it is
/// empty, inverted or not finite.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32"
)]
pub fn to_skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(
        rect.x0 as f32,
        rect.y0 as f32,
        rect.x1 as f32,
        rect.y1 as f32,
    )
}

/// A pixel buffer, the world-to-pixel transform, and an optional clip.
///
/// Every drawing helper honors the clip. A renderer that needs drawing
/// operations not offered here can use [`Surface::pixmap_mut`] with
/// [`Surface::clip_mask`] and [`Surface::skia_transform`].
pub struct Surface<'a> {
    pixmap: &'a mut Pixmap,
    transform: Affine,
    clip_region: Option<&'a RectSet>,
    clip_mask: Option<&'a Mask>,
}

impl core::fmt::Debug for Surface<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Surface")
            .field("size", &self.size())
            .field("transform", &self.transform)
            .field("clip_region", &self.clip_region)
            .finish_non_exhaustive()
    }
}

impl<'a> Surface<'a> {
    /// Creates an unclipped surface.
    #[must_use]
    pub fn new(pixmap: &'a mut Pixmap, transform: Affine) -> Self {
        Self {
            pixmap,
            transform,
            clip_region: None,
            clip_mask: None,
        }
    }

    /// Creates a surface clipped to `region`, with `mask` its rasterized
    /// form.
    #[must_use]
    pub fn clipped(
        pixmap: &'a mut Pixmap,
        transform: Affine,
        region: &'a RectSet,
        mask: &'a Mask,
    ) -> Self {
        Self {
            pixmap,
            transform,
            clip_region: Some(region),
            clip_mask: Some(mask),
        }
    }
}

impl Surface<'_> {
    /// Buffer dimensions.
    #[inline]
    #[must_use]
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.pixmap.width(), self.pixmap.height())
    }

    /// World-to-pixel transform.
    #[inline]
    #[must_use]
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// [`Surface::transform`] in tiny-skia form.
    #[inline]
    #[must_use]
    pub fn skia_transform(&self) -> Transform {
        to_skia_transform(self.transform)
    }

    /// The clip region in buffer pixels, or `None` when unclipped.
    #[inline]
    #[must_use]
    pub fn clip_region(&self) -> Option<&RectSet> {
        self.clip_region
    }

    /// The clip as a tiny-skia mask, or `None` when unclipped.
    #[inline]
    #[must_use]
    pub fn clip_mask(&self) -> Option<&Mask> {
        self.clip_mask
    }

    /// Bounding box of the drawable pixels.
    #[must_use]
    pub fn clip_bounds(&self) -> Rect {
        let full = self.size().bounds();
        match self.clip_region {
            Some(region) => region.bounds().map_or(Rect::ZERO, |b| b.intersect(full)),
            None => full,
        }
    }

    /// World-space bounding box of the drawable pixels.
    ///
    /// Renderers can skip scene content outside it.
    #[must_use]
    pub fn world_clip_bounds(&self) -> Rect {
        let det = self.transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return Rect::ZERO;
        }
        self.transform
            .inverse()
            .transform_rect_bbox(self.clip_bounds())
    }

    /// Raw access to the pixels. Drawing through it bypasses the clip unless
    /// the caller applies [`Surface::clip_mask`].
    pub fn pixmap_mut(&mut self) -> PixmapMut<'_> {
        self.pixmap.as_mut()
    }

    /// Fills a world-space rectangle.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(rect) = to_skia_rect(rect) else {
            return;
        };
        let paint = solid(color);
        let transform = self.skia_transform();
        self.pixmap
            .fill_rect(rect, &paint, transform, self.clip_mask);
    }

    /// Fills a world-space path.
    pub fn fill_path(&mut self, path: &Path, color: Color) {
        let paint = solid(color);
        let transform = self.skia_transform();
        self.pixmap
            .fill_path(path, &paint, FillRule::Winding, transform, self.clip_mask);
    }

    /// Strokes a world-space path. Stroke width is in world units.
    pub fn stroke_path(&mut self, path: &Path, stroke: &Stroke, color: Color) {
        let paint = solid(color);
        let transform = self.skia_transform();
        self.pixmap
            .stroke_path(path, &paint, stroke, transform, self.clip_mask);
    }
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = false;
    paint
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
