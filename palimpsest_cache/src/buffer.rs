// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cached pixel buffer and the raw pixel moves the cache needs.
//!
//! Everything here works on whole pixels of premultiplied RGBA8 data, so
//! shifts and copies are bit-exact.

use kurbo::Rect;
use palimpsest_core::view::{PixelOffset, PixelSize};
use tiny_skia::{Color, IntRect, Mask, Pixmap, PixmapMut};

const BYTES_PER_PIXEL: usize = 4;

/// Error returned when a buffer cannot be allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot allocate a {}x{} pixel buffer", .0.width, .0.height)]
pub struct AllocError(pub PixelSize);

/// An owned RGBA8 pixel buffer.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    pixmap: Pixmap,
}

impl core::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Allocates a transparent buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] for an empty or oversized `size`.
    pub fn new(size: PixelSize) -> Result<Self, AllocError> {
        Pixmap::new(size.width, size.height)
            .map(|pixmap| Self { pixmap })
            .ok_or(AllocError(size))
    }

    /// Buffer dimensions.
    #[inline]
    #[must_use]
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.pixmap.width(), self.pixmap.height())
    }

    /// The underlying pixmap.
    #[inline]
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// The underlying pixmap, mutably.
    #[inline]
    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Fills every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        self.pixmap.fill(color);
    }

    /// Fills the given whole-pixel rectangles with `color`, replacing what
    /// was there. Rectangles are clipped to the buffer.
    pub fn fill_rects(&mut self, rects: impl IntoIterator<Item = Rect>, color: Color) {
        let c = color.premultiply().to_color_u8();
        let px = [c.red(), c.green(), c.blue(), c.alpha()];
        let size = self.size();
        let stride = size.width as usize * BYTES_PER_PIXEL;
        let data = self.pixmap.data_mut();
        for r in rects {
            let Some(span) = PixelSpan::clipped(r, size) else {
                continue;
            };
            for y in span.y0..span.y1 {
                let row = &mut data[y * stride + span.x0 * BYTES_PER_PIXEL
                    ..y * stride + span.x1 * BYTES_PER_PIXEL];
                for chunk in row.chunks_exact_mut(BYTES_PER_PIXEL) {
                    chunk.copy_from_slice(&px);
                }
            }
        }
    }

    /// Moves the content by `offset` in place.
    ///
    /// Pixels shifted past an edge are lost; pixels uncovered at the opposite
    /// edge keep their previous values and are expected to be redrawn.
    pub fn shift(&mut self, offset: PixelOffset) {
        let size = self.size();
        let (w, h) = (size.width as usize, size.height as usize);
        let adx = offset.dx.unsigned_abs() as usize;
        let ady = offset.dy.unsigned_abs() as usize;
        if (adx == 0 && ady == 0) || adx >= w || ady >= h {
            return;
        }

        let stride = w * BYTES_PER_PIXEL;
        let run = (w - adx) * BYTES_PER_PIXEL;
        let (src_x, dst_x) = if offset.dx >= 0 { (0, adx) } else { (adx, 0) };
        let data = self.pixmap.data_mut();
        let mut move_row = |src_y: usize, dst_y: usize| {
            let src = src_y * stride + src_x * BYTES_PER_PIXEL;
            let dst = dst_y * stride + dst_x * BYTES_PER_PIXEL;
            data.copy_within(src..src + run, dst);
        };

        // Walk rows away from the direction of motion so no source row is
        // overwritten before it is read.
        if offset.dy >= 0 {
            for dst_y in (ady..h).rev() {
                move_row(dst_y - ady, dst_y);
            }
        } else {
            for dst_y in 0..h - ady {
                move_row(dst_y + ady, dst_y);
            }
        }
    }

    /// Copies the pixels inside `clip` to the same position in `target`.
    ///
    /// `clip` is clipped to both buffers. Returns the number of pixels copied.
    pub fn copy_to(&self, target: &mut PixmapMut<'_>, clip: IntRect) -> u64 {
        let src_size = self.size();
        let dst_size = PixelSize::new(target.width(), target.height());
        let bounds = Rect::new(
            f64::from(clip.x()),
            f64::from(clip.y()),
            f64::from(clip.x()) + f64::from(clip.width()),
            f64::from(clip.y()) + f64::from(clip.height()),
        );
        let Some(span) = PixelSpan::clipped(bounds, src_size)
            .and_then(|s| PixelSpan::clipped(s.to_rect(), dst_size))
        else {
            return 0;
        };

        let src_stride = src_size.width as usize * BYTES_PER_PIXEL;
        let dst_stride = dst_size.width as usize * BYTES_PER_PIXEL;
        let run = (span.x1 - span.x0) * BYTES_PER_PIXEL;
        let src = self.pixmap.data();
        let dst = target.data_mut();
        for y in span.y0..span.y1 {
            let s = y * src_stride + span.x0 * BYTES_PER_PIXEL;
            let d = y * dst_stride + span.x0 * BYTES_PER_PIXEL;
            dst[d..d + run].copy_from_slice(&src[s..s + run]);
        }
        span.area()
    }
}

/// Builds a clip mask that is fully opaque inside `rects` and transparent
/// elsewhere. Returns `None` for an empty `size`.
#[must_use]
pub fn region_mask(size: PixelSize, rects: impl IntoIterator<Item = Rect>) -> Option<Mask> {
    let mut mask = Mask::new(size.width, size.height)?;
    let stride = size.width as usize;
    let data = mask.data_mut();
    for r in rects {
        let Some(span) = PixelSpan::clipped(r, size) else {
            continue;
        };
        for y in span.y0..span.y1 {
            data[y * stride + span.x0..y * stride + span.x1].fill(u8::MAX);
        }
    }
    Some(mask)
}

/// A non-empty whole-pixel rectangle inside a buffer, as row and column
/// index ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PixelSpan {
    pub(crate) x0: usize,
    pub(crate) y0: usize,
    pub(crate) x1: usize,
    pub(crate) y1: usize,
}

impl PixelSpan {
    /// Rounds `r` outward to whole pixels and clips it to `size`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "values are clamped to the buffer size first"
    )]
    pub(crate) fn clipped(r: Rect, size: PixelSize) -> Option<Self> {
        let clamp = |v: f64, max: u32| v.clamp(0.0, f64::from(max)) as usize;
        let r = r.expand();
        let span = Self {
            x0: clamp(r.x0, size.width),
            y0: clamp(r.y0, size.height),
            x1: clamp(r.x1, size.width),
            y1: clamp(r.y1, size.height),
        };
        (span.x0 < span.x1 && span.y0 < span.y1).then_some(span)
    }

    pub(crate) fn to_rect(self) -> Rect {
        Rect::new(self.x0 as f64, self.y0 as f64, self.x1 as f64, self.y1 as f64)
    }

    pub(crate) fn area(self) -> u64 {
        ((self.x1 - self.x0) * (self.y1 - self.y0)) as u64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
