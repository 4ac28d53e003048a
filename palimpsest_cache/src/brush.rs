// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Borrowed views of an up-to-date cache buffer.
//!
//! Both handles borrow the cache, so they cannot outlive the next call that
//! may change its pixels. Each carries the buffer generation it was taken
//! at; callers that keep derived data (a composited frame, an uploaded
//! texture) can compare generations to tell whether it is still current.

use tiny_skia::{FilterQuality, Paint, Pattern, PixmapRef, Shader, SpreadMode, Transform};

/// A read-only view of the cache buffer.
#[derive(Clone, Copy, Debug)]
pub struct CachedImage<'a> {
    pixmap: PixmapRef<'a>,
    generation: u64,
}

impl<'a> CachedImage<'a> {
    pub(crate) fn new(pixmap: PixmapRef<'a>, generation: u64) -> Self {
        Self { pixmap, generation }
    }

    /// The cached pixels.
    #[inline]
    #[must_use]
    pub fn pixmap(&self) -> PixmapRef<'a> {
        self.pixmap
    }

    /// Buffer generation the pixels belong to.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A fill source tiled from the cache buffer.
///
/// Painting an area with the brush restores the cached view there, which is
/// how transient overlays are erased without re-rendering the scene. The
/// pattern repeats with the buffer origin at pixel `(0, 0)`.
#[derive(Clone, Debug)]
pub struct CacheBrush<'a> {
    shader: Shader<'a>,
    generation: u64,
}

impl<'a> CacheBrush<'a> {
    pub(crate) fn new(pixmap: PixmapRef<'a>, generation: u64) -> Self {
        let shader = Pattern::new(
            pixmap,
            SpreadMode::Repeat,
            FilterQuality::Nearest,
            1.0,
            Transform::identity(),
        );
        Self { shader, generation }
    }

    /// The tiling shader.
    #[inline]
    #[must_use]
    pub fn shader(&self) -> &Shader<'a> {
        &self.shader
    }

    /// A paint that fills with the cached pixels.
    #[must_use]
    pub fn paint(&self) -> Paint<'a> {
        Paint {
            shader: self.shader.clone(),
            anti_alias: false,
            ..Paint::default()
        }
    }

    /// Buffer generation the pattern was taken from.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
