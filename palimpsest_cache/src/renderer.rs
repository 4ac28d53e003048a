// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene renderer seam.
//!
//! The cache never interprets the scene. It hands a [`Surface`] to a
//! [`Renderer`] whenever pixels are stale and trusts it to paint the world
//! area it is told about.
//!
//! A renderer is typically a thin adapter over an application's scene:
//!
//! ```rust,ignore
//! impl Renderer for MapRenderer {
//!     fn draw(&mut self, surface: &mut Surface<'_>, world_area: Rect, min_resolution: f64)
//!         -> Result<(), RenderError>
//!     {
//!         let visible = surface.world_clip_bounds().intersect(world_area);
//!         for feature in self.map.features_in(visible) {
//!             if feature.size() >= min_resolution {
//!                 surface.fill_path(&feature.path, feature.color);
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use kurbo::Rect;

use crate::surface::Surface;

/// Error reported by a [`Renderer`].
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer gave a reason.
    #[error("render failed: {0}")]
    Message(String),
    /// The renderer forwarded an underlying error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RenderError {
    /// Creates a [`RenderError::Message`].
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Paints the scene into a cache surface.
pub trait Renderer {
    /// Paints the scene.
    ///
    /// `world_area` is the whole world area shown by the buffer, even when
    /// the surface is clipped to a smaller stale region; drawing outside the
    /// clip is discarded. `min_resolution` is the world-space size of one
    /// pixel.
    ///
    /// # Errors
    ///
    /// Any error is logged and counted by the cache. The pixels concerned are
    /// still treated as valid afterwards.
    fn draw(
        &mut self,
        surface: &mut Surface<'_>,
        world_area: Rect,
        min_resolution: f64,
    ) -> Result<(), RenderError>;
}

impl<F> Renderer for F
where
    F: FnMut(&mut Surface<'_>, Rect, f64) -> Result<(), RenderError>,
{
    fn draw(
        &mut self,
        surface: &mut Surface<'_>,
        world_area: Rect,
        min_resolution: f64,
    ) -> Result<(), RenderError> {
        self(surface, world_area, min_resolution)
    }
}
