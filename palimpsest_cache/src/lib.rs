// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental pixel cache for a pannable, zoomable view of a 2D scene.
//!
//! A [`ViewCache`] keeps the last rendering of a scene and, for each new view
//! request, redraws only what it must:
//!
//! - a whole-pixel pan moves the existing pixels and renders the exposed
//!   strips;
//! - a scene change in a known world area re-renders that area, clipped;
//! - zooms, rotations, sub-pixel pans and resizes render everything.
//!
//! The scene is painted by a [`Renderer`] through a [`Surface`] that
//! enforces the clip. Scene changes arrive through a
//! [`ChangeFeed`](palimpsest_core::change::ChangeFeed) the cache subscribes
//! to.
//!
//! ```rust,ignore
//! let feed = ChangeFeed::new();
//! let mut cache = ViewCache::new(map_renderer, &feed);
//! cache.draw(&mut window.as_mut(), damage, size, world_area, transform);
//!
//! feed.notify(Rect::new(120.0, 40.0, 160.0, 80.0));
//! cache.draw(&mut window.as_mut(), damage, size, world_area, transform);
//! ```
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Forwards cache events to an installed
//!   [`TraceSink`](palimpsest_core::trace::TraceSink).
//! - `trace-rich` (disabled by default, implies `trace`): Also reports each
//!   stale rectangle before it is redrawn.

mod brush;
mod buffer;
mod cache;
mod config;
mod renderer;
mod surface;

pub use brush::{CacheBrush, CachedImage};
pub use buffer::{AllocError, PixelBuffer, region_mask};
pub use cache::{CacheStats, ViewCache};
pub use config::{ConfigError, ViewCacheConfig};
pub use renderer::{RenderError, Renderer};
pub use surface::{Surface, to_skia_rect, to_skia_transform};
