// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View cache configuration.

use palimpsest_core::rect_set::{CapacityError, DEFAULT_MAX_SIZE, RectSet};
use palimpsest_core::view::DEFAULT_TRANSLATION_EPSILON;
use tiny_skia::Color;

/// Error returned by [`ViewCacheConfig::validate`].
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The stale region capacity is 0 or 1.
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    /// The translation tolerance is negative or not finite.
    #[error("translation epsilon must be finite and non-negative (got {0})")]
    Epsilon(f64),
}

/// Tuning knobs for a [`ViewCache`](crate::ViewCache).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewCacheConfig {
    /// Most rectangles the stale region may hold before it collapses to its
    /// bounding box. Must be greater than 1.
    pub max_stale_rects: usize,
    /// Color stale pixels are cleared to before the renderer runs.
    pub background: Color,
    /// Tolerance for treating a view change as a whole-pixel pan.
    pub translation_epsilon: f64,
}

impl Default for ViewCacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCacheConfig {
    /// Default configuration: 32 stale rectangles, white background, and a
    /// 2e-6 pixel translation tolerance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_stale_rects: DEFAULT_MAX_SIZE,
            background: Color::WHITE,
            translation_epsilon: DEFAULT_TRANSLATION_EPSILON,
        }
    }

    /// Configuration for scenes whose changes are scattered widely, where
    /// tracking many small rectangles costs more than it saves.
    #[must_use]
    pub const fn coarse() -> Self {
        Self {
            max_stale_rects: 4,
            ..Self::new()
        }
    }

    /// Returns a copy with a different stale region capacity.
    #[must_use]
    pub const fn with_max_stale_rects(mut self, max_stale_rects: usize) -> Self {
        self.max_stale_rects = max_stale_rects;
        self
    }

    /// Returns a copy with a different background color.
    #[must_use]
    pub const fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Returns a copy with a different translation tolerance.
    #[must_use]
    pub const fn with_translation_epsilon(mut self, translation_epsilon: f64) -> Self {
        self.translation_epsilon = translation_epsilon;
        self
    }

    /// Checks that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        RectSet::with_max_size(self.max_stale_rects)?;
        if !self.translation_epsilon.is_finite() || self.translation_epsilon < 0.0 {
            return Err(ConfigError::Epsilon(self.translation_epsilon));
        }
        Ok(())
    }
}
