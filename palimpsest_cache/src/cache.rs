// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The view cache itself.
//!
//! [`ViewCache`] owns one pixel buffer, the [`ViewTracker`] describing it and
//! a subscription to the scene's [`ChangeFeed`]. Every public operation
//! first drains pending scene changes, so they are mapped to pixels with the
//! view that was on screen when they happened.
//!
//! A frame normally goes through [`ViewCache::draw`]:
//!
//! ```text
//!   pump_changes ──► update_cache ──► ensure_valid ──► copy to target
//!                    (reuse/shift)    (render stale)
//! ```

use std::time::{Duration, Instant};

use kurbo::{Affine, Rect};
use palimpsest_core::change::{ChangeFeed, ChangeSubscription, SceneChange};
use palimpsest_core::trace::{
    ReconcileEvent, RedrawEvent, RedrawKind, RenderFailureEvent, SceneChangeEvent, TraceSink,
    Tracer,
};
use palimpsest_core::tracker::{ChangeEffect, ReconcileOutcome, ViewTracker};
use palimpsest_core::validity::Validity;
use palimpsest_core::view::{PixelOffset, PixelSize, ViewState};
use tiny_skia::{IntRect, PixmapMut};

use crate::brush::{CacheBrush, CachedImage};
use crate::buffer::{PixelBuffer, PixelSpan, region_mask};
use crate::config::{ConfigError, ViewCacheConfig};
use crate::renderer::Renderer;
use crate::surface::Surface;

/// Running counters kept by a [`ViewCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// View requests reconciled.
    pub reconciliations: u64,
    /// Requests served by moving pixels.
    pub shifts: u64,
    /// Redraws of the whole buffer.
    pub full_redraws: u64,
    /// Redraws clipped to a stale region.
    pub partial_redraws: u64,
    /// Redraws whose renderer reported an error.
    pub render_failures: u64,
    /// Pixels carried over by shifts instead of being redrawn.
    pub reused_pixels: u64,
    /// Scene change notifications folded in.
    pub scene_changes: u64,
}

/// An incrementally maintained rendering of a scene for a movable view.
///
/// The cache is single-threaded: it holds an `Rc`-based subscription and is
/// not `Send`.
pub struct ViewCache<R: Renderer> {
    renderer: R,
    config: ViewCacheConfig,
    tracker: ViewTracker,
    buffer: Option<PixelBuffer>,
    subscription: ChangeSubscription,
    generation: u64,
    stats: CacheStats,
    trace_sink: Option<Box<dyn TraceSink>>,
    epoch: Instant,
}

impl<R: Renderer> core::fmt::Debug for ViewCache<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ViewCache")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .field("buffer", &self.buffer)
            .field("generation", &self.generation)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<R: Renderer> ViewCache<R> {
    /// Creates an empty cache with the default configuration, subscribed to
    /// `feed`.
    #[must_use]
    pub fn new(renderer: R, feed: &ChangeFeed) -> Self {
        Self::from_parts(renderer, feed, ViewCacheConfig::new(), ViewTracker::default())
    }

    /// Creates an empty cache with `config`, subscribed to `feed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` does not validate.
    pub fn with_config(
        renderer: R,
        feed: &ChangeFeed,
        config: ViewCacheConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let tracker = ViewTracker::new(config.max_stale_rects, config.translation_epsilon)?;
        Ok(Self::from_parts(renderer, feed, config, tracker))
    }

    fn from_parts(
        renderer: R,
        feed: &ChangeFeed,
        config: ViewCacheConfig,
        tracker: ViewTracker,
    ) -> Self {
        Self {
            renderer,
            config,
            tracker,
            buffer: None,
            subscription: feed.subscribe(),
            generation: 0,
            stats: CacheStats::default(),
            trace_sink: None,
            epoch: Instant::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Which cached pixels are stale.
    ///
    /// Notifications sent through the change feed stay queued until the next
    /// cache operation or [`ViewCache::pump_changes`], so right after
    /// `notify` this still reports the earlier state.
    #[inline]
    #[must_use]
    pub fn validity(&self) -> &Validity {
        self.tracker.validity()
    }

    /// The view the buffer was last reconciled with.
    #[inline]
    #[must_use]
    pub fn view_state(&self) -> Option<&ViewState> {
        self.tracker.view()
    }

    /// Counter bumped whenever the buffer content changes.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Running counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// The configuration in use.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ViewCacheConfig {
        &self.config
    }

    /// The scene renderer.
    #[inline]
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The scene renderer, mutably. Changes to what it draws still have to
    /// be announced through the change feed.
    #[inline]
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Installs a sink for trace events, replacing any previous one.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace_sink = Some(sink);
    }

    /// Removes and returns the trace sink.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.trace_sink.take()
    }

    // -----------------------------------------------------------------------
    // Scene changes
    // -----------------------------------------------------------------------

    /// Folds every queued scene change into the stale region and returns how
    /// many there were.
    pub fn pump_changes(&mut self) -> usize {
        let changes = self.subscription.drain();
        let count = changes.len();
        for change in changes {
            self.scene_changed(change);
        }
        count
    }

    /// Folds one scene change into the stale region.
    ///
    /// This is what [`ViewCache::pump_changes`] does for each queued change;
    /// callers that deliver notifications themselves can call it directly.
    pub fn scene_changed(&mut self, change: SceneChange) -> ChangeEffect {
        let effect = self.tracker.scene_changed(change);
        self.stats.scene_changes += 1;
        let region = match change {
            SceneChange::Everything => None,
            SceneChange::Region(r) => Some(r),
        };
        tracing::trace!(?region, ?effect, "scene change");
        let event = SceneChangeEvent {
            timestamp_us: self.now_us(),
            generation: self.generation,
            region,
            effect,
        };
        tracer(&mut self.trace_sink).scene_change(&event);
        effect
    }

    /// Marks every cached pixel stale without going through the change feed.
    ///
    /// Use this after reconfiguring the renderer through
    /// [`ViewCache::renderer_mut`] when no scene change will be announced.
    pub fn invalidate_all(&mut self) {
        self.tracker.invalidate_all();
        tracing::debug!(generation = self.generation, "cache invalidated");
    }

    // -----------------------------------------------------------------------
    // Reconciliation and redraw
    // -----------------------------------------------------------------------

    /// Brings the buffer to the requested view, reusing pixels where the
    /// change is a whole-pixel pan. Stale pixels are not redrawn yet.
    pub fn update_cache(
        &mut self,
        pixel_size: PixelSize,
        world_area: Rect,
        transform: Affine,
    ) -> ReconcileOutcome {
        self.pump_changes();
        let outcome = self
            .tracker
            .reconcile(ViewState::new(pixel_size, world_area, transform));
        self.stats.reconciliations += 1;

        match outcome {
            ReconcileOutcome::Resized => self.reallocate(pixel_size),
            ReconcileOutcome::Shifted(offset) => self.shift(offset),
            ReconcileOutcome::Unchanged
            | ReconcileOutcome::Invalidated
            | ReconcileOutcome::StillInvalid => {}
        }

        let validity = self.tracker.validity();
        let stale_rects = validity.stale_region().map_or(0, |r| saturating_u32(r.len()));
        tracing::debug!(
            ?outcome,
            width = pixel_size.width,
            height = pixel_size.height,
            stale_rects,
            "reconciled view"
        );
        let event = ReconcileEvent {
            timestamp_us: self.now_us(),
            generation: self.generation,
            outcome,
            pixel_size,
            validity: validity.kind(),
            stale_rects,
        };
        tracer(&mut self.trace_sink).reconcile(&event);
        outcome
    }

    fn reallocate(&mut self, size: PixelSize) {
        self.buffer = if size.is_empty() {
            None
        } else {
            match PixelBuffer::new(size) {
                Ok(buffer) => Some(buffer),
                Err(err) => {
                    tracing::warn!(%err, "running without a cache buffer");
                    None
                }
            }
        };
        self.generation += 1;
    }

    fn shift(&mut self, offset: PixelOffset) {
        if offset == PixelOffset::ZERO {
            return;
        }
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        buffer.shift(offset);
        let size = buffer.size();
        let kept_w = u64::from(size.width).saturating_sub(u64::from(offset.dx.unsigned_abs()));
        let kept_h = u64::from(size.height).saturating_sub(u64::from(offset.dy.unsigned_abs()));
        self.stats.shifts += 1;
        self.stats.reused_pixels += kept_w * kept_h;
        self.generation += 1;
    }

    /// Re-renders whatever is stale.
    ///
    /// Returns the kind of redraw performed, or `None` if nothing was stale
    /// or there is no buffer to draw into. A renderer error is logged and
    /// counted; the pixels are considered valid regardless.
    pub fn ensure_valid(&mut self) -> Option<RedrawKind> {
        self.pump_changes();
        if self.tracker.validity().is_all_valid() || self.buffer.is_none() {
            return None;
        }
        let view = *self.tracker.view()?;
        let stale = self.tracker.mark_valid();

        #[cfg(feature = "trace-rich")]
        if let Validity::PartiallyInvalid(region) = &stale {
            let mut tracer = tracer(&mut self.trace_sink);
            if tracer.is_active() {
                let rects: Vec<_> = region
                    .iter()
                    .map(palimpsest_core::trace::StaleRect::from)
                    .collect();
                tracer.stale_rects(self.generation, &rects);
            }
        }

        let buffer = self.buffer.as_mut()?;
        let started = self.epoch.elapsed();
        let min_resolution = view.min_resolution();
        let background = self.config.background;

        let (kind, clip_rects, pixels, result) = match &stale {
            Validity::AllValid => return None,
            Validity::AllInvalid => {
                buffer.fill(background);
                let mut surface = Surface::new(buffer.pixmap_mut(), view.transform);
                let result = self
                    .renderer
                    .draw(&mut surface, view.world_area, min_resolution);
                (RedrawKind::Full, 0, view.pixel_size.area(), result)
            }
            Validity::PartiallyInvalid(region) => {
                let size = buffer.size();
                buffer.fill_rects(region.iter(), background);
                let mask = region_mask(size, region.iter())?;
                let pixels = region
                    .iter()
                    .filter_map(|r| PixelSpan::clipped(r, size))
                    .map(PixelSpan::area)
                    .sum::<u64>();
                let mut surface =
                    Surface::clipped(buffer.pixmap_mut(), view.transform, region, &mask);
                let result = self
                    .renderer
                    .draw(&mut surface, view.world_area, min_resolution);
                (
                    RedrawKind::Partial,
                    saturating_u32(region.len()),
                    pixels,
                    result,
                )
            }
        };

        self.generation += 1;
        match kind {
            RedrawKind::Full => self.stats.full_redraws += 1,
            RedrawKind::Partial => self.stats.partial_redraws += 1,
        }
        let duration = self.epoch.elapsed().saturating_sub(started);
        tracing::debug!(?kind, clip_rects, pixels, min_resolution, "redrew stale pixels");

        let generation = self.generation;
        let mut tracer = tracer(&mut self.trace_sink);
        tracer.redraw(&RedrawEvent {
            timestamp_us: micros(started),
            duration_us: micros(duration),
            generation,
            kind,
            clip_rects,
            pixels,
            min_resolution,
        });
        if let Err(err) = result {
            self.stats.render_failures += 1;
            tracing::warn!(%err, ?kind, "renderer failed; keeping its output");
            tracer.render_failure(&RenderFailureEvent {
                timestamp_us: micros(started + duration),
                generation,
                kind,
            });
        }
        Some(kind)
    }

    /// Brings the cache up to date for the given view and copies the
    /// `output_clip` part of it to the same position in `target`.
    ///
    /// Returns the number of pixels copied.
    pub fn draw(
        &mut self,
        target: &mut PixmapMut<'_>,
        output_clip: IntRect,
        pixel_size: PixelSize,
        world_area: Rect,
        transform: Affine,
    ) -> u64 {
        self.update_cache(pixel_size, world_area, transform);
        self.ensure_valid();
        self.buffer
            .as_ref()
            .map_or(0, |buffer| buffer.copy_to(target, output_clip))
    }

    /// Brings the cache up to date for the given view and returns a brush
    /// that paints with its pixels, or `None` if the view has no area.
    pub fn cache_brush(
        &mut self,
        pixel_size: PixelSize,
        world_area: Rect,
        transform: Affine,
    ) -> Option<CacheBrush<'_>> {
        self.update_cache(pixel_size, world_area, transform);
        self.ensure_valid();
        let generation = self.generation;
        self.buffer
            .as_ref()
            .map(|buffer| CacheBrush::new(buffer.pixmap().as_ref(), generation))
    }

    /// Brings the cache up to date for the given view and returns its
    /// pixels, or `None` if the view has no area.
    pub fn cached_image(
        &mut self,
        pixel_size: PixelSize,
        world_area: Rect,
        transform: Affine,
    ) -> Option<CachedImage<'_>> {
        self.update_cache(pixel_size, world_area, transform);
        self.ensure_valid();
        let generation = self.generation;
        self.buffer
            .as_ref()
            .map(|buffer| CachedImage::new(buffer.pixmap().as_ref(), generation))
    }

    fn now_us(&self) -> u64 {
        micros(self.epoch.elapsed())
    }
}

fn tracer(sink: &mut Option<Box<dyn TraceSink>>) -> Tracer<'_> {
    match sink {
        Some(sink) => Tracer::new(&mut **sink),
        None => Tracer::none(),
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderError;

    type Fill = fn(&mut Surface<'_>, Rect, f64) -> Result<(), RenderError>;

    fn paint_black(surface: &mut Surface<'_>, area: Rect, _: f64) -> Result<(), RenderError> {
        surface.fill_rect(area, tiny_skia::Color::BLACK);
        Ok(())
    }

    fn cache() -> ViewCache<Fill> {
        ViewCache::new(paint_black as Fill, &ChangeFeed::new())
    }

    const SIZE: PixelSize = PixelSize::new(16, 8);
    const AREA: Rect = Rect::new(0.0, 0.0, 16.0, 8.0);

    #[test]
    fn first_request_allocates_and_bumps_generation() {
        let mut cache = cache();
        assert_eq!(cache.generation(), 0);
        let outcome = cache.update_cache(SIZE, AREA, Affine::IDENTITY);
        assert_eq!(outcome, ReconcileOutcome::Resized);
        assert_eq!(cache.generation(), 1);
        assert!(cache.validity().is_all_invalid());
        assert_eq!(cache.ensure_valid(), Some(RedrawKind::Full));
        assert_eq!(cache.generation(), 2);
        assert_eq!(cache.ensure_valid(), None);
    }

    #[test]
    fn empty_view_has_no_buffer() {
        let mut cache = cache();
        let image = cache.cached_image(PixelSize::new(0, 8), AREA, Affine::IDENTITY);
        assert!(image.is_none());
        assert_eq!(cache.stats().full_redraws, 0);
    }

    #[test]
    fn shift_counts_reused_pixels() {
        let mut cache = cache();
        cache.update_cache(SIZE, AREA, Affine::IDENTITY);
        cache.ensure_valid();
        let outcome = cache.update_cache(SIZE, AREA, Affine::translate((-2.0, 1.0)));
        assert_eq!(outcome, ReconcileOutcome::Shifted(PixelOffset::new(-2, 1)));
        assert_eq!(cache.stats().shifts, 1);
        assert_eq!(cache.stats().reused_pixels, 14 * 7);
    }

    #[test]
    fn bad_config_is_rejected() {
        let config = ViewCacheConfig::new().with_max_stale_rects(0);
        let err = ViewCache::with_config(paint_black as Fill, &ChangeFeed::new(), config)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Capacity(_)), "got {err:?}");
    }
}
