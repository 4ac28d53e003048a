// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the view cache.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! cache calls as it reconciles views, absorbs scene changes and redraws.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Timestamps are microseconds since the emitting cache was created; the
//! `generation` field is the buffer generation after the event.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`StaleRect`] events plus the
//!   corresponding `TraceSink` method.

use kurbo::Rect;

use crate::tracker::{ChangeEffect, ReconcileOutcome};
use crate::validity::ValidityKind;
use crate::view::PixelSize;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether a redraw covered the whole buffer or only its stale region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RedrawKind {
    /// Whole buffer, no clip.
    Full,
    /// Clipped to the stale region.
    Partial,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted after a view request has been reconciled with the cached view.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileEvent {
    /// Microseconds since the cache was created.
    pub timestamp_us: u64,
    /// Buffer generation after reconciliation.
    pub generation: u64,
    /// What the reconciliation decided.
    pub outcome: ReconcileOutcome,
    /// Requested buffer size.
    pub pixel_size: PixelSize,
    /// Validity after reconciliation.
    pub validity: ValidityKind,
    /// Number of rectangles in the stale region (0 unless partially invalid).
    pub stale_rects: u32,
}

/// Emitted after the renderer has been asked to repaint stale pixels.
#[derive(Clone, Copy, Debug)]
pub struct RedrawEvent {
    /// Microseconds since the cache was created, at the start of the redraw.
    pub timestamp_us: u64,
    /// How long the redraw took, in microseconds.
    pub duration_us: u64,
    /// Buffer generation after the redraw.
    pub generation: u64,
    /// Full or clipped redraw.
    pub kind: RedrawKind,
    /// Number of clip rectangles (0 for a full redraw).
    pub clip_rects: u32,
    /// Pixels inside the clip.
    pub pixels: u64,
    /// World-space size of one pixel passed to the renderer.
    pub min_resolution: f64,
}

/// Emitted when a scene change notification has been folded in.
#[derive(Clone, Copy, Debug)]
pub struct SceneChangeEvent {
    /// Microseconds since the cache was created.
    pub timestamp_us: u64,
    /// Buffer generation when the change arrived.
    pub generation: u64,
    /// Changed world area, or `None` for "everything".
    pub region: Option<Rect>,
    /// Effect on the cache.
    pub effect: ChangeEffect,
}

/// Emitted when the renderer reports a failure.
///
/// The affected pixels are still considered valid afterwards.
#[derive(Clone, Copy, Debug)]
pub struct RenderFailureEvent {
    /// Microseconds since the cache was created.
    pub timestamp_us: u64,
    /// Buffer generation after the failed redraw.
    pub generation: u64,
    /// The redraw that failed.
    pub kind: RedrawKind,
}

/// An axis-aligned stale rectangle in buffer pixels.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaleRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

#[cfg(feature = "trace-rich")]
impl From<Rect> for StaleRect {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "stale rects are whole pixels inside a u32-sized buffer"
    )]
    fn from(r: Rect) -> Self {
        Self {
            x: r.x0 as i32,
            y: r.y0 as i32,
            width: r.width().max(0.0) as u32,
            height: r.height().max(0.0) as u32,
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from a view cache.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a view request has been reconciled.
    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        _ = e;
    }

    /// Called after a redraw.
    fn on_redraw(&mut self, e: &RedrawEvent) {
        _ = e;
    }

    /// Called after a scene change has been folded in.
    fn on_scene_change(&mut self, e: &SceneChangeEvent) {
        _ = e;
    }

    /// Called when the renderer fails.
    fn on_render_failure(&mut self, e: &RenderFailureEvent) {
        _ = e;
    }

    /// Called with the stale region about to be redrawn (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_stale_rects(&mut self, generation: u64, rects: &[StaleRect]) {
        _ = (generation, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Returns `true` if events reach a sink.
    ///
    /// Lets callers skip building expensive event payloads.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`ReconcileEvent`].
    #[inline]
    pub fn reconcile(&mut self, e: &ReconcileEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_reconcile(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RedrawEvent`].
    #[inline]
    pub fn redraw(&mut self, e: &RedrawEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_redraw(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`SceneChangeEvent`].
    #[inline]
    pub fn scene_change(&mut self, e: &SceneChangeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_scene_change(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderFailureEvent`].
    #[inline]
    pub fn render_failure(&mut self, e: &RenderFailureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_failure(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits stale rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn stale_rects(&mut self, generation: u64, rects: &[StaleRect]) {
        if let Some(s) = &mut self.sink {
            s.on_stale_rects(generation, rects);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::PixelOffset;

    fn sample_reconcile() -> ReconcileEvent {
        ReconcileEvent {
            timestamp_us: 1_000,
            generation: 3,
            outcome: ReconcileOutcome::Shifted(PixelOffset::new(-5, 0)),
            pixel_size: PixelSize::new(100, 100),
            validity: ValidityKind::PartiallyInvalid,
            stale_rects: 1,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_reconcile(&sample_reconcile());
        sink.on_scene_change(&SceneChangeEvent {
            timestamp_us: 0,
            generation: 0,
            region: None,
            effect: ChangeEffect::InvalidatedAll,
        });
        sink.on_render_failure(&RenderFailureEvent {
            timestamp_us: 0,
            generation: 0,
            kind: RedrawKind::Full,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_active());
        tracer.reconcile(&sample_reconcile());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            generations: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_reconcile(&mut self, e: &ReconcileEvent) {
                self.generations.push(e.generation);
            }
        }

        let mut sink = RecordingSink {
            generations: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        assert!(tracer.is_active());
        tracer.reconcile(&sample_reconcile());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.generations, &[3]);
    }

    #[cfg(feature = "trace-rich")]
    #[test]
    fn stale_rect_from_pixel_rect() {
        let r = StaleRect::from(Rect::new(95.0, 0.0, 100.0, 100.0));
        assert_eq!(
            r,
            StaleRect {
                x: 95,
                y: 0,
                width: 5,
                height: 100,
            }
        );
    }
}
