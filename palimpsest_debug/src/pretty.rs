// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] writes one line per event, prefixed with a bracketed
//! tag and the event timestamp:
//!
//! ```text
//! [reconcile]     1203us gen=3 Shifted(dx=-5, dy=0) 100x100 PartiallyInvalid rects=1
//! [stale]                gen=3 count=1 area=500
//! [redraw]        1210us gen=4 Partial rects=1 px=500 res=1 took=84us
//! ```

use std::io::{self, Write};

use kurbo::Rect;
use palimpsest_core::trace::{
    ReconcileEvent, RedrawEvent, RenderFailureEvent, SceneChangeEvent, StaleRect, TraceSink,
};
use palimpsest_core::tracker::ReconcileOutcome;

/// A [`TraceSink`] that prints events as text.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    out: W,
}

impl<W: Write> core::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that prints to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(io::stderr()))
    }

    /// Creates a sink that prints to a boxed writer.
    #[must_use]
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that prints to `out`.
    #[must_use]
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn outcome(o: ReconcileOutcome) -> String {
    match o {
        ReconcileOutcome::Shifted(off) => format!("Shifted(dx={}, dy={})", off.dx, off.dy),
        other => format!("{other:?}"),
    }
}

fn region(r: Option<Rect>) -> String {
    match r {
        Some(r) => format!("({},{})-({},{})", r.x0, r.y0, r.x1, r.y1),
        None => "everything".into(),
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        let _ = writeln!(
            self.out,
            "[reconcile] {:>10}us gen={} {} {}x{} {:?} rects={}",
            e.timestamp_us,
            e.generation,
            outcome(e.outcome),
            e.pixel_size.width,
            e.pixel_size.height,
            e.validity,
            e.stale_rects,
        );
    }

    fn on_redraw(&mut self, e: &RedrawEvent) {
        let _ = writeln!(
            self.out,
            "[redraw]    {:>10}us gen={} {:?} rects={} px={} res={} took={}us",
            e.timestamp_us,
            e.generation,
            e.kind,
            e.clip_rects,
            e.pixels,
            e.min_resolution,
            e.duration_us,
        );
    }

    fn on_scene_change(&mut self, e: &SceneChangeEvent) {
        let _ = writeln!(
            self.out,
            "[change]    {:>10}us gen={} {} {:?}",
            e.timestamp_us,
            e.generation,
            region(e.region),
            e.effect,
        );
    }

    fn on_render_failure(&mut self, e: &RenderFailureEvent) {
        let _ = writeln!(
            self.out,
            "[failure]   {:>10}us gen={} {:?} redraw failed",
            e.timestamp_us, e.generation, e.kind,
        );
    }

    fn on_stale_rects(&mut self, generation: u64, rects: &[StaleRect]) {
        let area: u64 = rects
            .iter()
            .map(|r| u64::from(r.width) * u64::from(r.height))
            .sum();
        let _ = writeln!(
            self.out,
            "[stale]                gen={generation} count={} area={area}",
            rects.len(),
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_core::trace::RedrawKind;
    use palimpsest_core::tracker::ChangeEffect;
    use palimpsest_core::validity::ValidityKind;
    use palimpsest_core::view::{PixelOffset, PixelSize};

    fn printed(f: impl FnOnce(&mut PrettyPrintSink<Vec<u8>>)) -> String {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        f(&mut sink);
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn reconcile_line_shows_offset() {
        let text = printed(|s| {
            s.on_reconcile(&ReconcileEvent {
                timestamp_us: 1_203,
                generation: 3,
                outcome: ReconcileOutcome::Shifted(PixelOffset::new(-5, 0)),
                pixel_size: PixelSize::new(100, 100),
                validity: ValidityKind::PartiallyInvalid,
                stale_rects: 1,
            });
        });
        assert!(text.starts_with("[reconcile]"), "{text}");
        assert!(text.contains("Shifted(dx=-5, dy=0)"), "{text}");
        assert!(text.contains("100x100 PartiallyInvalid rects=1"), "{text}");
    }

    #[test]
    fn change_line_names_region() {
        let text = printed(|s| {
            s.on_scene_change(&SceneChangeEvent {
                timestamp_us: 5,
                generation: 0,
                region: Some(Rect::new(1.0, 2.0, 3.0, 4.0)),
                effect: ChangeEffect::Extended,
            });
            s.on_scene_change(&SceneChangeEvent {
                timestamp_us: 6,
                generation: 0,
                region: None,
                effect: ChangeEffect::InvalidatedAll,
            });
        });
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("(1,2)-(3,4) Extended"), "{text}");
        assert!(lines[1].ends_with("everything InvalidatedAll"), "{text}");
    }

    #[test]
    fn redraw_and_failure_lines() {
        let text = printed(|s| {
            s.on_redraw(&RedrawEvent {
                timestamp_us: 1_210,
                duration_us: 84,
                generation: 4,
                kind: RedrawKind::Partial,
                clip_rects: 1,
                pixels: 500,
                min_resolution: 1.0,
            });
            s.on_render_failure(&RenderFailureEvent {
                timestamp_us: 1_294,
                generation: 4,
                kind: RedrawKind::Partial,
            });
            s.on_stale_rects(3, &[StaleRect::from(Rect::new(95.0, 0.0, 100.0, 100.0))]);
        });
        assert!(text.contains("Partial rects=1 px=500 res=1 took=84us"), "{text}");
        assert!(text.contains("[failure]"), "{text}");
        assert!(text.contains("count=1 area=500"), "{text}");
    }
}
