// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Stale rectangle events ([`on_stale_rects`](TraceSink::on_stale_rects))
//! store only the count and total area.

use kurbo::Rect;
use palimpsest_core::trace::{
    ReconcileEvent, RedrawEvent, RedrawKind, RenderFailureEvent, SceneChangeEvent, StaleRect,
    TraceSink,
};
use palimpsest_core::tracker::{ChangeEffect, ReconcileOutcome};
use palimpsest_core::validity::ValidityKind;
use palimpsest_core::view::{PixelOffset, PixelSize};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_RECONCILE: u8 = 1;
const TAG_REDRAW: u8 = 2;
const TAG_SCENE_CHANGE: u8 = 3;
const TAG_RENDER_FAILURE: u8 = 4;
const TAG_STALE_RECTS: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_option_rect(&mut self, v: Option<Rect>) {
        let r = v.unwrap_or(Rect::ZERO);
        self.write_u8(u8::from(v.is_some()));
        self.write_f64(r.x0);
        self.write_f64(r.y0);
        self.write_f64(r.x1);
        self.write_f64(r.y1);
    }

    fn write_outcome(&mut self, o: ReconcileOutcome) {
        let (tag, offset) = match o {
            ReconcileOutcome::Unchanged => (0, PixelOffset::ZERO),
            ReconcileOutcome::Resized => (1, PixelOffset::ZERO),
            ReconcileOutcome::Shifted(offset) => (2, offset),
            ReconcileOutcome::Invalidated => (3, PixelOffset::ZERO),
            ReconcileOutcome::StillInvalid => (4, PixelOffset::ZERO),
        };
        self.write_u8(tag);
        self.write_i32(offset.dx);
        self.write_i32(offset.dy);
    }

    fn write_validity(&mut self, v: ValidityKind) {
        self.write_u8(match v {
            ValidityKind::AllValid => 0,
            ValidityKind::AllInvalid => 1,
            ValidityKind::PartiallyInvalid => 2,
        });
    }

    fn write_effect(&mut self, e: ChangeEffect) {
        self.write_u8(match e {
            ChangeEffect::InvalidatedAll => 0,
            ChangeEffect::Extended => 1,
            ChangeEffect::Ignored => 2,
        });
    }

    fn write_kind(&mut self, k: RedrawKind) {
        self.write_u8(match k {
            RedrawKind::Full => 0,
            RedrawKind::Partial => 1,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        self.write_u8(TAG_RECONCILE);
        self.write_u64(e.timestamp_us);
        self.write_u64(e.generation);
        self.write_outcome(e.outcome);
        self.write_u32(e.pixel_size.width);
        self.write_u32(e.pixel_size.height);
        self.write_validity(e.validity);
        self.write_u32(e.stale_rects);
    }

    fn on_redraw(&mut self, e: &RedrawEvent) {
        self.write_u8(TAG_REDRAW);
        self.write_u64(e.timestamp_us);
        self.write_u64(e.duration_us);
        self.write_u64(e.generation);
        self.write_kind(e.kind);
        self.write_u32(e.clip_rects);
        self.write_u64(e.pixels);
        self.write_f64(e.min_resolution);
    }

    fn on_scene_change(&mut self, e: &SceneChangeEvent) {
        self.write_u8(TAG_SCENE_CHANGE);
        self.write_u64(e.timestamp_us);
        self.write_u64(e.generation);
        self.write_option_rect(e.region);
        self.write_effect(e.effect);
    }

    fn on_render_failure(&mut self, e: &RenderFailureEvent) {
        self.write_u8(TAG_RENDER_FAILURE);
        self.write_u64(e.timestamp_us);
        self.write_u64(e.generation);
        self.write_kind(e.kind);
    }

    fn on_stale_rects(&mut self, generation: u64, rects: &[StaleRect]) {
        self.write_u8(TAG_STALE_RECTS);
        self.write_u64(generation);
        self.write_u32(u32::try_from(rects.len()).unwrap_or(u32::MAX));
        let area = rects
            .iter()
            .map(|r| u64::from(r.width) * u64::from(r.height))
            .sum::<u64>();
        self.write_u64(area);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`ReconcileEvent`].
    Reconcile(ReconcileEvent),
    /// A [`RedrawEvent`].
    Redraw(RedrawEvent),
    /// A [`SceneChangeEvent`].
    SceneChange(SceneChangeEvent),
    /// A [`RenderFailureEvent`].
    RenderFailure(RenderFailureEvent),
    /// Summary of the stale region handed to a redraw.
    StaleRects {
        /// Buffer generation before the redraw.
        generation: u64,
        /// Number of stale rectangles.
        count: u32,
        /// Total stale area in pixels.
        area: u64,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_option_rect(&mut self) -> Option<Option<Rect>> {
        let present = self.read_u8()?;
        let r = Rect::new(
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
            self.read_f64()?,
        );
        Some((present != 0).then_some(r))
    }

    fn read_outcome(&mut self) -> Option<ReconcileOutcome> {
        let tag = self.read_u8()?;
        let offset = PixelOffset::new(self.read_i32()?, self.read_i32()?);
        Some(match tag {
            0 => ReconcileOutcome::Unchanged,
            1 => ReconcileOutcome::Resized,
            2 => ReconcileOutcome::Shifted(offset),
            3 => ReconcileOutcome::Invalidated,
            _ => ReconcileOutcome::StillInvalid,
        })
    }

    fn read_validity(&mut self) -> Option<ValidityKind> {
        Some(match self.read_u8()? {
            0 => ValidityKind::AllValid,
            1 => ValidityKind::AllInvalid,
            _ => ValidityKind::PartiallyInvalid,
        })
    }

    fn read_effect(&mut self) -> Option<ChangeEffect> {
        Some(match self.read_u8()? {
            0 => ChangeEffect::InvalidatedAll,
            1 => ChangeEffect::Extended,
            _ => ChangeEffect::Ignored,
        })
    }

    fn read_kind(&mut self) -> Option<RedrawKind> {
        Some(match self.read_u8()? {
            0 => RedrawKind::Full,
            _ => RedrawKind::Partial,
        })
    }

    fn decode_reconcile(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Reconcile(ReconcileEvent {
            timestamp_us: self.read_u64()?,
            generation: self.read_u64()?,
            outcome: self.read_outcome()?,
            pixel_size: PixelSize::new(self.read_u32()?, self.read_u32()?),
            validity: self.read_validity()?,
            stale_rects: self.read_u32()?,
        }))
    }

    fn decode_redraw(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Redraw(RedrawEvent {
            timestamp_us: self.read_u64()?,
            duration_us: self.read_u64()?,
            generation: self.read_u64()?,
            kind: self.read_kind()?,
            clip_rects: self.read_u32()?,
            pixels: self.read_u64()?,
            min_resolution: self.read_f64()?,
        }))
    }

    fn decode_scene_change(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SceneChange(SceneChangeEvent {
            timestamp_us: self.read_u64()?,
            generation: self.read_u64()?,
            region: self.read_option_rect()?,
            effect: self.read_effect()?,
        }))
    }

    fn decode_render_failure(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderFailure(RenderFailureEvent {
            timestamp_us: self.read_u64()?,
            generation: self.read_u64()?,
            kind: self.read_kind()?,
        }))
    }

    fn decode_stale_rects(&mut self) -> Option<RecordedEvent> {
        let generation = self.read_u64()?;
        let count = self.read_u32()?;
        let area = self.read_u64()?;
        Some(RecordedEvent::StaleRects {
            generation,
            count,
            area,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_RECONCILE => self.decode_reconcile(),
            TAG_REDRAW => self.decode_redraw(),
            TAG_SCENE_CHANGE => self.decode_scene_change(),
            TAG_RENDER_FAILURE => self.decode_render_failure(),
            TAG_STALE_RECTS => self.decode_stale_rects(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reconcile() -> ReconcileEvent {
        ReconcileEvent {
            timestamp_us: 1_250,
            generation: 4,
            outcome: ReconcileOutcome::Shifted(PixelOffset::new(-5, 2)),
            pixel_size: PixelSize::new(640, 480),
            validity: ValidityKind::PartiallyInvalid,
            stale_rects: 2,
        }
    }

    fn sample_redraw() -> RedrawEvent {
        RedrawEvent {
            timestamp_us: 1_300,
            duration_us: 850,
            generation: 5,
            kind: RedrawKind::Partial,
            clip_rects: 2,
            pixels: 5 * 480 + 2 * 635,
            min_resolution: 0.25,
        }
    }

    #[test]
    fn reconcile_keeps_the_shift_offset() {
        let mut rec = RecorderSink::new();
        let orig = sample_reconcile();
        rec.on_reconcile(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::Reconcile(e) => {
                assert_eq!(e.timestamp_us, orig.timestamp_us);
                assert_eq!(e.generation, orig.generation);
                assert_eq!(e.outcome, orig.outcome);
                assert_eq!(e.pixel_size, orig.pixel_size);
                assert_eq!(e.validity, orig.validity);
                assert_eq!(e.stale_rects, orig.stale_rects);
            }
            other => panic!("expected Reconcile, got {other:?}"),
        }
    }

    #[test]
    fn redraw_keeps_timing_and_resolution() {
        let mut rec = RecorderSink::new();
        let orig = sample_redraw();
        rec.on_redraw(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match &events[..] {
            [RecordedEvent::Redraw(e)] => {
                assert_eq!(e.duration_us, 850);
                assert_eq!(e.kind, RedrawKind::Partial);
                assert_eq!(e.pixels, orig.pixels);
                assert_eq!(e.min_resolution, 0.25);
            }
            other => panic!("expected one Redraw, got {other:?}"),
        }
    }

    #[test]
    fn scene_change_with_and_without_region() {
        let mut rec = RecorderSink::new();
        rec.on_scene_change(&SceneChangeEvent {
            timestamp_us: 10,
            generation: 1,
            region: Some(Rect::new(1.5, 2.0, 3.0, 4.25)),
            effect: ChangeEffect::Extended,
        });
        rec.on_scene_change(&SceneChangeEvent {
            timestamp_us: 11,
            generation: 1,
            region: None,
            effect: ChangeEffect::InvalidatedAll,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match (&events[0], &events[1]) {
            (RecordedEvent::SceneChange(a), RecordedEvent::SceneChange(b)) => {
                assert_eq!(a.region, Some(Rect::new(1.5, 2.0, 3.0, 4.25)));
                assert_eq!(a.effect, ChangeEffect::Extended);
                assert_eq!(b.region, None);
                assert_eq!(b.effect, ChangeEffect::InvalidatedAll);
            }
            other => panic!("expected two SceneChange events, got {other:?}"),
        }
    }

    #[test]
    fn stale_rects_store_count_and_area() {
        let mut rec = RecorderSink::new();
        let rects = [
            StaleRect::from(Rect::new(95.0, 0.0, 100.0, 100.0)),
            StaleRect::from(Rect::new(0.0, 0.0, 10.0, 10.0)),
        ];
        rec.on_stale_rects(9, &rects);

        match decode(rec.as_bytes()).next() {
            Some(RecordedEvent::StaleRects {
                generation,
                count,
                area,
            }) => {
                assert_eq!(generation, 9);
                assert_eq!(count, 2);
                assert_eq!(area, 600);
            }
            other => panic!("expected StaleRects, got {other:?}"),
        }
    }

    #[test]
    fn mixed_sequence_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_reconcile(&sample_reconcile());
        rec.on_redraw(&sample_redraw());
        rec.on_render_failure(&RenderFailureEvent {
            timestamp_us: 2_150,
            generation: 5,
            kind: RedrawKind::Partial,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RecordedEvent::Reconcile(_)));
        assert!(matches!(events[1], RecordedEvent::Redraw(_)));
        assert!(matches!(events[2], RecordedEvent::RenderFailure(_)));
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_reconcile(&sample_reconcile());
        rec.on_redraw(&sample_redraw());
        let bytes = rec.into_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 3]).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }
}
