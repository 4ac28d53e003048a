// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Redraws become complete (`"X"`) events spanning their duration; everything
//! else is an instant event on the same track.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use palimpsest_core::tracker::ReconcileOutcome;
use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Timestamps are already in microseconds and are written as recorded.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Stale-rect summaries carry no timestamp; attach them to the last one.
    let mut last_ts = 0_u64;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Reconcile(e) => {
                last_ts = e.timestamp_us;
                let (dx, dy) = match e.outcome {
                    ReconcileOutcome::Shifted(o) => (o.dx, o.dy),
                    _ => (0, 0),
                };
                events.push(json!({
                    "ph": "i",
                    "name": "Reconcile",
                    "cat": "View",
                    "ts": e.timestamp_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "generation": e.generation,
                        "outcome": format!("{:?}", e.outcome),
                        "dx": dx,
                        "dy": dy,
                        "width": e.pixel_size.width,
                        "height": e.pixel_size.height,
                        "validity": format!("{:?}", e.validity),
                        "stale_rects": e.stale_rects,
                    }
                }));
            }
            RecordedEvent::Redraw(e) => {
                last_ts = e.timestamp_us + e.duration_us;
                events.push(json!({
                    "ph": "X",
                    "name": format!("{:?}Redraw", e.kind),
                    "cat": "Render",
                    "ts": e.timestamp_us,
                    "dur": e.duration_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "generation": e.generation,
                        "clip_rects": e.clip_rects,
                        "pixels": e.pixels,
                        "min_resolution": e.min_resolution,
                    }
                }));
            }
            RecordedEvent::SceneChange(e) => {
                last_ts = e.timestamp_us;
                let region = e.region.map(|r| vec![r.x0, r.y0, r.x1, r.y1]);
                events.push(json!({
                    "ph": "i",
                    "name": "SceneChange",
                    "cat": "Scene",
                    "ts": e.timestamp_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "generation": e.generation,
                        "region": region,
                        "effect": format!("{:?}", e.effect),
                    }
                }));
            }
            RecordedEvent::RenderFailure(e) => {
                last_ts = e.timestamp_us;
                events.push(json!({
                    "ph": "i",
                    "name": "RenderFailure",
                    "cat": "Render",
                    "ts": e.timestamp_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "generation": e.generation,
                        "kind": format!("{:?}", e.kind),
                    }
                }));
            }
            RecordedEvent::StaleRects {
                generation,
                count,
                area,
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "StaleRects",
                    "cat": "Rich",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "generation": generation,
                        "count": count,
                        "area": area,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use palimpsest_core::trace::{
        ReconcileEvent, RedrawEvent, RedrawKind, SceneChangeEvent, TraceSink,
    };
    use palimpsest_core::tracker::ChangeEffect;
    use palimpsest_core::validity::ValidityKind;
    use palimpsest_core::view::{PixelOffset, PixelSize};

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_scene_change(&SceneChangeEvent {
            timestamp_us: 100,
            generation: 2,
            region: Some(kurbo::Rect::new(0.0, 0.0, 8.0, 8.0)),
            effect: ChangeEffect::Extended,
        });
        rec.on_reconcile(&ReconcileEvent {
            timestamp_us: 120,
            generation: 3,
            outcome: ReconcileOutcome::Shifted(PixelOffset::new(-5, 0)),
            pixel_size: PixelSize::new(100, 100),
            validity: ValidityKind::PartiallyInvalid,
            stale_rects: 2,
        });
        rec.on_redraw(&RedrawEvent {
            timestamp_us: 130,
            duration_us: 40,
            generation: 4,
            kind: RedrawKind::Partial,
            clip_rects: 2,
            pixels: 564,
            min_resolution: 1.0,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0]["name"], "SceneChange");
        assert_eq!(parsed[0]["args"]["region"], json!([0.0, 0.0, 8.0, 8.0]));

        assert_eq!(parsed[1]["ph"], "i");
        assert_eq!(parsed[1]["args"]["dx"], -5);

        // Redraws span their duration.
        assert_eq!(parsed[2]["ph"], "X");
        assert_eq!(parsed[2]["name"], "PartialRedraw");
        assert_eq!(parsed[2]["ts"], 130);
        assert_eq!(parsed[2]["dur"], 40);
    }

    #[test]
    fn stale_rects_follow_previous_timestamp() {
        let mut rec = RecorderSink::new();
        rec.on_scene_change(&SceneChangeEvent {
            timestamp_us: 77,
            generation: 0,
            region: None,
            effect: ChangeEffect::InvalidatedAll,
        });
        rec.on_stale_rects(0, &[]);

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["args"]["region"], Value::Null);
        assert_eq!(parsed[1]["ts"], 77);
        assert_eq!(parsed[1]["args"]["count"], 0);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
