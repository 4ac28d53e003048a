// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated map session that exercises the view cache and its diagnostics.
//!
//! Pans, moves a marker, zooms, resizes and restyles a synthetic street map,
//! printing every cache event through a
//! [`PrettyPrintSink`](palimpsest_debug::pretty::PrettyPrintSink) while a
//! [`RecorderSink`](palimpsest_debug::recorder::RecorderSink) captures them
//! for a Chrome trace. The last frame is saved as a PNG.
//!
//! Set `RUST_LOG=palimpsest_cache=debug` to also see the cache's log lines.

use std::cell::RefCell;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter};
use std::rc::Rc;

use kurbo::{Affine, Point, Rect, Vec2};
use palimpsest_cache::{RenderError, Renderer, Surface, ViewCache, ViewCacheConfig};
use palimpsest_core::change::{ChangeFeed, SceneChange};
use palimpsest_core::trace::{
    ReconcileEvent, RedrawEvent, RenderFailureEvent, SceneChangeEvent, StaleRect, TraceSink,
};
use palimpsest_core::view::PixelSize;
use palimpsest_debug::pretty::PrettyPrintSink;
use palimpsest_debug::recorder::RecorderSink;
use tiny_skia::{Color, IntRect, Pixmap};
use tracing_subscriber::EnvFilter;

const LAKES: [Rect; 3] = [
    Rect::new(120.0, 80.0, 260.0, 170.0),
    Rect::new(610.0, 240.0, 700.0, 420.0),
    Rect::new(880.0, 60.0, 1010.0, 140.0),
];
const MARKER_SIZE: f64 = 12.0;

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// A street grid with lakes and one moving marker.
struct MapRenderer {
    marker: Point,
    fail_next: bool,
}

impl MapRenderer {
    fn marker_bounds(&self) -> Rect {
        Rect::from_center_size(self.marker, (MARKER_SIZE, MARKER_SIZE))
    }
}

impl Renderer for MapRenderer {
    fn draw(
        &mut self,
        surface: &mut Surface<'_>,
        world_area: Rect,
        min_resolution: f64,
    ) -> Result<(), RenderError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(RenderError::msg("tile store evicted"));
        }
        let visible = surface.world_clip_bounds().intersect(world_area);

        for lake in LAKES {
            if lake.overlaps(visible) {
                surface.fill_rect(lake, Color::from_rgba8(170, 211, 223, 255));
            }
        }

        // Minor streets vanish once they would be thinner than a pixel.
        let step = if min_resolution > 2.0 { 200.0 } else { 50.0 };
        let half = (1.5 * min_resolution).max(2.0);
        let road = Color::from_rgba8(255, 255, 255, 255);
        let mut x = (visible.x0 / step).floor() * step;
        while x <= visible.x1 {
            surface.fill_rect(Rect::new(x - half, visible.y0, x + half, visible.y1), road);
            x += step;
        }
        let mut y = (visible.y0 / step).floor() * step;
        while y <= visible.y1 {
            surface.fill_rect(Rect::new(visible.x0, y - half, visible.x1, y + half), road);
            y += step;
        }

        if self.marker_bounds().overlaps(visible) {
            surface.fill_rect(self.marker_bounds(), Color::from_rgba8(220, 40, 40, 255));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// A camera over the map: the world point at the window center and the
/// pixels per world unit.
struct View {
    size: PixelSize,
    center: Point,
    zoom: f64,
}

impl View {
    fn transform(&self) -> Affine {
        let half = Vec2::new(f64::from(self.size.width), f64::from(self.size.height)) / 2.0;
        Affine::translate(half) * Affine::scale(self.zoom) * Affine::translate(-self.center.to_vec2())
    }

    fn world_area(&self) -> Rect {
        self.transform()
            .inverse()
            .transform_rect_bbox(self.size.bounds())
    }
}

// ---------------------------------------------------------------------------
// Trace fan-out
// ---------------------------------------------------------------------------

/// Forwards every event to the console and to a shared recorder.
struct Fanout {
    pretty: PrettyPrintSink<io::Stdout>,
    recorder: Rc<RefCell<RecorderSink>>,
}

impl TraceSink for Fanout {
    fn on_reconcile(&mut self, e: &ReconcileEvent) {
        self.pretty.on_reconcile(e);
        self.recorder.borrow_mut().on_reconcile(e);
    }

    fn on_redraw(&mut self, e: &RedrawEvent) {
        self.pretty.on_redraw(e);
        self.recorder.borrow_mut().on_redraw(e);
    }

    fn on_scene_change(&mut self, e: &SceneChangeEvent) {
        self.pretty.on_scene_change(e);
        self.recorder.borrow_mut().on_scene_change(e);
    }

    fn on_render_failure(&mut self, e: &RenderFailureEvent) {
        self.pretty.on_render_failure(e);
        self.recorder.borrow_mut().on_render_failure(e);
    }

    fn on_stale_rects(&mut self, generation: u64, rects: &[StaleRect]) {
        self.pretty.on_stale_rects(generation, rects);
        self.recorder.borrow_mut().on_stale_rects(generation, rects);
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

fn frame(cache: &mut ViewCache<MapRenderer>, view: &View, window: &mut Pixmap) {
    let Some(clip) = IntRect::from_xywh(0, 0, view.size.width, view.size.height) else {
        return;
    };
    cache.draw(
        &mut window.as_mut(),
        clip,
        view.size,
        view.world_area(),
        view.transform(),
    );
}

fn new_window(size: PixelSize) -> Result<Pixmap, Box<dyn Error>> {
    Ok(Pixmap::new(size.width, size.height).ok_or("cannot allocate window")?)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // -- sinks -------------------------------------------------------------
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    let sink = Fanout {
        pretty: PrettyPrintSink::with_writer(io::stdout()),
        recorder: Rc::clone(&recorder),
    };

    // -- cache -------------------------------------------------------------
    let feed = ChangeFeed::new();
    let renderer = MapRenderer {
        marker: Point::new(420.0, 310.0),
        fail_next: false,
    };
    let config = ViewCacheConfig::new().with_background(Color::from_rgba8(242, 239, 233, 255));
    let mut cache = ViewCache::with_config(renderer, &feed, config)?;
    cache.set_trace_sink(Box::new(sink));

    let mut view = View {
        size: PixelSize::new(320, 240),
        center: Point::new(400.0, 300.0),
        zoom: 0.5,
    };
    let mut window = new_window(view.size)?;

    println!("-- first frame");
    frame(&mut cache, &view, &mut window);

    println!("-- pan east, 4 pixels per frame");
    for _ in 0..10 {
        view.center.x += 4.0 / view.zoom;
        frame(&mut cache, &view, &mut window);
    }

    println!("-- marker moves");
    for _ in 0..5 {
        let before = cache.renderer().marker_bounds();
        cache.renderer_mut().marker.x += 6.0;
        feed.notify(before);
        feed.notify(cache.renderer().marker_bounds());
        frame(&mut cache, &view, &mut window);
    }

    println!("-- zoom in");
    view.zoom = 1.0;
    frame(&mut cache, &view, &mut window);

    println!("-- restyle with a failing renderer");
    cache.renderer_mut().fail_next = true;
    feed.notify(SceneChange::Everything);
    frame(&mut cache, &view, &mut window);
    frame(&mut cache, &view, &mut window);

    println!("-- window resized");
    view.size = PixelSize::new(400, 300);
    window = new_window(view.size)?;
    frame(&mut cache, &view, &mut window);

    println!("-- restyle");
    feed.notify(SceneChange::Everything);
    frame(&mut cache, &view, &mut window);

    let stats = cache.stats();
    println!(
        "{} reconciliations, {} shifts reusing {} px, {} full + {} partial redraws, {} failures",
        stats.reconciliations,
        stats.shifts,
        stats.reused_pixels,
        stats.full_redraws,
        stats.partial_redraws,
        stats.render_failures,
    );

    // -- outputs -----------------------------------------------------------
    window.save_png("pan_demo.png")?;
    let trace = "trace.json";
    let mut writer = BufWriter::new(File::create(trace)?);
    palimpsest_debug::chrome::export(recorder.borrow().as_bytes(), &mut writer)?;
    println!("Wrote pan_demo.png and {trace}");
    Ok(())
}
