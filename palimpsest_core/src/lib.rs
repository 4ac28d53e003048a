// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for incremental rendering of a pannable, zoomable 2D view.
//!
//! `palimpsest_core` provides the invalidation bookkeeping behind a cached
//! view of an expensive scene. It is `no_std` compatible (with `alloc`) and
//! knows nothing about pixels beyond their coordinates; the pixel buffer and
//! the redraw driver live in `palimpsest_cache`.
//!
//! # Architecture
//!
//! ```text
//!   ChangeFeed::notify() ──► ChangeSubscription::drain()
//!                                     │
//!                                     ▼
//!   requested ViewState ──► ViewTracker ──► ReconcileOutcome (pixel work)
//!                                │
//!                                ▼
//!               Validity { stale RectSet in buffer pixels }
//! ```
//!
//! **[`geom`]** — Rectangle predicates over [`kurbo::Rect`]: strict overlap,
//! inclusive containment, and the four-strip difference.
//!
//! **[`rect_set`]** — [`RectSet`](rect_set::RectSet), a capped collection of
//! pairwise-disjoint rectangles. When the cap would be exceeded the set
//! collapses to its bounding box.
//!
//! **[`validity`]** — [`Validity`](validity::Validity), the tri-state record
//! of which cached pixels are stale.
//!
//! **[`view`]** — [`ViewState`](view::ViewState) and pure integer translation
//! detection between two world-to-pixel transforms.
//!
//! **[`tracker`]** — [`ViewTracker`](tracker::ViewTracker), the validity state
//! machine: reconciles view requests and folds in scene changes, leaving the
//! pixel work to the caller.
//!
//! **[`change`]** — [`ChangeFeed`](change::ChangeFeed) and
//! [`SceneChange`](change::SceneChange), the scene-side notification channel.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! cache instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-rectangle
//!   stale region events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod change;
pub mod geom;
pub mod rect_set;
pub mod trace;
pub mod tracker;
pub mod validity;
pub mod view;
