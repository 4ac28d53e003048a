// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cache validity state machine, independent of pixel storage.
//!
//! [`ViewTracker`] records the view a buffer was rendered for and which of
//! its pixels are stale. It decides how a new view request relates to the
//! old one ([`ViewTracker::reconcile`]) and folds scene changes into the
//! stale region ([`ViewTracker::scene_changed`]). The caller carries out the
//! pixel work the returned [`ReconcileOutcome`] asks for.
//!
//! ```text
//!             region change              Everything / resize / zoom
//!   AllValid ───────────────► Partially ────────────────────────► AllInvalid
//!      ▲                      Invalid                                  │
//!      └──────────── redraw ◄────┴──────────────── redraw ◄────────────┘
//! ```

use crate::change::SceneChange;
use crate::geom;
use crate::rect_set::{CapacityError, DEFAULT_MAX_SIZE, RectSet};
use crate::validity::Validity;
use crate::view::{DEFAULT_TRANSLATION_EPSILON, PixelOffset, ViewState, integer_translation};

/// How a view request was reconciled with the cached view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconcileOutcome {
    /// Same view as before; nothing to do.
    Unchanged,
    /// First view, or a different buffer size. A new buffer is needed and
    /// everything is stale.
    Resized,
    /// Same size, shifted by whole pixels. The caller must move the buffer
    /// content by the offset; exposed pixels are now stale.
    Shifted(PixelOffset),
    /// Same size but not reusable (zoom, rotation, sub-pixel pan, or a pan
    /// larger than the buffer). Everything is stale.
    Invalidated,
    /// The buffer was already entirely stale; only the view was updated.
    StillInvalid,
}

/// How a scene change affected the stale region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeEffect {
    /// Everything became stale.
    InvalidatedAll,
    /// The stale region grew.
    Extended,
    /// Nothing changed: the cache was already entirely stale, the region was
    /// outside the buffer, or it was already stale.
    Ignored,
}

/// View and validity bookkeeping for one cached buffer.
#[derive(Clone, Debug)]
pub struct ViewTracker {
    view: Option<ViewState>,
    validity: Validity,
    max_stale_rects: usize,
    translation_epsilon: f64,
}

impl Default for ViewTracker {
    fn default() -> Self {
        Self {
            view: None,
            validity: Validity::AllInvalid,
            max_stale_rects: DEFAULT_MAX_SIZE,
            translation_epsilon: DEFAULT_TRANSLATION_EPSILON,
        }
    }
}

impl ViewTracker {
    /// Creates a tracker with no view.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `max_stale_rects` is 0 or 1.
    pub fn new(max_stale_rects: usize, translation_epsilon: f64) -> Result<Self, CapacityError> {
        RectSet::with_max_size(max_stale_rects)?;
        Ok(Self {
            max_stale_rects,
            translation_epsilon,
            ..Self::default()
        })
    }

    /// The view the buffer currently corresponds to.
    #[inline]
    #[must_use]
    pub fn view(&self) -> Option<&ViewState> {
        self.view.as_ref()
    }

    /// Current validity.
    #[inline]
    #[must_use]
    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    /// Capacity given to stale regions.
    #[inline]
    #[must_use]
    pub fn max_stale_rects(&self) -> usize {
        self.max_stale_rects
    }

    /// Reconciles the cached view with `request` and records `request` as
    /// the current view.
    pub fn reconcile(&mut self, request: ViewState) -> ReconcileOutcome {
        let outcome = self.classify(&request);
        self.view = Some(request);
        outcome
    }

    fn classify(&mut self, request: &ViewState) -> ReconcileOutcome {
        let Some(current) = self.view else {
            self.validity.invalidate_all();
            return ReconcileOutcome::Resized;
        };
        if current == *request {
            return ReconcileOutcome::Unchanged;
        }
        if current.pixel_size != request.pixel_size {
            self.validity.invalidate_all();
            return ReconcileOutcome::Resized;
        }
        if self.validity.is_all_invalid() {
            return ReconcileOutcome::StillInvalid;
        }

        let Some(offset) = integer_translation(
            current.transform,
            request.transform,
            self.translation_epsilon,
        ) else {
            self.validity.invalidate_all();
            return ReconcileOutcome::Invalidated;
        };

        let bounds = request.pixel_bounds();
        let overlap = bounds.intersect(bounds + offset.to_vec2());
        if geom::is_empty(overlap) {
            self.validity.invalidate_all();
            return ReconcileOutcome::Invalidated;
        }

        let mut stale = self.empty_region();
        stale.add(bounds);
        stale.subtract(overlap);
        if let Some(old) = self.validity.stale_region() {
            let mut moved = old.clone();
            moved.translate(offset.to_vec2());
            moved.clip_to(bounds);
            stale.add_set(&moved);
        }
        self.validity = Validity::from_stale(stale);
        ReconcileOutcome::Shifted(offset)
    }

    /// Folds a scene change into the stale region.
    ///
    /// Regions are mapped to buffer pixels with the current view's transform,
    /// rounded outward to whole pixels and clipped to the buffer.
    pub fn scene_changed(&mut self, change: SceneChange) -> ChangeEffect {
        match change {
            SceneChange::Everything => {
                self.validity.invalidate_all();
                ChangeEffect::InvalidatedAll
            }
            SceneChange::Region(world) => {
                let Some(view) = self.view else {
                    return ChangeEffect::Ignored;
                };
                if self.validity.is_all_invalid() {
                    return ChangeEffect::Ignored;
                }
                let pixels = view.world_to_pixels(world).intersect(view.pixel_bounds());
                if self.validity.invalidate(pixels, self.max_stale_rects) {
                    ChangeEffect::Extended
                } else {
                    ChangeEffect::Ignored
                }
            }
        }
    }

    /// Marks everything valid and returns what was stale before.
    pub fn mark_valid(&mut self) -> Validity {
        core::mem::replace(&mut self.validity, Validity::AllValid)
    }

    /// Marks everything stale.
    pub fn invalidate_all(&mut self) {
        self.validity.invalidate_all();
    }

    fn empty_region(&self) -> RectSet {
        RectSet::with_max_size(self.max_stale_rects).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::PixelSize;
    use kurbo::{Affine, Rect};

    fn view(size: u32, transform: Affine) -> ViewState {
        let s = f64::from(size);
        ViewState::new(
            PixelSize::new(size, size),
            transform.inverse().transform_rect_bbox(Rect::new(0.0, 0.0, s, s)),
            transform,
        )
    }

    fn valid_tracker(v: ViewState) -> ViewTracker {
        let mut t = ViewTracker::default();
        assert_eq!(t.reconcile(v), ReconcileOutcome::Resized);
        t.mark_valid();
        t
    }

    #[test]
    fn first_request_is_a_resize() {
        let mut t = ViewTracker::default();
        assert!(t.view().is_none());
        let v = view(100, Affine::IDENTITY);
        assert_eq!(t.reconcile(v), ReconcileOutcome::Resized);
        assert!(t.validity().is_all_invalid());
        assert_eq!(t.view(), Some(&v));
    }

    #[test]
    fn identical_request_is_unchanged() {
        let v = view(100, Affine::IDENTITY);
        let mut t = valid_tracker(v);
        assert_eq!(t.reconcile(v), ReconcileOutcome::Unchanged);
        assert!(t.validity().is_all_valid());
    }

    #[test]
    fn pan_exposes_strip() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        let outcome = t.reconcile(view(100, Affine::translate((-5.0, 0.0))));
        assert_eq!(outcome, ReconcileOutcome::Shifted(PixelOffset::new(-5, 0)));
        let stale = t.validity().stale_region().unwrap();
        assert_eq!(stale.as_slice(), &[Rect::new(95.0, 0.0, 100.0, 100.0)]);
    }

    #[test]
    fn diagonal_pan_exposes_l_shape() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        t.reconcile(view(100, Affine::translate((3.0, 4.0))));
        let stale = t.validity().stale_region().unwrap();
        assert_eq!(stale.area(), 100.0 * 100.0 - 97.0 * 96.0);
        assert!(stale.contains_point((1.0, 50.0).into()));
        assert!(stale.contains_point((50.0, 1.0).into()));
        assert!(!stale.contains_point((50.0, 50.0).into()));
    }

    #[test]
    fn pan_carries_existing_stale_region() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        t.scene_changed(SceneChange::Region(Rect::new(40.0, 40.0, 50.0, 50.0)));
        t.reconcile(view(100, Affine::translate((-10.0, 0.0))));
        let stale = t.validity().stale_region().unwrap();
        assert!(stale.contains_point((35.0, 45.0).into()));
        assert!(!stale.contains_point((45.0, 45.0).into()));
        assert!(stale.contains_point((95.0, 5.0).into()));
        assert_eq!(stale.area(), 100.0 + 10.0 * 100.0);
    }

    #[test]
    fn pan_beyond_buffer_invalidates() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        let outcome = t.reconcile(view(100, Affine::translate((-100.0, 0.0))));
        assert_eq!(outcome, ReconcileOutcome::Invalidated);
        assert!(t.validity().is_all_invalid());
    }

    #[test]
    fn zero_pan_with_new_world_area_keeps_validity() {
        let v = view(100, Affine::IDENTITY);
        let mut t = valid_tracker(v);
        let mut moved = v;
        moved.world_area = Rect::new(0.0, 0.0, 90.0, 90.0);
        assert_eq!(
            t.reconcile(moved),
            ReconcileOutcome::Shifted(PixelOffset::ZERO)
        );
        assert!(t.validity().is_all_valid());
    }

    #[test]
    fn zoom_and_rotation_invalidate() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        assert_eq!(
            t.reconcile(view(100, Affine::scale(2.0))),
            ReconcileOutcome::Invalidated
        );
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        assert_eq!(
            t.reconcile(view(100, Affine::rotate(0.2))),
            ReconcileOutcome::Invalidated
        );
        assert!(t.validity().is_all_invalid());
    }

    #[test]
    fn resize_always_invalidates() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        assert_eq!(
            t.reconcile(view(120, Affine::IDENTITY)),
            ReconcileOutcome::Resized
        );
        assert!(t.validity().is_all_invalid());
    }

    #[test]
    fn all_invalid_stays_invalid_across_pans() {
        let mut t = ViewTracker::default();
        t.reconcile(view(100, Affine::IDENTITY));
        assert_eq!(
            t.reconcile(view(100, Affine::translate((-5.0, 0.0)))),
            ReconcileOutcome::StillInvalid
        );
        assert!(t.validity().is_all_invalid());
    }

    #[test]
    fn everything_invalidates() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        assert_eq!(
            t.scene_changed(SceneChange::Everything),
            ChangeEffect::InvalidatedAll
        );
        assert!(t.validity().is_all_invalid());
    }

    #[test]
    fn region_change_is_transformed_into_pixels() {
        let mut t = valid_tracker(view(100, Affine::scale(2.0)));
        let effect = t.scene_changed(SceneChange::Region(Rect::new(5.0, 5.0, 10.0, 7.5)));
        assert_eq!(effect, ChangeEffect::Extended);
        let stale = t.validity().stale_region().unwrap();
        assert_eq!(stale.as_slice(), &[Rect::new(10.0, 10.0, 20.0, 15.0)]);
    }

    #[test]
    fn region_change_while_invalid_is_ignored() {
        let mut t = ViewTracker::default();
        let r = SceneChange::Region(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(t.scene_changed(r), ChangeEffect::Ignored);
        t.reconcile(view(100, Affine::IDENTITY));
        assert_eq!(t.scene_changed(r), ChangeEffect::Ignored);
        assert!(t.validity().is_all_invalid());
    }

    #[test]
    fn offscreen_region_change_is_ignored() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        let effect = t.scene_changed(SceneChange::Region(Rect::new(200.0, 0.0, 210.0, 10.0)));
        assert_eq!(effect, ChangeEffect::Ignored);
        assert!(t.validity().is_all_valid());
    }

    #[test]
    fn inverted_region_change_is_ignored() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        let effect = t.scene_changed(SceneChange::Region(Rect::new(50.0, 50.0, 40.0, 40.0)));
        assert_eq!(effect, ChangeEffect::Ignored);
        assert!(t.validity().is_all_valid());
    }

    #[test]
    fn invalidate_all_discards_partial_region() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        t.scene_changed(SceneChange::Region(Rect::new(0.0, 0.0, 10.0, 10.0)));
        t.invalidate_all();
        assert!(t.validity().is_all_invalid());
        let r = SceneChange::Region(Rect::new(20.0, 20.0, 30.0, 30.0));
        assert_eq!(t.scene_changed(r), ChangeEffect::Ignored);
    }

    #[test]
    fn mark_valid_returns_previous_state() {
        let mut t = valid_tracker(view(100, Affine::IDENTITY));
        t.scene_changed(SceneChange::Region(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let before = t.mark_valid();
        assert_eq!(
            before.stale_region().map(RectSet::as_slice),
            Some(&[Rect::new(0.0, 0.0, 10.0, 10.0)][..])
        );
        assert!(t.validity().is_all_valid());
    }

    #[test]
    fn capacity_is_validated() {
        assert!(ViewTracker::new(1, DEFAULT_TRANSLATION_EPSILON).is_err());
        let t = ViewTracker::new(4, DEFAULT_TRANSLATION_EPSILON).unwrap();
        assert_eq!(t.max_stale_rects(), 4);
    }
}
