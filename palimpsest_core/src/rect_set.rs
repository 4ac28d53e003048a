// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A capped set of pairwise-disjoint rectangles.
//!
//! [`RectSet`] represents a region of the plane as a list of rectangles, no
//! two of which overlap with positive area. It supports union ([`add`]) and
//! difference ([`subtract`]) with single rectangles or other sets. Adjacent
//! rectangles are never merged.
//!
//! Fragmentation is bounded by a capacity ([`max_size`]). Whenever an
//! operation would leave more than `max_size` members, the whole set is
//! replaced by its bounding box. The region only ever grows under this
//! approximation, which is the safe direction for stale pixel tracking.
//!
//! [`add`]: RectSet::add
//! [`subtract`]: RectSet::subtract
//! [`max_size`]: RectSet::max_size

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Rect, Vec2};

use crate::geom;

/// Capacity used by [`RectSet::new`].
pub const DEFAULT_MAX_SIZE: usize = 32;

/// Error returned when a [`RectSet`] capacity is not greater than 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("rect set capacity must be greater than 1 (got {0})")]
pub struct CapacityError(pub usize);

/// A set of pairwise-disjoint, non-empty rectangles with a size cap.
#[derive(Clone, Debug, PartialEq)]
pub struct RectSet {
    rects: Vec<Rect>,
    max_size: usize,
}

impl Default for RectSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RectSet {
    /// Creates an empty set with the default capacity of
    /// [`DEFAULT_MAX_SIZE`] rectangles.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rects: Vec::new(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    /// Creates an empty set holding at most `max_size` rectangles before it
    /// collapses to a bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `max_size` is 0 or 1.
    pub fn with_max_size(max_size: usize) -> Result<Self, CapacityError> {
        check_capacity(max_size)?;
        Ok(Self {
            rects: Vec::new(),
            max_size,
        })
    }

    /// Returns the capacity.
    #[inline]
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Changes the capacity, collapsing the set immediately if it now holds
    /// too many rectangles.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `max_size` is 0 or 1. The set is left
    /// unchanged in that case.
    pub fn set_max_size(&mut self, max_size: usize) -> Result<(), CapacityError> {
        check_capacity(max_size)?;
        self.max_size = max_size;
        self.enforce_cap();
        Ok(())
    }

    /// Returns the number of member rectangles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Returns `true` if the set covers no area.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Iterates over the member rectangles in no particular order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Rect> + '_ {
        self.rects.iter().copied()
    }

    /// Returns the member rectangles as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Rect] {
        &self.rects
    }

    /// Returns the smallest rectangle containing every member, or `None` for
    /// an empty set.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        self.rects.iter().copied().reduce(|a, b| a.union(b))
    }

    /// Returns the total covered area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Returns `true` if `p` lies in the set.
    ///
    /// Members are treated as half-open: left and top edges are inside, right
    /// and bottom edges are not.
    #[must_use]
    pub fn contains_point(&self, p: Point) -> bool {
        self.rects
            .iter()
            .any(|r| r.x0 <= p.x && p.x < r.x1 && r.y0 <= p.y && p.y < r.y1)
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Adds `rect` to the set.
    ///
    /// Empty rectangles are ignored, as are rectangles already contained in a
    /// single member. Otherwise the parts of existing members that overlap
    /// `rect` are removed and `rect` is appended whole. Inverted rectangles
    /// count as empty.
    pub fn add(&mut self, rect: Rect) {
        if geom::is_empty(rect) {
            return;
        }
        if self.rects.iter().any(|m| geom::contains(*m, rect)) {
            return;
        }
        // Cap check after the push: a collapse must also cover `rect`.
        self.remove_overlap(rect);
        self.rects.push(rect);
        self.enforce_cap();
    }

    /// Adds every member of `other`.
    pub fn add_set(&mut self, other: &Self) {
        for r in other.iter() {
            self.add(r);
        }
    }

    /// Removes `rect` from the set, splitting members that straddle it.
    ///
    /// Empty and inverted rectangles remove nothing.
    pub fn subtract(&mut self, rect: Rect) {
        if geom::is_empty(rect) {
            return;
        }
        self.remove_overlap(rect);
        self.enforce_cap();
    }

    /// Removes every member of `other`.
    pub fn subtract_set(&mut self, other: &Self) {
        for r in other.iter() {
            self.subtract(r);
        }
    }

    /// Moves every member by `offset`.
    pub fn translate(&mut self, offset: Vec2) {
        for r in &mut self.rects {
            *r = *r + offset;
        }
    }

    /// Intersects every member with `bounds`, dropping members that fall
    /// outside it. An empty or inverted `bounds` empties the set.
    pub fn clip_to(&mut self, bounds: Rect) {
        self.rects.retain_mut(|r| {
            *r = r.intersect(bounds);
            !geom::is_empty(*r)
        });
    }

    fn remove_overlap(&mut self, rect: Rect) {
        if !self.rects.iter().any(|m| geom::overlaps(*m, rect)) {
            return;
        }
        let mut pieces = Vec::with_capacity(self.rects.len() + 4);
        for m in &self.rects {
            geom::subtract_into(*m, rect, &mut pieces);
        }
        self.rects = pieces;
    }

    fn enforce_cap(&mut self) {
        if self.rects.len() <= self.max_size {
            return;
        }
        if let Some(bounds) = self.bounds() {
            self.rects.clear();
            self.rects.push(bounds);
        }
    }
}

impl From<Rect> for RectSet {
    fn from(rect: Rect) -> Self {
        let mut set = Self::new();
        set.add(rect);
        set
    }
}

impl<'a> IntoIterator for &'a RectSet {
    type Item = &'a Rect;
    type IntoIter = core::slice::Iter<'a, Rect>;

    fn into_iter(self) -> Self::IntoIter {
        self.rects.iter()
    }
}

impl fmt::Display for RectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} rects: ", self.rects.len())?;
        for (i, r) in self.rects.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "({},{})-({},{})", r.x0, r.y0, r.x1, r.y1)?;
        }
        f.write_str("]")
    }
}

fn check_capacity(max_size: usize) -> Result<(), CapacityError> {
    if max_size > 1 {
        Ok(())
    } else {
        Err(CapacityError(max_size))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
