// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Which cached pixels are known to be stale.

use kurbo::Rect;

use crate::geom;
use crate::rect_set::RectSet;

/// Validity of a cached pixel buffer.
///
/// `AllInvalid` is absorbing for region invalidations: once everything is
/// stale, further partial changes add nothing until the buffer is redrawn.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Validity {
    /// Every pixel reflects the scene.
    AllValid,
    /// No pixel can be trusted. This is also the state before any buffer
    /// exists.
    #[default]
    AllInvalid,
    /// The pixels inside the region (buffer coordinates) are stale; the rest
    /// are valid. The region is never empty.
    PartiallyInvalid(RectSet),
}

/// Payload-free discriminant of [`Validity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidityKind {
    /// See [`Validity::AllValid`].
    AllValid,
    /// See [`Validity::AllInvalid`].
    AllInvalid,
    /// See [`Validity::PartiallyInvalid`].
    PartiallyInvalid,
}

impl Validity {
    /// Builds the validity for a buffer whose stale pixels are `stale`.
    ///
    /// An empty region means nothing is stale.
    #[must_use]
    pub fn from_stale(stale: RectSet) -> Self {
        if stale.is_empty() {
            Self::AllValid
        } else {
            Self::PartiallyInvalid(stale)
        }
    }

    /// Returns the discriminant.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ValidityKind {
        match self {
            Self::AllValid => ValidityKind::AllValid,
            Self::AllInvalid => ValidityKind::AllInvalid,
            Self::PartiallyInvalid(_) => ValidityKind::PartiallyInvalid,
        }
    }

    /// Returns `true` for [`Validity::AllValid`].
    #[inline]
    #[must_use]
    pub fn is_all_valid(&self) -> bool {
        matches!(self, Self::AllValid)
    }

    /// Returns `true` for [`Validity::AllInvalid`].
    #[inline]
    #[must_use]
    pub fn is_all_invalid(&self) -> bool {
        matches!(self, Self::AllInvalid)
    }

    /// Returns the stale region when only part of the buffer is stale.
    #[inline]
    #[must_use]
    pub fn stale_region(&self) -> Option<&RectSet> {
        match self {
            Self::PartiallyInvalid(region) => Some(region),
            _ => None,
        }
    }

    /// Marks every pixel stale.
    pub fn invalidate_all(&mut self) {
        *self = Self::AllInvalid;
    }

    /// Marks every pixel valid.
    pub fn mark_valid(&mut self) {
        *self = Self::AllValid;
    }

    /// Adds `rect` (buffer coordinates) to the stale region.
    ///
    /// Does nothing when everything is already stale or `rect` is empty or
    /// inverted. A fresh region is created with capacity `max_size`;
    /// capacities of 0 or 1 fall back to the default. Returns `false` if
    /// `rect` was already known to be stale.
    pub fn invalidate(&mut self, rect: Rect, max_size: usize) -> bool {
        if geom::is_empty(rect) {
            return false;
        }
        match self {
            Self::AllInvalid => false,
            Self::AllValid => {
                let mut region = RectSet::with_max_size(max_size).unwrap_or_default();
                region.add(rect);
                *self = Self::PartiallyInvalid(region);
                true
            }
            Self::PartiallyInvalid(region) => {
                let covered = region.iter().any(|m| geom::contains(m, rect));
                region.add(rect);
                !covered
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_invalid() {
        assert_eq!(Validity::default(), Validity::AllInvalid);
        assert_eq!(Validity::default().kind(), ValidityKind::AllInvalid);
    }

    #[test]
    fn empty_stale_region_is_all_valid() {
        assert!(Validity::from_stale(RectSet::new()).is_all_valid());
        let v = Validity::from_stale(RectSet::from(Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(v.kind(), ValidityKind::PartiallyInvalid);
    }

    #[test]
    fn region_on_all_valid_becomes_partial() {
        let mut v = Validity::AllValid;
        assert!(v.invalidate(Rect::new(0.0, 0.0, 4.0, 4.0), 8));
        let region = v.stale_region().unwrap();
        assert_eq!(region.as_slice(), &[Rect::new(0.0, 0.0, 4.0, 4.0)]);
        assert_eq!(region.max_size(), 8);
    }

    #[test]
    fn region_on_all_invalid_is_absorbed() {
        let mut v = Validity::AllInvalid;
        assert!(!v.invalidate(Rect::new(0.0, 0.0, 4.0, 4.0), 8));
        assert!(v.is_all_invalid());
    }

    #[test]
    fn region_on_partial_unions() {
        let mut v = Validity::AllValid;
        v.invalidate(Rect::new(0.0, 0.0, 4.0, 4.0), 32);
        assert!(v.invalidate(Rect::new(10.0, 0.0, 12.0, 4.0), 32));
        assert!(!v.invalidate(Rect::new(1.0, 1.0, 2.0, 2.0), 32));
        assert_eq!(v.stale_region().unwrap().area(), 16.0 + 8.0);
    }

    #[test]
    fn empty_region_changes_nothing() {
        let mut v = Validity::AllValid;
        assert!(!v.invalidate(Rect::new(3.0, 3.0, 3.0, 9.0), 32));
        assert!(v.is_all_valid());
    }

    #[test]
    fn invalidate_all_then_mark_valid() {
        let mut v = Validity::from_stale(RectSet::from(Rect::new(0.0, 0.0, 1.0, 1.0)));
        v.invalidate_all();
        assert!(v.is_all_invalid());
        assert_eq!(v.stale_region(), None);
        v.mark_valid();
        assert!(v.is_all_valid());
    }
}
