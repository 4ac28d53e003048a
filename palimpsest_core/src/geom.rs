// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle predicates used by the stale region algebra.
//!
//! All functions take [`kurbo::Rect`] in `(x0, y0, x1, y1)` form and treat it
//! as the half-open area between the edges. A rectangle with zero (or
//! negative, or NaN) width or height is empty.

use alloc::vec::Vec;

use kurbo::Rect;

/// Returns `true` if `r` covers no area.
#[inline]
#[must_use]
#[expect(
    clippy::neg_cmp_op_on_partial_ord,
    reason = "NaN edges must count as empty"
)]
pub fn is_empty(r: Rect) -> bool {
    !(r.x1 > r.x0) || !(r.y1 > r.y0)
}

/// Returns `true` if `a` and `b` share a region of positive area.
///
/// Rectangles that only touch along an edge or at a corner do not overlap.
#[inline]
#[must_use]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Returns `true` if `inner` lies entirely within `outer`, edges included.
#[inline]
#[must_use]
pub fn contains(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && inner.x1 <= outer.x1 && outer.y0 <= inner.y0 && inner.y1 <= outer.y1
}

/// Pushes the pieces of `m \ r` onto `out`.
///
/// The pieces are pairwise disjoint and non-empty: a full-height strip left
/// of `r`, a full-height strip right of `r`, and, within the shared column,
/// strips above and below `r`. When `m` and `r` do not overlap, `m` itself is
/// pushed unchanged.
pub fn subtract_into(m: Rect, r: Rect, out: &mut Vec<Rect>) {
    if is_empty(m) {
        return;
    }
    if !overlaps(m, r) {
        out.push(m);
        return;
    }

    let col_x0 = m.x0.max(r.x0);
    let col_x1 = m.x1.min(r.x1);
    let pieces = [
        Rect::new(m.x0, m.y0, r.x0.min(m.x1), m.y1),
        Rect::new(r.x1.max(m.x0), m.y0, m.x1, m.y1),
        Rect::new(col_x0, m.y0, col_x1, r.y0.min(m.y1)),
        Rect::new(col_x0, r.y1.max(m.y0), col_x1, m.y1),
    ];
    out.extend(pieces.into_iter().filter(|p| !is_empty(*p)));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn area(rects: &[Rect]) -> f64 {
        rects.iter().map(|r| r.area()).sum()
    }

    #[test]
    fn empty_detection() {
        assert!(is_empty(Rect::new(0.0, 0.0, 0.0, 10.0)));
        assert!(is_empty(Rect::new(0.0, 0.0, 10.0, 0.0)));
        assert!(is_empty(Rect::new(5.0, 0.0, 1.0, 10.0)));
        assert!(is_empty(Rect::new(f64::NAN, 0.0, 1.0, 1.0)));
        assert!(!is_empty(Rect::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!overlaps(a, Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!overlaps(a, Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(overlaps(a, Rect::new(9.5, 9.5, 20.0, 20.0)));
    }

    #[test]
    fn containment_is_inclusive() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(contains(a, a));
        assert!(contains(a, Rect::new(0.0, 2.0, 10.0, 3.0)));
        assert!(!contains(a, Rect::new(-0.1, 2.0, 10.0, 3.0)));
    }

    #[test]
    fn subtract_hole_produces_four_pieces() {
        let m = Rect::new(0.0, 0.0, 10.0, 10.0);
        let r = Rect::new(3.0, 3.0, 6.0, 6.0);
        let mut out = Vec::new();
        subtract_into(m, r, &mut out);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], Rect::new(0.0, 0.0, 3.0, 10.0));
        assert_eq!(out[1], Rect::new(6.0, 0.0, 10.0, 10.0));
        assert_eq!(out[2], Rect::new(3.0, 0.0, 6.0, 3.0));
        assert_eq!(out[3], Rect::new(3.0, 6.0, 6.0, 10.0));
        assert_eq!(area(&out), 100.0 - 9.0);
    }

    #[test]
    fn subtract_covering_rect_removes_everything() {
        let mut out = Vec::new();
        subtract_into(
            Rect::new(2.0, 2.0, 4.0, 4.0),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn subtract_disjoint_keeps_original() {
        let m = Rect::new(0.0, 0.0, 5.0, 5.0);
        let mut out = Vec::new();
        subtract_into(m, Rect::new(5.0, 0.0, 9.0, 5.0), &mut out);
        assert_eq!(out, [m]);
    }

    #[test]
    fn subtract_corner_overlap() {
        let m = Rect::new(0.0, 0.0, 10.0, 10.0);
        let r = Rect::new(5.0, 5.0, 15.0, 15.0);
        let mut out = Vec::new();
        subtract_into(m, r, &mut out);
        assert_eq!(
            out,
            [
                Rect::new(0.0, 0.0, 5.0, 10.0),
                Rect::new(5.0, 0.0, 10.0, 5.0),
            ]
        );
    }
}
