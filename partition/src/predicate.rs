//! Same-component predicates used by the partitioner.

use crate::rect::Rect;

/// Decides whether two rectangles belong to the same group.
///
/// Implementations are evaluated concurrently by every lane and must be
/// symmetric: `same_component(a, b) == same_component(b, a)`.
pub trait ComponentPredicate: Sync {
    fn same_component(&self, a: &Rect, b: &Rect) -> bool;
}

impl<F> ComponentPredicate for F
where
    F: Fn(&Rect, &Rect) -> bool + Sync,
{
    #[inline]
    fn same_component(&self, a: &Rect, b: &Rect) -> bool {
        self(a, b)
    }
}

/// Scale-relative similarity test for duplicate detections.
///
/// Two boxes match when both their top-left and bottom-right corners are
/// within `delta = eps * (min(w1, w2) + min(h1, h2)) / 2` of each other on
/// both axes. Larger boxes tolerate proportionally larger offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InSameComponent {
    pub eps: f32,
}

impl InSameComponent {
    pub fn new(eps: f32) -> Self {
        assert!(
            eps.is_finite() && eps >= 0.0,
            "eps must be finite and non-negative, got {eps}"
        );
        Self { eps }
    }

    /// Corner tolerance for the pair, in pixels.
    #[inline]
    pub fn delta(&self, a: &Rect, b: &Rect) -> f32 {
        let min_sizes = a.width.min(b.width) as i64 + a.height.min(b.height) as i64;
        self.eps * min_sizes as f32 * 0.5
    }
}

impl ComponentPredicate for InSameComponent {
    #[inline]
    fn same_component(&self, a: &Rect, b: &Rect) -> bool {
        let delta = self.delta(a, b);
        let within = |p: i64, q: i64| p.abs_diff(q) as f32 <= delta;

        within(a.x as i64, b.x as i64)
            && within(a.y as i64, b.y as i64)
            && within(a.right(), b.right())
            && within(a.bottom(), b.bottom())
    }
}
