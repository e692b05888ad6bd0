use super::Vec2;

/// Axis-aligned rectangle in logical pixels, origin at its top-left.
///
/// Sprite destinations, texture source rects and rectangle primitives all use
/// this type. Width and height may be negative until [`Rect::normalized`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { origin: Vec2::new(x, y), size: Vec2::new(w, h) }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        self.point_at(Vec2::new(0.5, 0.5))
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Flips negative extents so both are non-negative, keeping the covered
    /// area.
    pub fn normalized(self) -> Self {
        let (x, w) = if self.size.x < 0.0 { (self.origin.x + self.size.x, -self.size.x) } else { (self.origin.x, self.size.x) };
        let (y, h) = if self.size.y < 0.0 { (self.origin.y + self.size.y, -self.size.y) } else { (self.origin.y, self.size.y) };
        Rect::new(x, y, w, h)
    }

    /// Top-left, top-right, bottom-right, bottom-left; the vertex order of a
    /// sprite quad.
    pub fn corners(self) -> [Vec2; 4] {
        let (a, b) = (self.origin, self.max());
        [a, Vec2::new(b.x, a.y), b, Vec2::new(a.x, b.y)]
    }

    /// `uv` in `0..1` across the rect.
    #[inline]
    pub fn point_at(self, uv: Vec2) -> Vec2 {
        Vec2::new(self.origin.x + self.size.x * uv.x, self.origin.y + self.size.y * uv.y)
    }

    /// Moves every edge inward by `amount`. May produce an empty rect.
    #[inline]
    pub fn inset(self, amount: f32) -> Rect {
        Rect::new(
            self.origin.x + amount,
            self.origin.y + amount,
            self.size.x - 2.0 * amount,
            self.size.y - 2.0 * amount,
        )
    }

    #[inline]
    pub fn area(self) -> f32 {
        self.size.x.max(0.0) * self.size.y.max(0.0)
    }

    /// Half-open: the right and bottom edges are outside.
    pub fn contains(self, p: Vec2) -> bool {
        let r = self.normalized();
        let max = r.max();
        p.x >= r.origin.x && p.y >= r.origin.y && p.x < max.x && p.y < max.y
    }

    /// Overlap with positive area, if any.
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let (a, b) = (self.normalized(), other.normalized());
        let (amax, bmax) = (a.max(), b.max());
        let x0 = a.origin.x.max(b.origin.x);
        let y0 = a.origin.y.max(b.origin.y);
        let w = amax.x.min(bmax.x) - x0;
        let h = amax.y.min(bmax.y) - y0;
        (w > 0.0 && h > 0.0).then(|| Rect::new(x0, y0, w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_extents_normalize_in_place() {
        let n = Rect::new(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(n, Rect::new(6.0, 7.0, 4.0, 3.0));
        assert_eq!(Rect::new(1.0, 2.0, 3.0, 4.0).normalized(), Rect::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn corners_follow_quad_order() {
        let c = Rect::new(1.0, 2.0, 3.0, 4.0).corners();
        assert_eq!(c, [Vec2::new(1.0, 2.0), Vec2::new(4.0, 2.0), Vec2::new(4.0, 6.0), Vec2::new(1.0, 6.0)]);
    }

    #[test]
    fn pivot_points() {
        let r = Rect::new(10.0, 20.0, 40.0, 20.0);
        assert_eq!(r.center(), Vec2::new(30.0, 30.0));
        assert_eq!(r.point_at(Vec2::new(1.0, 0.0)), Vec2::new(50.0, 20.0));
    }

    #[test]
    fn inset_can_collapse() {
        assert_eq!(Rect::new(0.0, 0.0, 10.0, 8.0).inset(2.0), Rect::new(2.0, 2.0, 6.0, 4.0));
        assert!(Rect::new(0.0, 0.0, 10.0, 8.0).inset(4.0).is_empty());
    }

    #[test]
    fn containment_excludes_far_edges() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Vec2::new(0.0, 0.0)));
        assert!(r.contains(Vec2::new(9.9, 9.9)));
        assert!(!r.contains(Vec2::new(10.0, 5.0)));
        assert!(!r.contains(Vec2::new(5.0, -0.1)));
    }

    #[test]
    fn intersection_needs_positive_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersect(Rect::new(5.0, 5.0, 10.0, 10.0)), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        assert_eq!(a.intersect(Rect::new(10.0, 0.0, 10.0, 10.0)), None);
        assert_eq!(a.intersect(Rect::new(20.0, 20.0, 1.0, 1.0)), None);
    }
}
