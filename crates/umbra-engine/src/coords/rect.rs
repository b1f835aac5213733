use super::Vec2;

/// Axis-aligned rectangle in surface pixels (top-left origin).
///
/// Also used in normalized texture space for crops, where `(0, 0, 1, 1)` is
/// the whole texture.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    /// Bottom-right corner.
    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Smallest rectangle containing every point; the default rect for no points.
    pub fn bounding(points: &[Vec2]) -> Self {
        let Some((first, rest)) = points.split_first() else { return Rect::default() };
        let (lo, hi) = rest.iter().fold((*first, *first), |(lo, hi), p| {
            (Vec2::new(lo.x.min(p.x), lo.y.min(p.y)), Vec2::new(hi.x.max(p.x), hi.y.max(p.y)))
        });
        Rect { origin: lo, size: hi - lo }
    }

    /// Overlap of two rectangles with non-negative sizes. Touching edges do not overlap.
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let (a, b) = (self.max(), other.max());
        let lo = Vec2::new(self.origin.x.max(other.origin.x), self.origin.y.max(other.origin.y));
        let hi = Vec2::new(a.x.min(b.x), a.y.min(b.y));
        let overlap = Rect { origin: lo, size: hi - lo };
        (!overlap.is_empty()).then_some(overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_of_a_diamond_is_its_square() {
        let pts = [
            Vec2::new(5.0, 0.0),
            Vec2::new(10.0, 5.0),
            Vec2::new(5.0, 10.0),
            Vec2::new(0.0, 5.0),
        ];
        assert_eq!(Rect::bounding(&pts), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(Rect::bounding(&[]), Rect::default());
    }

    #[test]
    fn intersect_clips_to_the_overlap() {
        let screen = Rect::new(0.0, 0.0, 800.0, 600.0);
        let sprite = Rect::new(780.0, -10.0, 40.0, 40.0);
        assert_eq!(screen.intersect(sprite), Some(Rect::new(780.0, 0.0, 20.0, 30.0)));
    }

    #[test]
    fn touching_or_disjoint_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersect(Rect::new(10.0, 0.0, 10.0, 10.0)).is_none());
        assert!(a.intersect(Rect::new(-50.0, -50.0, 5.0, 5.0)).is_none());
    }

    #[test]
    fn zero_area_is_empty() {
        assert!(Rect::new(3.0, 3.0, 0.0, 5.0).is_empty());
        assert!(!Rect::new(3.0, 3.0, 1.0, 1.0).is_empty());
    }
}
