//! # Road geometry
//!
//! Planar line segment primitives used to measure the vehicle against the road centreline.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cross products with magnitude below this are treated as parallel lines.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Tolerance on the segment parameters of an intersection, so that a line through a shared
/// vertex is not lost to rounding on both neighbouring segments.
const PARAM_EPSILON: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A straight segment between two points in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start_m: Point2<f64>,
    pub end_m: Point2<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Segment {
    pub fn new(start_m: Point2<f64>, end_m: Point2<f64>) -> Self {
        Self { start_m, end_m }
    }

    /// Build a segment centred on `centre_m` reaching `scale` times `direction` either side of it.
    pub fn centred(centre_m: Point2<f64>, direction: Vector2<f64>, scale: f64) -> Self {
        let half = direction * scale;
        Self {
            start_m: centre_m - half,
            end_m: centre_m + half,
        }
    }

    /// The vector from the start to the end of the segment
    pub fn direction(&self) -> Vector2<f64> {
        self.end_m - self.start_m
    }

    pub fn length_m(&self) -> f64 {
        self.direction().norm()
    }

    /// Get the point on the segment closest to `point_m`.
    pub fn closest_point(&self, point_m: &Point2<f64>) -> Point2<f64> {
        let dir = self.direction();
        let len_sq = dir.norm_squared();

        // Degenerate segments collapse to their start point
        if len_sq == 0.0 {
            return self.start_m;
        }

        let t = ((point_m - self.start_m).dot(&dir) / len_sq).max(0.0).min(1.0);

        self.start_m + dir * t
    }

    /// Euclidean distance from `point_m` to the nearest point of the segment.
    pub fn distance_to(&self, point_m: &Point2<f64>) -> f64 {
        (point_m - self.closest_point(point_m)).norm()
    }

    /// Find the intersection point of this segment with `other`.
    ///
    /// Where the segments are collinear and overlap, the overlapping point nearest to the start of
    /// `self` is returned.
    pub fn intersection(&self, other: &Segment) -> Option<Point2<f64>> {
        let r = self.direction();
        let q = other.direction();
        let start_diff = other.start_m - self.start_m;

        let denom = r.perp(&q);

        if denom.abs() < PARALLEL_EPSILON {
            // Parallel but not on the same line
            if start_diff.perp(&r).abs() >= PARALLEL_EPSILON {
                return None;
            }
            return self.collinear_overlap(other);
        }

        let t = start_diff.perp(&q) / denom;
        let u = start_diff.perp(&r) / denom;

        let on_segment = |p: f64| (-PARAM_EPSILON..=1.0 + PARAM_EPSILON).contains(&p);

        if on_segment(t) && on_segment(u) {
            Some(self.start_m + r * t.max(0.0).min(1.0))
        }
        else {
            None
        }
    }

    fn collinear_overlap(&self, other: &Segment) -> Option<Point2<f64>> {
        let r = self.direction();
        let len_sq = r.norm_squared();

        if len_sq == 0.0 {
            return match other.distance_to(&self.start_m) < PARALLEL_EPSILON {
                true => Some(self.start_m),
                false => None,
            };
        }

        // Parameters of other's endpoints along self
        let t_a = (other.start_m - self.start_m).dot(&r) / len_sq;
        let t_b = (other.end_m - self.start_m).dot(&r) / len_sq;

        let lo = t_a.min(t_b).max(0.0);
        let hi = t_a.max(t_b).min(1.0);

        if lo <= hi {
            Some(self.start_m + r * lo)
        }
        else {
            None
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_distance_to() {
        let seg = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));

        assert_eq!(seg.distance_to(&Point2::new(5.0, 5.0)), 5.0);
        assert_eq!(seg.distance_to(&Point2::new(-3.0, 4.0)), 5.0);
        assert_eq!(seg.distance_to(&Point2::new(13.0, -4.0)), 5.0);
        assert_eq!(seg.distance_to(&Point2::new(7.0, 0.0)), 0.0);

        let point = Segment::new(Point2::new(1.0, 1.0), Point2::new(1.0, 1.0));
        assert_eq!(point.distance_to(&Point2::new(4.0, 5.0)), 5.0);
    }

    #[test]
    fn test_intersection() {
        let seg = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));

        // Crossing
        let cross = Segment::new(Point2::new(2.0, -1.0), Point2::new(4.0, 1.0));
        let p = seg.intersection(&cross).unwrap();
        assert!((p - Point2::new(3.0, 0.0)).norm() < 1e-9);
        let p = cross.intersection(&seg).unwrap();
        assert!((p - Point2::new(3.0, 0.0)).norm() < 1e-9);

        // Too short to reach
        let short = Segment::new(Point2::new(2.0, 5.0), Point2::new(2.0, 1.0));
        assert_eq!(seg.intersection(&short), None);

        // Parallel
        let parallel = Segment::new(Point2::new(0.0, 1.0), Point2::new(10.0, 1.0));
        assert_eq!(seg.intersection(&parallel), None);

        // Collinear and overlapping
        let overlap = Segment::new(Point2::new(12.0, 0.0), Point2::new(6.0, 0.0));
        let p = seg.intersection(&overlap).unwrap();
        assert!((p - Point2::new(6.0, 0.0)).norm() < 1e-9);

        // Touching at an endpoint
        let touching = Segment::new(Point2::new(10.0, 0.0), Point2::new(12.0, 3.0));
        let p = seg.intersection(&touching).unwrap();
        assert!((p - Point2::new(10.0, 0.0)).norm() < 1e-9);

        // Collinear and disjoint
        let disjoint = Segment::new(Point2::new(11.0, 0.0), Point2::new(15.0, 0.0));
        assert_eq!(seg.intersection(&disjoint), None);
    }

    #[test]
    fn test_centred() {
        let seg = Segment::centred(Point2::new(1.0, 2.0), Vector2::new(0.0, 1.0), 5.0);

        assert_eq!(seg.start_m, Point2::new(1.0, -3.0));
        assert_eq!(seg.end_m, Point2::new(1.0, 7.0));
        assert_eq!(seg.length_m(), 10.0);
    }
}
