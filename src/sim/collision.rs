//! Circle overlap and swept-circle tests
//!
//! Fast-moving cells sweep a capsule between their previous and current
//! position so pickups in between are not tunnelled through.

use glam::Vec2;

use crate::consts::DIRECTION_EPSILON;

/// Result of a separation check between two circles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Unit vector from the first centre toward the second
    pub normal: Vec2,
    /// Centre distance (never below `DIRECTION_EPSILON`)
    pub distance: f32,
}

/// True if two circles touch or overlap
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    a.distance_squared(b) <= (ra + rb) * (ra + rb)
}

/// Shortest distance from `p` to the segment `a..b`
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Does a circle of `radius` swept from `from` to `to` touch the circle at
/// `point` with `point_radius`?
#[inline]
pub fn swept_circle_hits(from: Vec2, to: Vec2, radius: f32, point: Vec2, point_radius: f32) -> bool {
    point_segment_distance(point, from, to) <= radius + point_radius
}

/// Separating axis between two centres. Coincident centres separate along +X.
pub fn separation(a: Vec2, b: Vec2) -> Separation {
    let delta = b - a;
    let d = delta.length();
    if d < DIRECTION_EPSILON || !d.is_finite() {
        Separation {
            normal: Vec2::X,
            distance: DIRECTION_EPSILON,
        }
    } else {
        Separation {
            normal: delta / d,
            distance: d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circles_overlap_touching() {
        assert!(circles_overlap(Vec2::ZERO, 1.0, Vec2::new(2.0, 0.0), 1.0));
        assert!(!circles_overlap(Vec2::ZERO, 1.0, Vec2::new(2.01, 0.0), 1.0));
    }

    #[test]
    fn test_point_segment_distance_interior() {
        let d = point_segment_distance(Vec2::new(5.0, 3.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_segment_distance_endpoint() {
        let d = point_segment_distance(Vec2::new(-3.0, 4.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_segment_distance_degenerate_segment() {
        let d = point_segment_distance(Vec2::new(0.0, 2.0), Vec2::ZERO, Vec2::ZERO);
        assert!((d - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_swept_circle_catches_tunnelled_point() {
        // Point sits between two positions that individually miss it
        let from = Vec2::new(-10.0, 0.0);
        let to = Vec2::new(10.0, 0.0);
        let point = Vec2::new(0.0, 0.5);
        assert!(!circles_overlap(from, 1.0, point, 0.1));
        assert!(!circles_overlap(to, 1.0, point, 0.1));
        assert!(swept_circle_hits(from, to, 1.0, point, 0.1));
    }

    #[test]
    fn test_separation_coincident() {
        let s = separation(Vec2::ONE, Vec2::ONE);
        assert_eq!(s.normal, Vec2::X);
        assert!(s.distance > 0.0);
    }

    #[test]
    fn test_separation_normal_points_to_second() {
        let s = separation(Vec2::ZERO, Vec2::new(0.0, -4.0));
        assert_eq!(s.normal, Vec2::NEG_Y);
        assert!((s.distance - 4.0).abs() < 1e-6);
    }
}
