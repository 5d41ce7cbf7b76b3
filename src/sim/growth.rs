//! Growth curve: points -> visual scale -> radii
//!
//! Pure and deterministic. Scale grows with the square root of the surplus
//! above a base threshold, so early growth is soft and late growth flattens.

use serde::{Deserialize, Serialize};

use crate::sanitize_points;

/// Smallest radius the model will report
pub const MIN_RADIUS: f32 = 0.001;

/// Tunables for the points-to-size mapping. Copied between cells on split so
/// both halves render identically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthModel {
    /// Points at or below which scale stays 1
    pub size_base_points: f32,
    /// Surplus points that map to one unit of normalized growth
    pub points_at_scale_one: f32,
    /// Multiplier applied to the sqrt growth term
    pub size_multiplier: f32,
    /// Upper clamp for the visual scale
    pub max_scale: f32,
    /// Rendered footprint radius at scale 1
    pub footprint_radius: f32,
    /// Extra capture reach added on top of the footprint
    pub eat_padding: f32,
}

impl Default for GrowthModel {
    fn default() -> Self {
        Self {
            size_base_points: 5.0,
            points_at_scale_one: 10.0,
            size_multiplier: 1.0,
            max_scale: 10.0,
            footprint_radius: 0.5,
            eat_padding: 1.0,
        }
    }
}

/// Sizing derived from a points value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSize {
    pub scale: f32,
    /// Capture radius for pickups and merge reach
    pub interaction_radius: f32,
    /// Radius used for overlap separation
    pub collision_radius: f32,
}

impl GrowthModel {
    /// Visual scale for `points`, always within `[1, max_scale]`
    pub fn scale_for(&self, points: f32) -> f32 {
        let points = sanitize_points(points);
        let surplus = (points - self.size_base_points).max(0.0);
        let denom = self.points_at_scale_one.max(0.0001);
        let growth = (surplus / denom).sqrt() * self.size_multiplier.max(0.0);
        let upper = self.max_scale.max(1.0);
        let scale = 1.0 + growth;
        if scale.is_finite() { scale.clamp(1.0, upper) } else { upper }
    }

    /// Collision radius: the rendered footprint at `scale`
    pub fn collision_radius_for(&self, scale: f32) -> f32 {
        (self.footprint_radius * scale.max(1.0)).max(MIN_RADIUS)
    }

    /// Interaction radius: footprint plus eat padding
    pub fn interaction_radius_for(&self, scale: f32) -> f32 {
        self.collision_radius_for(scale) + self.eat_padding.max(0.0)
    }

    pub fn size_for(&self, points: f32) -> CellSize {
        let scale = self.scale_for(points);
        CellSize {
            scale,
            interaction_radius: self.interaction_radius_for(scale),
            collision_radius: self.collision_radius_for(scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scale_is_one_at_or_below_base() {
        let g = GrowthModel::default();
        assert_eq!(g.scale_for(0.0), 1.0);
        assert_eq!(g.scale_for(5.0), 1.0);
        assert!(g.scale_for(5.1) > 1.0);
    }

    #[test]
    fn test_scale_sqrt_curve() {
        let g = GrowthModel::default();
        // surplus 10 / 10 = 1 -> sqrt 1 -> scale 2
        assert!((g.scale_for(15.0) - 2.0).abs() < 1e-6);
        // surplus 40 / 10 = 4 -> sqrt 2 -> scale 3
        assert!((g.scale_for(45.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_clamped_to_max() {
        let g = GrowthModel::default();
        assert_eq!(g.scale_for(1.0e9), 10.0);
        assert_eq!(g.scale_for(f32::INFINITY), 1.0); // sanitized to 0 points
    }

    #[test]
    fn test_radii_ordering() {
        let g = GrowthModel::default();
        let size = g.size_for(15.0);
        assert!((size.collision_radius - 1.0).abs() < 1e-6);
        assert!((size.interaction_radius - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_model_radii_positive() {
        let g = GrowthModel {
            footprint_radius: 0.0,
            eat_padding: -1.0,
            size_multiplier: -2.0,
            points_at_scale_one: 0.0,
            ..Default::default()
        };
        let size = g.size_for(100.0);
        assert_eq!(size.scale, 1.0);
        assert!(size.collision_radius > 0.0);
        assert!(size.interaction_radius >= size.collision_radius);
    }

    proptest! {
        #[test]
        fn prop_scale_monotonic(a in 0.0f32..10_000.0, b in 0.0f32..10_000.0) {
            let g = GrowthModel::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(g.scale_for(lo) <= g.scale_for(hi));
            let (slo, shi) = (g.size_for(lo), g.size_for(hi));
            prop_assert!(slo.collision_radius <= shi.collision_radius);
            prop_assert!(slo.interaction_radius <= shi.interaction_radius);
        }

        #[test]
        fn prop_scale_in_range(p in 0.0f32..1.0e7) {
            let g = GrowthModel::default();
            let s = g.scale_for(p);
            prop_assert!((1.0..=g.max_scale).contains(&s));
            let size = g.size_for(p);
            prop_assert!(size.interaction_radius >= size.collision_radius);
            prop_assert!(size.collision_radius > 0.0);
        }
    }
}
