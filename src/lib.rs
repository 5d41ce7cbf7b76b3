//! Cell Arena - a split/merge cell aggregate simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (growth, cells, aggregate, hazards, pickups)
//! - `settings`: Data-driven tuning, loaded from JSON

pub mod settings;
pub mod sim;

pub use settings::{Settings, SettingsError};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the stepper will account for (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Totals closer than this are considered unchanged
    pub const POINTS_EPSILON: f32 = 0.0001;
    /// Below this length a vector has no usable direction
    pub const DIRECTION_EPSILON: f32 = 0.0001;
}

/// Normalize `v`, or return `fallback` when `v` is too short (or not finite)
#[inline]
pub fn direction_or(v: Vec2, fallback: Vec2) -> Vec2 {
    if !v.is_finite() || v.length_squared() <= consts::DIRECTION_EPSILON * consts::DIRECTION_EPSILON {
        fallback
    } else {
        v.normalize()
    }
}

/// Clamp a points value for storage: negative and non-finite become 0
#[inline]
pub fn sanitize_points(points: f32) -> f32 {
    if points.is_finite() { points.max(0.0) } else { 0.0 }
}

/// Unit vector at `theta` radians
#[inline]
pub fn unit_from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_or_normalizes() {
        let d = direction_or(Vec2::new(3.0, 4.0), Vec2::X);
        assert!((d.length() - 1.0).abs() < 1e-6);
        assert!((d.x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_direction_or_degenerate() {
        assert_eq!(direction_or(Vec2::ZERO, Vec2::X), Vec2::X);
        assert_eq!(direction_or(Vec2::new(f32::NAN, 1.0), Vec2::Y), Vec2::Y);
    }

    #[test]
    fn test_sanitize_points() {
        assert_eq!(sanitize_points(-3.0), 0.0);
        assert_eq!(sanitize_points(f32::NAN), 0.0);
        assert_eq!(sanitize_points(f32::INFINITY), 0.0);
        assert_eq!(sanitize_points(7.5), 7.5);
    }
}
