//! Steering toward a target and keeping cells inside the arena
//!
//! Heavier cells move slower; speed never drops below `min_speed`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Speed tunables for target steering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementModel {
    pub base_speed: f32,
    pub min_speed: f32,
    /// Speed lost per point of mass
    pub speed_reduction: f32,
    /// Stop steering when this close to the target
    pub arrive_distance: f32,
}

impl Default for MovementModel {
    fn default() -> Self {
        Self {
            base_speed: 5.0,
            min_speed: 0.5,
            speed_reduction: 0.1,
            arrive_distance: 0.1,
        }
    }
}

impl MovementModel {
    pub fn speed_for(&self, points: f32) -> f32 {
        (self.base_speed - points * self.speed_reduction).max(self.min_speed)
    }

    /// Position after steering `pos` toward `target` for `dt` seconds.
    /// Never overshoots the target.
    pub fn step_toward(&self, pos: Vec2, target: Vec2, points: f32, dt: f32) -> Vec2 {
        let to_target = target - pos;
        let dist = to_target.length();
        if dist <= self.arrive_distance || !dist.is_finite() {
            return pos;
        }
        let step = (self.speed_for(points) * dt).min(dist);
        pos + to_target / dist * step
    }
}

/// Axis-aligned arena bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: Vec2::splat(-50.0),
            max: Vec2::splat(50.0),
        }
    }
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Clamp a circle's centre so the whole circle stays inside.
    /// On an axis narrower than the circle the centre snaps to the middle.
    pub fn clamp_circle(&self, pos: Vec2, radius: f32) -> Vec2 {
        let axis = |p: f32, lo: f32, hi: f32| {
            let (lo, hi) = (lo + radius, hi - radius);
            if lo > hi { (lo + hi) * 0.5 } else { p.clamp(lo, hi) }
        };
        Vec2::new(
            axis(pos.x, self.min.x, self.max.x),
            axis(pos.y, self.min.y, self.max.y),
        )
    }
}
