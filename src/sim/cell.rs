//! A single mass-bearing cell
//!
//! Derived sizing is recomputed from points through the cell's own
//! `GrowthModel` whenever points or growth tunables change.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::growth::{CellSize, GrowthModel};
use crate::{direction_or, sanitize_points};

/// Entity id, unique across cells, pickups and ejecta of one arena
pub type EntityId = u32;
pub type CellId = EntityId;
pub type AggregateId = u32;

/// Simulated seconds. Kept in f64 so long sessions still resolve a 60 Hz step.
pub type SimTime = f64;

/// Timed, non-physics impulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum MotionState {
    #[default]
    Idle,
    Launching {
        direction: Vec2,
        speed: f32,
        /// Seconds of launch left
        remaining: f32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub owner: AggregateId,
    pub pos: Vec2,
    /// Position at the end of the previous tick (for capture sweeps)
    pub last_pos: Vec2,
    pub motion: MotionState,
    points: f32,
    /// Total points this cell has captured from pickups
    consumed_points: f32,
    recombine_ready_at: SimTime,
    recombine_delay: f32,
    growth: GrowthModel,
    size: CellSize,
}

impl Cell {
    pub fn new(
        id: CellId,
        owner: AggregateId,
        pos: Vec2,
        points: f32,
        growth: GrowthModel,
        recombine_delay: f32,
    ) -> Self {
        let points = sanitize_points(points);
        Self {
            id,
            owner,
            pos,
            last_pos: pos,
            motion: MotionState::Idle,
            points,
            consumed_points: 0.0,
            recombine_ready_at: 0.0,
            recombine_delay: recombine_delay.max(0.0),
            size: growth.size_for(points),
            growth,
        }
    }

    pub fn points(&self) -> f32 {
        self.points
    }

    /// Store points (clamped to >= 0) and refresh derived sizing
    pub fn set_points(&mut self, points: f32) {
        self.points = sanitize_points(points);
        self.size = self.growth.size_for(self.points);
    }

    /// Add captured pickup points
    pub fn absorb(&mut self, points: f32) {
        let points = sanitize_points(points);
        self.consumed_points += points;
        self.set_points(self.points + points);
    }

    pub fn consumed_points(&self) -> f32 {
        self.consumed_points
    }

    /// Fold another cell's mass and tallies into this one
    pub fn merge_from(&mut self, other: &Cell) {
        self.consumed_points += other.consumed_points;
        self.set_points(self.points + other.points);
    }

    pub fn growth(&self) -> &GrowthModel {
        &self.growth
    }

    /// Copy growth tunables (from a sibling) and resize
    pub fn set_growth(&mut self, growth: GrowthModel) {
        self.growth = growth;
        self.size = self.growth.size_for(self.points);
    }

    pub fn size(&self) -> CellSize {
        self.size
    }

    pub fn scale(&self) -> f32 {
        self.size.scale
    }

    pub fn interaction_radius(&self) -> f32 {
        self.size.interaction_radius
    }

    pub fn collision_radius(&self) -> f32 {
        self.size.collision_radius
    }

    /// Begin a launch, cancelling any launch in flight
    pub fn start_launch(&mut self, direction: Vec2, speed: f32, duration: f32) {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.motion = if duration > 0.0 {
            MotionState::Launching {
                direction: direction_or(direction, Vec2::X),
                speed: if speed.is_finite() { speed } else { 0.0 },
                remaining: duration,
            }
        } else {
            MotionState::Idle
        };
    }

    pub fn is_launching(&self) -> bool {
        matches!(self.motion, MotionState::Launching { .. })
    }

    /// Advance launch motion by `dt` seconds. The final step is shortened so
    /// the covered distance is `speed * duration` at any frame rate.
    pub fn tick(&mut self, dt: f32) {
        if let MotionState::Launching {
            direction,
            speed,
            remaining,
        } = self.motion
        {
            let step = dt.max(0.0).min(remaining);
            self.pos += direction * speed * step;
            let remaining = remaining - step;
            self.motion = if remaining <= 0.0 {
                MotionState::Idle
            } else {
                MotionState::Launching {
                    direction,
                    speed,
                    remaining,
                }
            };
        }
    }

    pub fn start_recombine_cooldown(&mut self, now: SimTime) {
        self.recombine_ready_at = now + SimTime::from(self.recombine_delay);
    }

    pub fn can_recombine(&self, now: SimTime) -> bool {
        now >= self.recombine_ready_at
    }

    pub fn recombine_ready_at(&self) -> SimTime {
        self.recombine_ready_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(points: f32) -> Cell {
        Cell::new(1, 1, Vec2::ZERO, points, GrowthModel::default(), 8.0)
    }

    #[test]
    fn test_set_points_clamps() {
        let mut c = cell(10.0);
        c.set_points(-4.0);
        assert_eq!(c.points(), 0.0);
        c.set_points(f32::NAN);
        assert_eq!(c.points(), 0.0);
        assert_eq!(c.scale(), 1.0);
    }

    #[test]
    fn test_set_points_resizes() {
        let mut c = cell(5.0);
        let small = c.interaction_radius();
        c.set_points(45.0);
        assert!(c.interaction_radius() > small);
        assert!((c.scale() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_launch_runs_for_duration() {
        let mut c = cell(10.0);
        c.start_launch(Vec2::new(0.0, 2.0), 20.0, 0.2);
        for _ in 0..7 {
            c.tick(1.0 / 30.0);
        }
        assert!(!c.is_launching());
        assert!((c.pos.y - 4.0).abs() < 1e-4);
        assert!(c.pos.x.abs() < 1e-6);
    }

    #[test]
    fn test_launch_distance_frame_rate_independent() {
        let mut a = cell(10.0);
        let mut b = cell(10.0);
        a.start_launch(Vec2::X, 10.0, 0.5);
        b.start_launch(Vec2::X, 10.0, 0.5);
        a.tick(1.0);
        for _ in 0..100 {
            b.tick(0.013);
        }
        assert!((a.pos.x - 5.0).abs() < 1e-4);
        assert!((b.pos.x - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_new_launch_cancels_previous() {
        let mut c = cell(10.0);
        c.start_launch(Vec2::X, 10.0, 1.0);
        c.tick(0.1);
        c.start_launch(Vec2::NEG_Y, 5.0, 0.2);
        match c.motion {
            MotionState::Launching {
                direction,
                remaining,
                ..
            } => {
                assert_eq!(direction, Vec2::NEG_Y);
                assert!((remaining - 0.2).abs() < 1e-6);
            }
            MotionState::Idle => panic!("expected launch"),
        }
    }

    #[test]
    fn test_degenerate_launch_direction() {
        let mut c = cell(10.0);
        c.start_launch(Vec2::ZERO, 1.0, 1.0);
        c.tick(1.0);
        assert!((c.pos - Vec2::X).length() < 1e-6);
    }

    #[test]
    fn test_recombine_cooldown() {
        let mut c = cell(10.0);
        assert!(c.can_recombine(0.0));
        c.start_recombine_cooldown(1.0);
        assert_eq!(c.recombine_ready_at(), 9.0);
        assert!(!c.can_recombine(8.9));
        assert!(c.can_recombine(9.0));
    }

    #[test]
    fn test_recombine_cooldown_late_in_session() {
        let mut c = cell(10.0);
        let start = 600_000.0;
        c.start_recombine_cooldown(start);
        assert_eq!(c.recombine_ready_at(), start + 8.0);
        assert!(!c.can_recombine(start + 7.99));
        assert!(c.can_recombine(start + 8.0));
    }

    #[test]
    fn test_size_tracks_points() {
        let mut c = cell(5.0);
        c.set_points(45.0);
        assert_eq!(c.size(), GrowthModel::default().size_for(45.0));
        assert_eq!(c.size().collision_radius, c.collision_radius());
    }

    #[test]
    fn test_merge_from_sums_tallies() {
        let mut a = cell(8.0);
        let mut b = cell(8.0);
        a.absorb(1.0);
        b.absorb(2.0);
        a.merge_from(&b);
        assert_eq!(a.points(), 19.0);
        assert_eq!(a.consumed_points(), 3.0);
    }
}
