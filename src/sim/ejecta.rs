//! Mass packets voluntarily expelled by a cell
//!
//! Spawned by the aggregate, then owned by the environment: a packet travels
//! for a fixed duration, becomes consumable, and expires after its lifetime.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::cell::EntityId;
use crate::{direction_or, sanitize_points};

/// Eject tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EjectSettings {
    /// Smallest cell that may eject
    pub min_points: f32,
    /// Points removed from the ejecting cell
    pub point_cost: f32,
    pub speed: f32,
    /// Seconds of travel before the packet can be eaten
    pub travel_duration: f32,
    /// Seconds until the packet disappears
    pub lifetime: f32,
    /// Collision radius of a packet
    pub radius: f32,
}

impl Default for EjectSettings {
    fn default() -> Self {
        Self {
            min_points: 10.0,
            point_cost: 5.0,
            speed: 15.0,
            travel_duration: 2.0,
            lifetime: 10.0,
            radius: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EjectedMass {
    pub id: EntityId,
    pub pos: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub points_value: f32,
    pub radius: f32,
    /// Seconds of travel left; consumable once this reaches 0
    pub travel_remaining: f32,
    /// Seconds until expiry
    pub lifetime_remaining: f32,
    pub consumed: bool,
}

impl EjectedMass {
    pub fn new(id: EntityId, pos: Vec2, direction: Vec2, points_value: f32, settings: &EjectSettings) -> Self {
        Self {
            id,
            pos,
            direction: direction_or(direction, Vec2::X),
            speed: settings.speed,
            points_value: sanitize_points(points_value),
            radius: settings.radius.max(0.0),
            travel_remaining: settings.travel_duration.max(0.0),
            lifetime_remaining: settings.lifetime.max(0.0),
            consumed: false,
        }
    }

    /// Travel finished and not yet eaten
    pub fn is_consumable(&self) -> bool {
        !self.consumed && self.travel_remaining <= 0.0
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime_remaining <= 0.0
    }

    pub fn tick(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        if self.travel_remaining > 0.0 {
            let step = dt.min(self.travel_remaining);
            self.pos += self.direction * self.speed * step;
            self.travel_remaining -= step;
        }
        self.lifetime_remaining -= dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_then_consumable() {
        let settings = EjectSettings::default();
        let mut m = EjectedMass::new(1, Vec2::ZERO, Vec2::new(2.0, 0.0), 5.0, &settings);
        assert!(!m.is_consumable());
        m.tick(1.0);
        assert!(!m.is_consumable());
        m.tick(1.5);
        assert!(m.is_consumable());
        // 2 s of travel at 15 u/s
        assert!((m.pos.x - 30.0).abs() < 1e-4);
        assert!(!m.is_expired());
    }

    #[test]
    fn test_expires_after_lifetime() {
        let settings = EjectSettings::default();
        let mut m = EjectedMass::new(1, Vec2::ZERO, Vec2::Y, 5.0, &settings);
        for _ in 0..11 {
            m.tick(1.0);
        }
        assert!(m.is_expired());
    }

    #[test]
    fn test_points_sanitized() {
        let m = EjectedMass::new(1, Vec2::ZERO, Vec2::ZERO, -2.0, &EjectSettings::default());
        assert_eq!(m.points_value, 0.0);
        assert_eq!(m.direction, Vec2::X);
    }
}
