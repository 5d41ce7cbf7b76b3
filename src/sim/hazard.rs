//! Stationary hazards ("viruses")
//!
//! A hazard periodically scans for oversized cells and reports them so the
//! owning aggregate can fragment them. It also swallows nearby consumables,
//! which only grows its own pulse; aggregate totals are unaffected.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellId, EntityId, SimTime};
use super::consumable::ConsumableSource;
use super::state::EntityIds;
use crate::unit_from_angle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardSettings {
    pub count: usize,
    /// Cells at or above this many points are fragmented on contact
    pub trigger_threshold: f32,
    pub check_radius: f32,
    /// Seconds between scans
    pub check_rate: f32,
    pub launch_speed: f32,
    pub launch_duration: f32,
    /// Safety cap on halvings per fragmentation
    pub iteration_cap: usize,
    pub base_scale: f32,
    /// Visual growth per absorbed point
    pub mass_scale_factor: f32,
    pub pulse_speed: f32,
    pub pulse_amount: f32,
    pub spawn_radius: f32,
    pub min_distance_from_center: f32,
    pub min_distance_between: f32,
    pub spawn_attempts: usize,
}

impl Default for HazardSettings {
    fn default() -> Self {
        Self {
            count: 10,
            trigger_threshold: 20.0,
            check_radius: 3.0,
            check_rate: 0.2,
            launch_speed: 20.0,
            launch_duration: 0.2,
            iteration_cap: 16,
            base_scale: 1.0,
            mass_scale_factor: 0.02,
            pulse_speed: 2.0,
            pulse_amount: 0.1,
            spawn_radius: 50.0,
            min_distance_from_center: 10.0,
            min_distance_between: 5.0,
            spawn_attempts: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub id: EntityId,
    pub pos: Vec2,
    pub absorbed_mass: f32,
    pub trigger_threshold: f32,
    pub check_radius: f32,
    check_rate: f32,
    next_check_at: SimTime,
    base_scale: f32,
    mass_scale_factor: f32,
    pulse_speed: f32,
    pulse_amount: f32,
}

impl Hazard {
    pub fn new(id: EntityId, pos: Vec2, settings: &HazardSettings) -> Self {
        Self {
            id,
            pos,
            absorbed_mass: 0.0,
            trigger_threshold: settings.trigger_threshold,
            check_radius: settings.check_radius.max(0.0),
            check_rate: settings.check_rate.max(0.0),
            next_check_at: 0.0,
            base_scale: settings.base_scale,
            mass_scale_factor: settings.mass_scale_factor,
            pulse_speed: settings.pulse_speed,
            pulse_amount: settings.pulse_amount,
        }
    }

    /// Claim the scan slot if one is due at `now`
    pub fn poll(&mut self, now: SimTime) -> bool {
        if now < self.next_check_at {
            return false;
        }
        self.next_check_at = now + SimTime::from(self.check_rate);
        true
    }

    /// Cells touching the detection radius at or above the trigger threshold
    pub fn oversized_cells(&self, cells: &[Cell]) -> Vec<CellId> {
        cells
            .iter()
            .filter(|c| c.points() >= self.trigger_threshold)
            .filter(|c| c.pos.distance(self.pos) <= self.check_radius + c.collision_radius())
            .map(|c| c.id)
            .collect()
    }

    /// Swallow consumables overlapping the detection radius
    pub fn absorb_from(&mut self, source: &mut dyn ConsumableSource) -> f32 {
        let taken = source.try_consume(self.pos, self.check_radius).unwrap_or(0.0);
        self.absorb(taken);
        taken
    }

    pub fn absorb(&mut self, amount: f32) {
        if amount > 0.0 && amount.is_finite() {
            self.absorbed_mass += amount;
        }
    }

    /// Scale before the pulse is applied
    pub fn base_scale(&self) -> f32 {
        self.base_scale + self.absorbed_mass * self.mass_scale_factor
    }

    /// Pulsing display scale at time `now`
    pub fn visual_scale(&self, now: SimTime) -> f32 {
        let phase = (now * SimTime::from(self.pulse_speed)).sin() as f32;
        self.base_scale() + phase * self.pulse_amount
    }
}

/// Scatter hazards inside the spawn ring, keeping them apart. Positions that
/// cannot be placed within the attempt budget are skipped.
pub fn place_hazards(settings: &HazardSettings, center: Vec2, ids: &mut EntityIds, rng: &mut Pcg32) -> Vec<Hazard> {
    let mut hazards: Vec<Hazard> = Vec::with_capacity(settings.count);
    let (lo, hi) = if settings.min_distance_from_center <= settings.spawn_radius {
        (settings.min_distance_from_center.max(0.0), settings.spawn_radius.max(0.0))
    } else {
        (settings.spawn_radius.max(0.0), settings.min_distance_from_center.max(0.0))
    };

    for _ in 0..settings.count {
        let placed = (0..settings.spawn_attempts.max(1)).find_map(|_| {
            let dir = unit_from_angle(rng.random_range(0.0..std::f32::consts::TAU));
            let candidate = center + dir * rng.random_range(lo..=hi);
            hazards
                .iter()
                .all(|h| h.pos.distance(candidate) >= settings.min_distance_between)
                .then_some(candidate)
        });
        match placed {
            Some(pos) => hazards.push(Hazard::new(ids.next(), pos, settings)),
            None => log::warn!(
                "Could not place hazard after {} attempts",
                settings.spawn_attempts
            ),
        }
    }
    hazards
}
