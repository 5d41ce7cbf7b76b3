//! Consumables: the source interface cells eat through, and the pickup field
//! that implements it for an arena
//!
//! Pickups are stationary and live in a spatial grid. Ejected mass moves, so
//! it is scanned linearly (there are only ever a handful in flight).

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::cell::EntityId;
use super::collision::{circles_overlap, swept_circle_hits};
use super::ejecta::EjectedMass;
use super::movement::Bounds;
use super::spatial::SpatialGrid;
use super::state::EntityIds;
use crate::sanitize_points;

/// Anything cells can eat from
pub trait ConsumableSource {
    /// Capture everything overlapping the circle. Returns the summed value,
    /// or `None` when nothing was captured.
    fn try_consume(&mut self, position: Vec2, radius: f32) -> Option<f32>;

    /// Capture everything touched by a circle swept from `from` to `to`
    fn try_consume_sweep(&mut self, from: Vec2, to: Vec2, radius: f32) -> Option<f32>;

    /// Remove a consumable without crediting anyone
    fn release(&mut self, id: EntityId);
}

/// Pickup field tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupSettings {
    pub initial_count: usize,
    pub max_on_map: usize,
    /// Seconds between respawns
    pub spawn_interval: f32,
    pub points_value: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Seconds between area captures per aggregate (sweeps run every tick)
    pub eat_check_rate: f32,
    pub grid_cell_size: f32,
}

impl Default for PickupSettings {
    fn default() -> Self {
        Self {
            initial_count: 100,
            max_on_map: 200,
            spawn_interval: 0.5,
            points_value: 1.0,
            min_radius: 0.25,
            max_radius: 0.75,
            eat_check_rate: 0.1,
            grid_cell_size: 4.0,
        }
    }
}

/// A point-valued pickup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
    pub points_value: f32,
    pub consumed: bool,
}

#[derive(Debug, Clone)]
pub struct PickupField {
    settings: PickupSettings,
    bounds: Bounds,
    /// Sorted by id
    pickups: Vec<Pickup>,
    ejecta: Vec<EjectedMass>,
    grid: SpatialGrid,
    grid_dirty: bool,
    spawn_timer: f32,
}

impl PickupField {
    pub fn new(settings: PickupSettings, bounds: Bounds) -> Self {
        Self {
            grid: SpatialGrid::new(settings.grid_cell_size),
            settings,
            bounds,
            pickups: Vec::new(),
            ejecta: Vec::new(),
            grid_dirty: false,
            spawn_timer: settings.spawn_interval,
        }
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    pub fn ejecta(&self) -> &[EjectedMass] {
        &self.ejecta
    }

    /// Unconsumed pickups on the map
    pub fn active_count(&self) -> usize {
        self.pickups.iter().filter(|p| !p.consumed).count()
    }

    /// Place a pickup at an explicit position
    pub fn spawn_at(&mut self, id: EntityId, pos: Vec2, radius: f32, points_value: f32) {
        debug_assert!(self.pickups.last().is_none_or(|p| p.id < id));
        self.pickups.push(Pickup {
            id,
            pos,
            radius: radius.max(0.0),
            points_value: sanitize_points(points_value),
            consumed: false,
        });
        self.grid_dirty = true;
    }

    /// Place a pickup at a random spot inside the bounds
    pub fn spawn_random(&mut self, ids: &mut EntityIds, rng: &mut Pcg32) {
        let pos = Vec2::new(
            rng.random_range(self.bounds.min.x..=self.bounds.max.x),
            rng.random_range(self.bounds.min.y..=self.bounds.max.y),
        );
        let (lo, hi) = if self.settings.min_radius <= self.settings.max_radius {
            (self.settings.min_radius, self.settings.max_radius)
        } else {
            (self.settings.max_radius, self.settings.min_radius)
        };
        let radius = rng.random_range(lo..=hi);
        self.spawn_at(ids.next(), pos, radius, self.settings.points_value);
    }

    /// Initial fill up to `initial_count` (never beyond `max_on_map`)
    pub fn fill(&mut self, ids: &mut EntityIds, rng: &mut Pcg32) {
        let target = self.settings.initial_count.min(self.settings.max_on_map);
        while self.active_count() < target {
            self.spawn_random(ids, rng);
        }
        log::debug!("Pickup field filled with {} pickups", self.pickups.len());
    }

    /// Take ownership of an ejected packet
    pub fn adopt(&mut self, mass: EjectedMass) {
        self.ejecta.push(mass);
    }

    /// Move ejecta, drop eaten/expired entries and respawn pickups
    pub fn tick(&mut self, dt: f32, ids: &mut EntityIds, rng: &mut Pcg32) {
        for mass in &mut self.ejecta {
            mass.tick(dt);
        }
        self.ejecta.retain(|m| !m.consumed && !m.is_expired());

        let before = self.pickups.len();
        self.pickups.retain(|p| !p.consumed);
        if self.pickups.len() != before {
            self.grid_dirty = true;
        }

        self.spawn_timer -= dt;
        if self.spawn_timer <= 0.0 {
            if self.pickups.len() < self.settings.max_on_map {
                self.spawn_random(ids, rng);
            }
            self.spawn_timer = self.settings.spawn_interval.max(0.0);
        }
    }

    fn ensure_grid(&mut self) {
        if self.grid_dirty {
            self.grid
                .rebuild(self.pickups.iter().filter(|p| !p.consumed).map(|p| (p.id, p.pos, p.radius)));
            self.grid_dirty = false;
        }
    }

    /// Mark the listed pickups consumed, returning their summed value
    fn take_pickups(&mut self, ids: &[EntityId], total: &mut f32) -> bool {
        let mut any = false;
        for &id in ids {
            if let Ok(idx) = self.pickups.binary_search_by_key(&id, |p| p.id) {
                let pickup = &mut self.pickups[idx];
                if !pickup.consumed {
                    pickup.consumed = true;
                    *total += pickup.points_value;
                    any = true;
                }
            }
        }
        any
    }

    fn take_ejecta(&mut self, hit: impl Fn(&EjectedMass) -> bool, total: &mut f32) -> bool {
        let mut any = false;
        for mass in self.ejecta.iter_mut().filter(|m| m.is_consumable()) {
            if hit(mass) {
                mass.consumed = true;
                *total += mass.points_value;
                any = true;
            }
        }
        any
    }
}

impl ConsumableSource for PickupField {
    fn try_consume(&mut self, position: Vec2, radius: f32) -> Option<f32> {
        if !position.is_finite() || !radius.is_finite() {
            return None;
        }
        self.ensure_grid();
        let nearby = self.grid.query_nearby(position, radius);
        let mut total = 0.0;
        let got_pickups = self.take_pickups(&nearby, &mut total);
        let got_ejecta = self.take_ejecta(|m| circles_overlap(position, radius, m.pos, m.radius), &mut total);
        (got_pickups || got_ejecta).then_some(total)
    }

    fn try_consume_sweep(&mut self, from: Vec2, to: Vec2, radius: f32) -> Option<f32> {
        if !from.is_finite() || !to.is_finite() || !radius.is_finite() {
            return None;
        }
        self.ensure_grid();
        let mid = (from + to) * 0.5;
        let reach = from.distance(to) * 0.5 + radius;
        let candidates = self.grid.query_nearby(mid, reach);
        let hits: Vec<EntityId> = candidates
            .into_iter()
            .filter(|id| {
                self.pickups
                    .binary_search_by_key(id, |p| p.id)
                    .map(|idx| {
                        let p = &self.pickups[idx];
                        swept_circle_hits(from, to, radius, p.pos, p.radius)
                    })
                    .unwrap_or(false)
            })
            .collect();
        let mut total = 0.0;
        let got_pickups = self.take_pickups(&hits, &mut total);
        let got_ejecta = self.take_ejecta(|m| swept_circle_hits(from, to, radius, m.pos, m.radius), &mut total);
        (got_pickups || got_ejecta).then_some(total)
    }

    fn release(&mut self, id: EntityId) {
        if let Ok(idx) = self.pickups.binary_search_by_key(&id, |p| p.id) {
            self.pickups[idx].consumed = true;
        } else if let Some(mass) = self.ejecta.iter_mut().find(|m| m.id == id) {
            mass.consumed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ejecta::EjectSettings;
    use rand::SeedableRng;

    fn field() -> PickupField {
        PickupField::new(PickupSettings::default(), Bounds::default())
    }

    #[test]
    fn test_try_consume_in_radius() {
        let mut f = field();
        f.spawn_at(1, Vec2::new(1.0, 0.0), 0.0, 2.0);
        f.spawn_at(2, Vec2::new(1.5, 0.0), 0.0, 3.0);
        f.spawn_at(3, Vec2::new(9.0, 0.0), 0.0, 4.0);

        assert_eq!(f.try_consume(Vec2::ZERO, 2.0), Some(5.0));
        // Already eaten
        assert_eq!(f.try_consume(Vec2::ZERO, 2.0), None);
        assert_eq!(f.active_count(), 1);
    }

    #[test]
    fn test_sweep_catches_pickup_between_positions() {
        let mut f = field();
        f.spawn_at(1, Vec2::new(0.0, 0.2), 0.1, 1.0);
        assert_eq!(f.try_consume(Vec2::new(-10.0, 0.0), 1.0), None);
        assert_eq!(f.try_consume(Vec2::new(10.0, 0.0), 1.0), None);
        assert_eq!(f.try_consume_sweep(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0), 1.0), Some(1.0));
    }

    #[test]
    fn test_ejecta_only_consumable_after_travel() {
        let mut f = PickupField::new(
            PickupSettings {
                max_on_map: 0,
                ..Default::default()
            },
            Bounds::default(),
        );
        let settings = EjectSettings::default();
        f.adopt(EjectedMass::new(5, Vec2::ZERO, Vec2::X, 5.0, &settings));
        assert_eq!(f.try_consume(Vec2::ZERO, 1.0), None);

        let mut ids = EntityIds::default();
        let mut rng = Pcg32::seed_from_u64(1);
        f.tick(3.0, &mut ids, &mut rng);
        let pos = f.ejecta()[0].pos;
        assert_eq!(f.try_consume(pos, 1.0), Some(5.0));
    }

    #[test]
    fn test_release_removes_without_credit() {
        let mut f = field();
        f.spawn_at(1, Vec2::ZERO, 0.5, 1.0);
        f.release(1);
        assert_eq!(f.try_consume(Vec2::ZERO, 1.0), None);
    }

    #[test]
    fn test_tick_compacts_and_respawns() {
        let mut f = field();
        let mut ids = EntityIds::default();
        let mut rng = Pcg32::seed_from_u64(7);
        f.fill(&mut ids, &mut rng);
        assert_eq!(f.pickups().len(), 100);
        assert!(f.pickups().iter().all(|p| Bounds::default().contains(p.pos)));

        let first = f.pickups()[0].id;
        f.release(first);
        f.tick(0.6, &mut ids, &mut rng);
        // one compacted, one respawned
        assert_eq!(f.pickups().len(), 100);
        assert!(f.pickups().iter().all(|p| p.id != first));
    }

    #[test]
    fn test_respawn_respects_max() {
        let settings = PickupSettings {
            initial_count: 3,
            max_on_map: 3,
            ..Default::default()
        };
        let mut f = PickupField::new(settings, Bounds::default());
        let mut ids = EntityIds::default();
        let mut rng = Pcg32::seed_from_u64(7);
        f.fill(&mut ids, &mut rng);
        for _ in 0..10 {
            f.tick(1.0, &mut ids, &mut rng);
        }
        assert_eq!(f.pickups().len(), 3);
    }
}
