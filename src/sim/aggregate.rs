//! The set of cells one player controls
//!
//! Each tick runs in a fixed order: pending syncs, split, eject, motion,
//! consumption, merge check, overlap resolution, totals. Merge is checked
//! before overlaps are resolved so separation never pushes apart a pair that
//! is about to merge.

use std::fmt;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::cell::{AggregateId, Cell, CellId, SimTime};
use super::collision::separation;
use super::consumable::ConsumableSource;
use super::ejecta::EjectedMass;
use super::state::EntityIds;
use crate::consts::{DIRECTION_EPSILON, POINTS_EPSILON};
use crate::settings::Settings;
use crate::{direction_or, unit_from_angle};

/// Which cells start a recombine cooldown on a manual split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SplitCooldownPolicy {
    /// Only the newly created cell
    #[default]
    ChildOnly,
    /// Parent and child
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitSettings {
    pub threshold: f32,
    /// Each half must keep at least this many points
    pub min_points_per_cell: f32,
    pub launch_speed: f32,
    pub launch_duration: f32,
    pub max_cells: usize,
    pub cooldown_policy: SplitCooldownPolicy,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            threshold: 20.0,
            min_points_per_cell: 5.0,
            launch_speed: 20.0,
            launch_duration: 0.2,
            max_cells: 16,
            cooldown_policy: SplitCooldownPolicy::ChildOnly,
        }
    }
}

impl SplitSettings {
    /// Points a cell needs before it may be halved
    pub fn required_points(&self) -> f32 {
        self.threshold.max(2.0 * self.min_points_per_cell)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Seconds after a split before a cell may merge
    pub recombine_delay: f32,
    /// Seconds between pairwise merge checks
    pub check_rate: f32,
    /// Units per second for resolving overlap
    pub separation_strength: f32,
    /// Overlap tolerated before separation kicks in
    pub separation_slack: f32,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            recombine_delay: 8.0,
            check_rate: 0.1,
            separation_strength: 5.0,
            separation_slack: 0.02,
        }
    }
}

/// Growth tunables to copy from `source` onto `target` at the start of the
/// next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSync {
    pub source: CellId,
    pub target: CellId,
}

/// What one aggregate tick did
#[derive(Debug, Default)]
pub struct TickReport {
    /// Cells created by a split command
    pub split: usize,
    /// Packet spawned by an eject command. The caller owns it.
    pub ejected: Option<EjectedMass>,
    pub merges: usize,
    /// Points captured from consumables
    pub captured: f32,
}

pub type ObserverId = u32;
type TotalObserver = Box<dyn FnMut(f32)>;

pub struct Aggregate {
    id: AggregateId,
    settings: Settings,
    cells: Vec<Cell>,
    total_points: f32,
    observers: Vec<(ObserverId, TotalObserver)>,
    next_observer: ObserverId,
    pending_syncs: Vec<PendingSync>,
    /// Simulated seconds since creation
    clock: SimTime,
    next_merge_check: SimTime,
    next_eat_check: SimTime,
    target: Option<Vec2>,
    queued_split: Option<Vec2>,
    queued_eject: Option<Vec2>,
    warned_no_source: bool,
    rng: Pcg32,
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("id", &self.id)
            .field("cells", &self.cells)
            .field("total_points", &self.total_points)
            .field("observers", &self.observers.len())
            .field("pending_syncs", &self.pending_syncs)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Aggregate {
    /// Create an empty aggregate. Add the seed cell with [`Aggregate::add_cell`].
    pub fn new(id: AggregateId, settings: Settings, seed: u64) -> Self {
        Self {
            id,
            settings,
            cells: Vec::new(),
            total_points: 0.0,
            observers: Vec::new(),
            next_observer: 1,
            pending_syncs: Vec::new(),
            clock: 0.0,
            next_merge_check: 0.0,
            next_eat_check: 0.0,
            target: None,
            queued_split: None,
            queued_eject: None,
            warned_no_source: false,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> AggregateId {
        self.id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Simulated seconds since creation
    pub fn now(&self) -> SimTime {
        self.clock
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }

    fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cached total, equal to the sum of cell points after every tick
    pub fn total_points(&self) -> f32 {
        self.total_points
    }

    pub fn pending_syncs(&self) -> &[PendingSync] {
        &self.pending_syncs
    }

    /// Points-weighted centre of the cells (plain average when all are empty)
    pub fn centroid(&self) -> Option<Vec2> {
        if self.cells.is_empty() {
            return None;
        }
        let total: f32 = self.cells.iter().map(|c| c.points()).sum();
        if total <= POINTS_EPSILON {
            let sum: Vec2 = self.cells.iter().map(|c| c.pos).sum();
            return Some(sum / self.cells.len() as f32);
        }
        let weighted: Vec2 = self.cells.iter().map(|c| c.pos * c.points()).sum();
        Some(weighted / total)
    }

    /// Add a cell using the aggregate's growth tunables
    pub fn add_cell(&mut self, id: CellId, pos: Vec2, points: f32) -> CellId {
        let cell = Cell::new(
            id,
            self.id,
            pos,
            points,
            self.settings.growth,
            self.settings.merge.recombine_delay,
        );
        self.cells.push(cell);
        self.recompute_totals(true);
        id
    }

    /// Register a total-points observer. It is called once right away with
    /// the current total.
    pub fn subscribe(&mut self, mut observer: impl FnMut(f32) + 'static) -> ObserverId {
        let id = self.next_observer;
        self.next_observer += 1;
        observer(self.total_points);
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    /// Steer every cell toward `target` (or stop steering)
    pub fn set_target(&mut self, target: Option<Vec2>) {
        self.target = target.filter(|t| t.is_finite());
    }

    /// Queue a split toward `direction` for the next tick
    pub fn request_split(&mut self, direction: Vec2) {
        self.queued_split = Some(direction);
    }

    /// Queue an eject toward `direction` for the next tick
    pub fn request_eject(&mut self, direction: Vec2) {
        self.queued_eject = Some(direction);
    }

    /// Advance one tick of `dt` seconds
    pub fn tick(
        &mut self,
        dt: f32,
        ids: &mut EntityIds,
        consumables: Option<&mut dyn ConsumableSource>,
    ) -> TickReport {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += SimTime::from(dt);
        let mut report = TickReport::default();

        self.apply_pending_syncs();
        if let Some(direction) = self.queued_split.take() {
            report.split = self.handle_split(direction, ids);
        }
        if let Some(direction) = self.queued_eject.take() {
            report.ejected = self.handle_eject(direction, ids);
        }
        self.advance_cells(dt);
        report.captured = self.consume(consumables);
        report.merges = self.handle_merge_tick();
        self.resolve_overlaps(dt);
        self.recompute_totals(false);
        report
    }

    fn apply_pending_syncs(&mut self) {
        for sync in std::mem::take(&mut self.pending_syncs) {
            let Some(growth) = self.cell(sync.source).map(|c| *c.growth()) else {
                continue;
            };
            if let Some(target) = self.cell_mut(sync.target) {
                target.set_growth(growth);
            }
        }
    }

    /// Halve every eligible cell toward `direction`. Returns the number of
    /// new cells.
    pub fn handle_split(&mut self, direction: Vec2, ids: &mut EntityIds) -> usize {
        let split = self.settings.split;
        let required = split.required_points();
        let slots = split.max_cells.saturating_sub(self.cells.len());
        if slots == 0 {
            log::debug!("Split ignored: aggregate {} at {} cells", self.id, self.cells.len());
            return 0;
        }

        let mut eligible: Vec<usize> = (0..self.cells.len())
            .filter(|&i| self.cells[i].points() >= required)
            .collect();
        if eligible.is_empty() {
            return 0;
        }
        // Stable sort: equal points keep insertion order
        eligible.sort_by(|&a, &b| self.cells[b].points().total_cmp(&self.cells[a].points()));
        eligible.truncate(slots);

        let direction = direction_or(direction, Vec2::X);
        let now = self.clock;
        let recombine_delay = self.settings.merge.recombine_delay;
        let mut spawned = Vec::with_capacity(eligible.len());
        for idx in eligible {
            let parent = &mut self.cells[idx];
            let half = parent.points() * 0.5;
            if half < split.min_points_per_cell {
                log::debug!("Split of cell {} rejected: half {} below minimum", parent.id, half);
                continue;
            }
            parent.set_points(half);
            if split.cooldown_policy == SplitCooldownPolicy::Both {
                parent.start_recombine_cooldown(now);
            }

            let mut child = Cell::new(ids.next(), self.id, parent.pos, half, *parent.growth(), recombine_delay);
            child.start_recombine_cooldown(now);
            child.start_launch(direction, split.launch_speed, split.launch_duration);
            self.pending_syncs.push(PendingSync {
                source: parent.id,
                target: child.id,
            });
            spawned.push(child);
        }

        let count = spawned.len();
        if count > 0 {
            self.cells.extend(spawned);
            log::debug!("Aggregate {} split into {} cells", self.id, self.cells.len());
            self.recompute_totals(true);
        }
        count
    }

    /// Expel a packet from the largest eligible cell
    pub fn handle_eject(&mut self, direction: Vec2, ids: &mut EntityIds) -> Option<EjectedMass> {
        let eject = self.settings.eject;
        let idx = self.largest_at_least(eject.min_points)?;
        let direction = direction_or(direction, Vec2::X);

        let cell = &mut self.cells[idx];
        let before = cell.points();
        let cost = eject.point_cost.max(0.0);
        let deducted = cost.min(before);
        if deducted < cost {
            log::warn!(
                "Eject from cell {} clamped: {} points available, cost {}",
                cell.id,
                before,
                cost
            );
        }
        cell.set_points(before - deducted);
        let spawn_pos = cell.pos + direction * cell.collision_radius();
        let mass = EjectedMass::new(ids.next(), spawn_pos, direction, deducted, &eject);

        self.recompute_totals(true);
        Some(mass)
    }

    fn advance_cells(&mut self, dt: f32) {
        let movement = self.settings.movement;
        let bounds = self.settings.bounds;
        let target = self.target;
        for cell in &mut self.cells {
            cell.last_pos = cell.pos;
            if let Some(target) = target {
                cell.pos = movement.step_toward(cell.pos, target, cell.points(), dt);
            }
            cell.tick(dt);
            if let Some(bounds) = bounds {
                cell.pos = bounds.clamp_circle(cell.pos, cell.collision_radius());
            }
        }
    }

    /// Sweep every cell's path and, at the eat check rate, its area
    fn consume(&mut self, consumables: Option<&mut dyn ConsumableSource>) -> f32 {
        let Some(source) = consumables else {
            if !self.warned_no_source {
                log::warn!("Aggregate {} has no consumable source bound", self.id);
                self.warned_no_source = true;
            }
            return 0.0;
        };

        let area_due = self.clock >= self.next_eat_check;
        if area_due {
            self.next_eat_check = self.clock + SimTime::from(self.settings.pickups.eat_check_rate);
        }

        let mut captured = 0.0;
        for cell in &mut self.cells {
            let radius = cell.interaction_radius();
            let mut gained = 0.0;
            if cell.last_pos.distance(cell.pos) > DIRECTION_EPSILON {
                gained += source.try_consume_sweep(cell.last_pos, cell.pos, radius).unwrap_or(0.0);
            }
            if area_due {
                gained += source.try_consume(cell.pos, radius).unwrap_or(0.0);
            }
            if gained > 0.0 {
                cell.absorb(gained);
                captured += gained;
            }
        }
        captured
    }

    fn can_merge(a: &Cell, b: &Cell, now: SimTime) -> bool {
        a.can_recombine(now)
            && b.can_recombine(now)
            && a.pos.distance(b.pos) <= a.interaction_radius() + b.interaction_radius()
    }

    /// Pairwise merge check, rate-limited. Returns the number of merges.
    pub fn handle_merge_tick(&mut self) -> usize {
        if self.clock < self.next_merge_check {
            return 0;
        }
        self.next_merge_check = self.clock + SimTime::from(self.settings.merge.check_rate);

        let now = self.clock;
        let mut merges = 0;
        let mut i = 0;
        while i < self.cells.len() {
            let mut j = i + 1;
            while j < self.cells.len() {
                if Self::can_merge(&self.cells[i], &self.cells[j], now) {
                    let absorbed = self.cells.remove(j);
                    self.cells[i].merge_from(&absorbed);
                    self.pending_syncs
                        .retain(|s| s.source != absorbed.id && s.target != absorbed.id);
                    log::debug!("Cell {} merged into {}", absorbed.id, self.cells[i].id);
                    merges += 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }

        if merges > 0 {
            self.recompute_totals(true);
        }
        merges
    }

    /// Push apart overlapping pairs that cannot merge yet
    pub fn resolve_overlaps(&mut self, dt: f32) {
        let now = self.clock;
        let merge = self.settings.merge;
        let n = self.cells.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.cells[i], &self.cells[j]);
                if a.can_recombine(now) && b.can_recombine(now) {
                    continue;
                }
                let reach = a.collision_radius() + b.collision_radius() - merge.separation_slack;
                let sep = separation(a.pos, b.pos);
                if sep.distance < reach {
                    let overlap = reach - sep.distance;
                    let correction = sep.normal * (overlap * merge.separation_strength * dt * 0.5);
                    self.cells[i].pos -= correction;
                    self.cells[j].pos += correction;
                }
            }
        }
    }

    /// Re-sum cell points; notify observers on change or when forced.
    /// Returns whether observers were notified.
    pub fn recompute_totals(&mut self, force: bool) -> bool {
        let total: f32 = self.cells.iter().map(|c| c.points()).sum();
        if !force && (total - self.total_points).abs() <= POINTS_EPSILON {
            return false;
        }
        self.total_points = total;
        for (_, observer) in &mut self.observers {
            observer(total);
        }
        true
    }

    /// Hazard contact: repeatedly halve the largest qualifying cell, launching
    /// each new half away from `hazard_pos`. Returns the number of new cells.
    pub fn trigger_fragmentation(&mut self, cell: CellId, hazard_pos: Vec2, ids: &mut EntityIds) -> usize {
        if self.cell(cell).is_none() {
            return 0;
        }
        let split = self.settings.split;
        let hazard = self.settings.hazard;
        let required = split.required_points();
        let now = self.clock;
        let recombine_delay = self.settings.merge.recombine_delay;

        let mut created = 0;
        let mut capped = true;
        for _ in 0..hazard.iteration_cap {
            if self.cells.len() >= split.max_cells {
                capped = false;
                break;
            }
            let Some(idx) = self.largest_at_least(required) else {
                capped = false;
                break;
            };
            let half = self.cells[idx].points() * 0.5;
            if half < split.min_points_per_cell {
                capped = false;
                break;
            }

            let away = self.cells[idx].pos - hazard_pos;
            let direction = if away.length() < DIRECTION_EPSILON {
                unit_from_angle(self.rng.random_range(0.0..std::f32::consts::TAU))
            } else {
                away.normalize()
            };

            let parent = &mut self.cells[idx];
            parent.set_points(half);
            parent.start_recombine_cooldown(now);
            let mut child = Cell::new(ids.next(), self.id, parent.pos, half, *parent.growth(), recombine_delay);
            child.start_recombine_cooldown(now);
            child.start_launch(direction, hazard.launch_speed, hazard.launch_duration);
            self.pending_syncs.push(PendingSync {
                source: parent.id,
                target: child.id,
            });
            self.cells.push(child);
            created += 1;
        }
        if capped && hazard.iteration_cap > 0 {
            log::debug!("Fragmentation of aggregate {} stopped at safety cap", self.id);
        }

        if created > 0 {
            log::debug!("Hazard fragmented aggregate {} into {} cells", self.id, self.cells.len());
            self.recompute_totals(true);
        }
        created
    }

    /// External destruction of a cell (e.g. out of bounds)
    pub fn force_remove_cell(&mut self, cell: CellId) -> bool {
        let Some(idx) = self.cells.iter().position(|c| c.id == cell) else {
            return false;
        };
        self.cells.remove(idx);
        self.pending_syncs.retain(|s| s.source != cell && s.target != cell);
        if self.cells.is_empty() {
            log::info!("Aggregate {} has no cells left", self.id);
        }
        self.recompute_totals(true);
        true
    }

    /// Index of the largest cell with at least `min` points (first on ties)
    fn largest_at_least(&self, min: f32) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.points() >= min && best.is_none_or(|b| cell.points() > self.cells[b].points()) {
                best = Some(i);
            }
        }
        best
    }
}
