//! Arena state: the player aggregate plus its environment
//!
//! Everything the tick needs lives here. Ids come from one allocator so cells,
//! pickups, ejecta and hazards never collide.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::aggregate::Aggregate;
use super::cell::{AggregateId, Cell, CellId, EntityId, SimTime};
use super::consumable::PickupField;
use super::hazard::{Hazard, place_hazards};
use crate::settings::Settings;

/// Aggregate id of the single player
pub const PLAYER_AGGREGATE: AggregateId = 1;

/// Monotonic entity id allocator (0 is never handed out)
#[derive(Debug, Clone, Default)]
pub struct EntityIds {
    last: EntityId,
}

impl EntityIds {
    /// Allocate a new entity id
    pub fn next(&mut self) -> EntityId {
        self.last += 1;
        self.last
    }

    /// Most recently allocated id
    pub fn last(&self) -> EntityId {
        self.last
    }
}

/// Which aggregate owns which cell
#[derive(Debug, Clone, Default)]
pub struct OwnershipTable {
    owners: BTreeMap<CellId, AggregateId>,
}

impl OwnershipTable {
    /// Bring the entries for `aggregate` in line with its current cells
    pub fn sync(&mut self, aggregate: &Aggregate) {
        let owner = aggregate.id();
        self.owners
            .retain(|cell, o| *o != owner || aggregate.cell(*cell).is_some());
        for cell in aggregate.cells() {
            self.owners.insert(cell.id, owner);
        }
    }

    pub fn owner_of(&self, cell: CellId) -> Option<AggregateId> {
        self.owners.get(&cell).copied()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[derive(Debug)]
pub struct Arena {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub player: Aggregate,
    pub pickups: PickupField,
    pub hazards: Vec<Hazard>,
    pub ownership: OwnershipTable,
    pub(super) ids: EntityIds,
    pub(super) rng: Pcg32,
    settings: Settings,
}

impl Arena {
    /// Build an arena: seed cell at the bounds centre, pickups filled,
    /// hazards scattered
    pub fn new(settings: Settings, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut ids = EntityIds::default();
        let bounds = settings.bounds.unwrap_or_default();
        let center = bounds.center();

        let mut player = Aggregate::new(PLAYER_AGGREGATE, settings.clone(), seed.wrapping_add(1));
        player.add_cell(ids.next(), center, settings.starting_points);

        let mut pickups = PickupField::new(settings.pickups, bounds);
        pickups.fill(&mut ids, &mut rng);
        let hazards = place_hazards(&settings.hazard, center, &mut ids, &mut rng);

        let mut ownership = OwnershipTable::default();
        ownership.sync(&player);

        log::info!(
            "Arena seeded {}: {} pickups, {} hazards, starting points {}",
            seed,
            pickups.active_count(),
            hazards.len(),
            settings.starting_points
        );

        Self {
            seed,
            time_ticks: 0,
            player,
            pickups,
            hazards,
            ownership,
            ids,
            rng,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Simulated seconds
    pub fn now(&self) -> SimTime {
        self.player.now()
    }

    pub fn total_points(&self) -> f32 {
        self.player.total_points()
    }

    pub fn cells(&self) -> &[Cell] {
        self.player.cells()
    }

    pub fn centroid(&self) -> Option<Vec2> {
        self.player.centroid()
    }

    /// Route an external cell removal to the owning aggregate
    pub fn force_remove_cell(&mut self, cell: CellId) -> bool {
        match self.ownership.owner_of(cell) {
            Some(owner) if owner == self.player.id() => {
                let removed = self.player.force_remove_cell(cell);
                self.ownership.sync(&self.player);
                removed
            }
            _ => false,
        }
    }
}
