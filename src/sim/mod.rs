//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (cells in insertion order, pickups by entity ID)
//! - No rendering or platform dependencies

pub mod aggregate;
pub mod cell;
pub mod collision;
pub mod consumable;
pub mod ejecta;
pub mod growth;
pub mod hazard;
pub mod movement;
pub mod spatial;
pub mod state;
pub mod tick;

pub use aggregate::{
    Aggregate, MergeSettings, ObserverId, PendingSync, SplitCooldownPolicy, SplitSettings, TickReport,
};
pub use cell::{AggregateId, Cell, CellId, EntityId, MotionState, SimTime};
pub use collision::{Separation, circles_overlap, separation, swept_circle_hits};
pub use consumable::{ConsumableSource, Pickup, PickupField, PickupSettings};
pub use ejecta::{EjectSettings, EjectedMass};
pub use growth::{CellSize, GrowthModel};
pub use hazard::{Hazard, HazardSettings, place_hazards};
pub use movement::{Bounds, MovementModel};
pub use spatial::SpatialGrid;
pub use state::{Arena, EntityIds, OwnershipTable, PLAYER_AGGREGATE};
pub use tick::{Stepper, TickInput, TickOutcome, tick};
