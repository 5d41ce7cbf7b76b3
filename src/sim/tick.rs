//! Fixed timestep simulation tick
//!
//! Advances the arena deterministically: the aggregate first, then the
//! environment it interacts with.

use glam::Vec2;

use super::state::Arena;
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Steering target in world space
    pub target: Option<Vec2>,
    /// Split toward this direction
    pub split: Option<Vec2>,
    /// Eject toward this direction
    pub eject: Option<Vec2>,
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub splits: usize,
    pub merges: usize,
    pub ejected: bool,
    /// Points captured by the player
    pub captured: f32,
    /// Cells created by hazard fragmentation
    pub fragments: usize,
}

/// Advance the arena by one timestep
pub fn tick(arena: &mut Arena, input: &TickInput, dt: f32) -> TickOutcome {
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    let mut outcome = TickOutcome::default();

    arena.player.set_target(input.target);
    if let Some(direction) = input.split {
        arena.player.request_split(direction);
    }
    if let Some(direction) = input.eject {
        arena.player.request_eject(direction);
    }

    let report = arena.player.tick(dt, &mut arena.ids, Some(&mut arena.pickups));
    outcome.splits = report.split;
    outcome.merges = report.merges;
    outcome.captured = report.captured;
    if let Some(mass) = report.ejected {
        outcome.ejected = true;
        arena.pickups.adopt(mass);
    }

    arena.pickups.tick(dt, &mut arena.ids, &mut arena.rng);

    // Hazards: swallow nearby consumables, then fragment on contact. One
    // fragmentation halves every qualifying cell, so a contact triggers once.
    let now = arena.player.now();
    for hazard in &mut arena.hazards {
        if !hazard.poll(now) {
            continue;
        }
        hazard.absorb_from(&mut arena.pickups);
        if let Some(&cell) = hazard.oversized_cells(arena.player.cells()).first() {
            outcome.fragments += arena.player.trigger_fragmentation(cell, hazard.pos, &mut arena.ids);
        }
    }

    arena.ownership.sync(&arena.player);
    arena.time_ticks += 1;
    outcome
}

/// Fixed-step accumulator driving [`tick`] from variable frame times
#[derive(Debug, Clone, Default)]
pub struct Stepper {
    accumulator: f32,
}

impl Stepper {
    /// Run as many fixed steps as `frame_dt` allows. One-shot commands are
    /// cleared from `input` once the first step has consumed them. Returns the
    /// number of steps taken.
    pub fn advance(&mut self, arena: &mut Arena, input: &mut TickInput, frame_dt: f32) -> u32 {
        let frame_dt = if frame_dt.is_finite() { frame_dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        self.accumulator += frame_dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(arena, input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            input.split = None;
            input.eject = None;
        }
        substeps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
