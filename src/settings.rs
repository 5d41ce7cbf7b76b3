//! Simulation tuning
//!
//! Loaded from JSON. Every section falls back to defaults for missing keys,
//! so a file only needs the values it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::aggregate::{MergeSettings, SplitSettings};
use crate::sim::consumable::PickupSettings;
use crate::sim::ejecta::EjectSettings;
use crate::sim::growth::GrowthModel;
use crate::sim::hazard::HazardSettings;
use crate::sim::movement::{Bounds, MovementModel};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Complete simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub growth: GrowthModel,
    pub movement: MovementModel,
    pub split: SplitSettings,
    pub merge: MergeSettings,
    pub eject: EjectSettings,
    pub hazard: HazardSettings,
    pub pickups: PickupSettings,
    /// Arena bounds cells are clamped to. `None` leaves the plane open.
    pub bounds: Option<Bounds>,
    /// Points of the seed cell
    pub starting_points: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            growth: GrowthModel::default(),
            movement: MovementModel::default(),
            split: SplitSettings::default(),
            merge: MergeSettings::default(),
            eject: EjectSettings::default(),
            hazard: HazardSettings::default(),
            pickups: PickupSettings::default(),
            bounds: Some(Bounds::default()),
            starting_points: 10.0,
        }
    }
}

fn check_non_negative(name: &str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::Invalid(format!("{name} must be a finite value >= 0, got {value}")))
    }
}

impl Settings {
    /// Parse and validate
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Reject tunables the simulation cannot run with. Suspicious but
    /// workable values are only logged.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let g = &self.growth;
        check_non_negative("growth.size_base_points", g.size_base_points)?;
        check_non_negative("growth.size_multiplier", g.size_multiplier)?;
        check_non_negative("growth.footprint_radius", g.footprint_radius)?;
        check_non_negative("growth.eat_padding", g.eat_padding)?;
        if !(g.points_at_scale_one.is_finite() && g.points_at_scale_one > 0.0) {
            return Err(SettingsError::Invalid("growth.points_at_scale_one must be > 0".into()));
        }
        if !(g.max_scale.is_finite() && g.max_scale >= 1.0) {
            return Err(SettingsError::Invalid("growth.max_scale must be >= 1".into()));
        }

        let m = &self.movement;
        check_non_negative("movement.base_speed", m.base_speed)?;
        check_non_negative("movement.min_speed", m.min_speed)?;
        check_non_negative("movement.speed_reduction", m.speed_reduction)?;
        check_non_negative("movement.arrive_distance", m.arrive_distance)?;

        let s = &self.split;
        check_non_negative("split.threshold", s.threshold)?;
        check_non_negative("split.min_points_per_cell", s.min_points_per_cell)?;
        check_non_negative("split.launch_speed", s.launch_speed)?;
        check_non_negative("split.launch_duration", s.launch_duration)?;
        if s.max_cells == 0 {
            return Err(SettingsError::Invalid("split.max_cells must be at least 1".into()));
        }

        let mg = &self.merge;
        check_non_negative("merge.recombine_delay", mg.recombine_delay)?;
        check_non_negative("merge.check_rate", mg.check_rate)?;
        check_non_negative("merge.separation_strength", mg.separation_strength)?;
        check_non_negative("merge.separation_slack", mg.separation_slack)?;

        let e = &self.eject;
        check_non_negative("eject.min_points", e.min_points)?;
        check_non_negative("eject.point_cost", e.point_cost)?;
        check_non_negative("eject.speed", e.speed)?;
        check_non_negative("eject.travel_duration", e.travel_duration)?;
        check_non_negative("eject.lifetime", e.lifetime)?;
        check_non_negative("eject.radius", e.radius)?;
        if e.min_points < e.point_cost {
            log::warn!(
                "eject.min_points ({}) is below eject.point_cost ({}); ejects will be clamped",
                e.min_points,
                e.point_cost
            );
        }

        let h = &self.hazard;
        check_non_negative("hazard.trigger_threshold", h.trigger_threshold)?;
        check_non_negative("hazard.check_radius", h.check_radius)?;
        check_non_negative("hazard.check_rate", h.check_rate)?;
        check_non_negative("hazard.launch_speed", h.launch_speed)?;
        check_non_negative("hazard.launch_duration", h.launch_duration)?;
        check_non_negative("hazard.mass_scale_factor", h.mass_scale_factor)?;
        check_non_negative("hazard.spawn_radius", h.spawn_radius)?;
        check_non_negative("hazard.min_distance_from_center", h.min_distance_from_center)?;
        check_non_negative("hazard.min_distance_between", h.min_distance_between)?;
        if h.trigger_threshold < s.required_points() {
            log::warn!(
                "hazard.trigger_threshold ({}) is below the split requirement ({}); some contacts will not fragment",
                h.trigger_threshold,
                s.required_points()
            );
        }

        let p = &self.pickups;
        check_non_negative("pickups.spawn_interval", p.spawn_interval)?;
        check_non_negative("pickups.points_value", p.points_value)?;
        check_non_negative("pickups.min_radius", p.min_radius)?;
        check_non_negative("pickups.max_radius", p.max_radius)?;
        check_non_negative("pickups.eat_check_rate", p.eat_check_rate)?;
        if !(p.grid_cell_size.is_finite() && p.grid_cell_size > 0.0) {
            return Err(SettingsError::Invalid("pickups.grid_cell_size must be > 0".into()));
        }

        if let Some(bounds) = &self.bounds {
            if !bounds.is_valid() {
                return Err(SettingsError::Invalid(format!(
                    "bounds min {} must be below max {}",
                    bounds.min, bounds.max
                )));
            }
        }
        check_non_negative("starting_points", self.starting_points)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::aggregate::SplitCooldownPolicy;

    #[test]
    fn test_defaults_validate() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = Settings::from_json(r#"{ "split": { "max_cells": 4, "cooldown_policy": "Both" } }"#)
            .expect("valid settings");
        assert_eq!(s.split.max_cells, 4);
        assert_eq!(s.split.cooldown_policy, SplitCooldownPolicy::Both);
        assert_eq!(s.split.threshold, 20.0);
        assert_eq!(s.growth, GrowthModel::default());
        assert_eq!(s.starting_points, 10.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut s = Settings::default();
        s.merge.recombine_delay = 3.0;
        s.bounds = None;
        let back = Settings::from_json(&s.to_json().expect("serialize")).expect("parse");
        assert_eq!(back, s);
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_cap = r#"{ "split": { "max_cells": 0 } }"#;
        assert!(matches!(Settings::from_json(zero_cap), Err(SettingsError::Invalid(_))));

        let negative = r#"{ "eject": { "point_cost": -1.0 } }"#;
        assert!(matches!(Settings::from_json(negative), Err(SettingsError::Invalid(_))));

        let inverted = r#"{ "bounds": { "min": [5.0, 5.0], "max": [-5.0, -5.0] } }"#;
        assert!(matches!(Settings::from_json(inverted), Err(SettingsError::Invalid(_))));

        assert!(matches!(Settings::from_json("{ nope"), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/definitely/not/here.json").expect_err("missing file");
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("cell_arena_settings_{}.json", std::process::id()));
        let mut s = Settings::default();
        s.starting_points = 42.0;
        s.save(&path).expect("save");
        let loaded = Settings::load(&path).expect("load");
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.starting_points, 42.0);
    }
}
