// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Vehicle state record

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::VehicleConfig;

/// Door lock status, serialized as `LOCKED` / `UNLOCKED`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DoorStatus {
    Locked,
    Unlocked,
}

impl DoorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoorStatus::Locked => "LOCKED",
            DoorStatus::Unlocked => "UNLOCKED",
        }
    }
}

impl fmt::Display for DoorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCKED" => Ok(DoorStatus::Locked),
            "UNLOCKED" => Ok(DoorStatus::Unlocked),
            other => Err(format!("unknown door status '{}'", other)),
        }
    }
}

/// Mutable state of one emulated vehicle.
///
/// Oil level and tyre pressure are not clamped at zero; the emulation keeps
/// subtracting once a sensor has run dry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleState {
    pub fleet_id: String,
    pub vehicle_id: String,
    pub oil_level: i64,
    pub tyre_pressure: i64,
    pub total_mileage: u64,
    pub service_distance: i64,
    pub door_status: DoorStatus,
    pub maintenance_needed: bool,
}

impl VehicleState {
    /// Seed a vehicle from configuration
    pub fn from_config(config: &VehicleConfig) -> Self {
        Self {
            fleet_id: config.fleet_id.clone(),
            vehicle_id: format!("WoT-ID-Mfr-VIN-{}", config.vehicle_number),
            oil_level: config.oil_level,
            tyre_pressure: config.tyre_pressure,
            total_mileage: config.total_mileage,
            service_distance: config.service_distance,
            door_status: config.door_status,
            maintenance_needed: config.maintenance_needed,
        }
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::from_config(&VehicleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_door_status_strings() {
        assert_eq!(DoorStatus::Locked.to_string(), "LOCKED");
        assert_eq!("UNLOCKED".parse::<DoorStatus>(), Ok(DoorStatus::Unlocked));
        assert!("open".parse::<DoorStatus>().is_err());
        assert_eq!(serde_json::to_value(DoorStatus::Locked).unwrap(), "LOCKED");
    }

    #[test]
    fn test_seed_values() {
        let state = VehicleState::default();
        assert_eq!(state.vehicle_id, "WoT-ID-Mfr-VIN-1");
        assert_eq!(state.oil_level, 100);
        assert_eq!(state.tyre_pressure, 35);
        assert_eq!(state.total_mileage, 44);
        assert_eq!(state.service_distance, 15000);
        assert_eq!(state.door_status, DoorStatus::Unlocked);
        assert!(!state.maintenance_needed);
    }
}
