// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::thing::{PropertyName, ThingDescription};

/// Flat view of a consumed vehicle, as posted to the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSnapshot {
    pub vehicle_id: String,
    pub fleet_id: String,
    #[serde(rename = "tdURL")]
    pub td_url: String,
    pub oil_level: i64,
    pub tyre_pressure: i64,
    pub mileage: u64,
    pub next_service_distance: i64,
    pub door_status: String,
    pub maintenance_needed: bool,
}

impl Default for VehicleSnapshot {
    fn default() -> Self {
        Self {
            vehicle_id: "WoT-ID-Mfr-VIN-0000".to_string(),
            fleet_id: "N/A".to_string(),
            td_url: "http://localhost:8081/".to_string(),
            oil_level: 50,
            tyre_pressure: 30,
            mileage: 10000,
            next_service_distance: 10000,
            door_status: "LOCKED".to_string(),
            maintenance_needed: false,
        }
    }
}

impl VehicleSnapshot {
    /// Identity fields taken from the description; values stay at defaults
    pub fn from_description(description: &ThingDescription) -> Self {
        let td_url = description
            .properties_href()
            .map(|href| href.replace("properties", ""))
            .unwrap_or_else(|| Self::default().td_url);

        Self {
            vehicle_id: description.title.clone(),
            td_url,
            ..Self::default()
        }
    }

    /// Fold one property value in. Returns false when the value does not
    /// fit the field, leaving the snapshot unchanged.
    pub fn apply_property(&mut self, property: PropertyName, value: &Value) -> bool {
        let applied = match property {
            PropertyName::FleetId => value.as_str().map(|v| self.fleet_id = v.to_string()),
            PropertyName::OilLevel => value.as_i64().map(|v| self.oil_level = v),
            PropertyName::TyrePressure => value.as_i64().map(|v| self.tyre_pressure = v),
            PropertyName::TotalMileage => value.as_u64().map(|v| self.mileage = v),
            PropertyName::ServiceDistance => value.as_i64().map(|v| self.next_service_distance = v),
            PropertyName::DoorStatus => value.as_str().map(|v| self.door_status = v.to_string()),
            PropertyName::MaintenanceNeeded => value.as_bool().map(|v| self.maintenance_needed = v),
            // Identity comes from the description title
            PropertyName::VehicleId => Some(()),
        };

        if applied.is_none() {
            debug!("Ignoring {} value {} for {}", property, value, self.vehicle_id);
        }
        applied.is_some()
    }

    /// Fold a read-all-properties result in; unknown names are skipped
    pub fn apply_properties(&mut self, properties: &Map<String, Value>) {
        for (name, value) in properties {
            if let Ok(property) = name.parse::<PropertyName>() {
                self.apply_property(property, value);
            }
        }
    }
}
