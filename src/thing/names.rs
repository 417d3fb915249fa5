// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Affordance names exposed by the vehicle

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ThingError;

/// Property affordances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyName {
    #[serde(rename = "propFleetId")]
    FleetId,
    #[serde(rename = "propVehicleId")]
    VehicleId,
    #[serde(rename = "propOilLevel")]
    OilLevel,
    #[serde(rename = "propTyrePressure")]
    TyrePressure,
    #[serde(rename = "propTotalMileage")]
    TotalMileage,
    #[serde(rename = "propServiceDistance")]
    ServiceDistance,
    #[serde(rename = "propDoorStatus")]
    DoorStatus,
    #[serde(rename = "propMaintenanceNeeded")]
    MaintenanceNeeded,
}

impl PropertyName {
    pub const ALL: [PropertyName; 8] = [
        PropertyName::FleetId,
        PropertyName::VehicleId,
        PropertyName::OilLevel,
        PropertyName::TyrePressure,
        PropertyName::TotalMileage,
        PropertyName::ServiceDistance,
        PropertyName::DoorStatus,
        PropertyName::MaintenanceNeeded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyName::FleetId => "propFleetId",
            PropertyName::VehicleId => "propVehicleId",
            PropertyName::OilLevel => "propOilLevel",
            PropertyName::TyrePressure => "propTyrePressure",
            PropertyName::TotalMileage => "propTotalMileage",
            PropertyName::ServiceDistance => "propServiceDistance",
            PropertyName::DoorStatus => "propDoorStatus",
            PropertyName::MaintenanceNeeded => "propMaintenanceNeeded",
        }
    }

    /// Accepts external writes
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            PropertyName::FleetId | PropertyName::ServiceDistance | PropertyName::MaintenanceNeeded
        )
    }

    /// Pushes change notifications to observers
    pub fn is_observable(&self) -> bool {
        matches!(
            self,
            PropertyName::TotalMileage
                | PropertyName::ServiceDistance
                | PropertyName::DoorStatus
                | PropertyName::MaintenanceNeeded
                | PropertyName::FleetId
        )
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyName {
    type Err = ThingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ThingError::UnknownProperty(s.to_string()))
    }
}

/// Action affordances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionName {
    #[serde(rename = "actionLockDoor")]
    LockDoor,
    #[serde(rename = "actionUnlockDoor")]
    UnlockDoor,
}

impl ActionName {
    pub const ALL: [ActionName; 2] = [ActionName::LockDoor, ActionName::UnlockDoor];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::LockDoor => "actionLockDoor",
            ActionName::UnlockDoor => "actionUnlockDoor",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = ThingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ThingError::UnknownAction(s.to_string()))
    }
}

/// Event affordances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "eventLowOnOil")]
    LowOnOil,
    #[serde(rename = "eventLowTyrePressure")]
    LowTyrePressure,
    #[serde(rename = "eventMaintenanceNeeded")]
    MaintenanceNeeded,
}

impl EventName {
    pub const ALL: [EventName; 3] = [
        EventName::LowOnOil,
        EventName::LowTyrePressure,
        EventName::MaintenanceNeeded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::LowOnOil => "eventLowOnOil",
            EventName::LowTyrePressure => "eventLowTyrePressure",
            EventName::MaintenanceNeeded => "eventMaintenanceNeeded",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = ThingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| ThingError::UnknownEvent(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_serde() {
        for property in PropertyName::ALL {
            let json = serde_json::to_value(property).unwrap();
            assert_eq!(json, property.as_str());
            assert_eq!(property.as_str().parse::<PropertyName>().unwrap(), property);
        }
        for event in EventName::ALL {
            assert_eq!(serde_json::to_value(event).unwrap(), event.as_str());
        }
    }

    #[test]
    fn test_unknown_names() {
        assert!(matches!(
            "propColour".parse::<PropertyName>(),
            Err(ThingError::UnknownProperty(_))
        ));
        assert!(matches!(
            "actionHonk".parse::<ActionName>(),
            Err(ThingError::UnknownAction(_))
        ));
    }

    #[test]
    fn test_writable_set() {
        let writable: Vec<_> = PropertyName::ALL.into_iter().filter(|p| p.is_writable()).collect();
        assert_eq!(
            writable,
            vec![
                PropertyName::FleetId,
                PropertyName::ServiceDistance,
                PropertyName::MaintenanceNeeded
            ]
        );
        assert!(!PropertyName::OilLevel.is_observable());
    }
}
