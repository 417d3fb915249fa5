// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Thing Description document for the smart vehicle

use std::collections::BTreeMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActionName, EventName, PropertyName, ThingError};

/// Upper bound accepted by `propServiceDistance` writes, in km
pub const MAX_SERVICE_DISTANCE: i64 = 30000;

const TD_CONTEXT: &str = "https://www.w3.org/2019/wot/td/v1";

/// JSON value type of a data schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSchema {
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
}

impl DataSchema {
    fn of(data_type: DataType) -> Self {
        Self {
            data_type,
            minimum: None,
            maximum: None,
        }
    }

    fn bounded(data_type: DataType, minimum: Option<i64>, maximum: Option<i64>) -> Self {
        Self {
            data_type,
            minimum,
            maximum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub href: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub op: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subprotocol: Option<String>,
}

impl Form {
    fn json(href: String, ops: &[&str]) -> Self {
        Self {
            href,
            op: ops.iter().map(|o| o.to_string()).collect(),
            content_type: Some("application/json".to_string()),
            subprotocol: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAffordance {
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub schema: DataSchema,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub observable: bool,
    #[serde(default)]
    pub forms: Vec<Form>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionAffordance {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<DataSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<DataSchema>,
    #[serde(default)]
    pub forms: Vec<Form>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAffordance {
    pub title: String,
    pub description: String,
    pub data: DataSchema,
    #[serde(default)]
    pub forms: Vec<Form>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    pub scheme: String,
}

/// Declarative description of the exposed vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingDescription {
    #[serde(rename = "@context")]
    pub context: Vec<serde_json::Value>,
    pub id: String,
    pub title: String,
    pub description: String,
    pub security_definitions: BTreeMap<String, SecurityScheme>,
    pub security: Vec<String>,
    pub properties: BTreeMap<String, PropertyAffordance>,
    pub actions: BTreeMap<String, ActionAffordance>,
    pub events: BTreeMap<String, EventAffordance>,
    #[serde(default)]
    pub forms: Vec<Form>,
}

impl ThingDescription {
    /// Build the description of vehicle `vehicle_number`, served from
    /// `base_url` with notifications pushed on `stream_url`.
    pub fn for_vehicle(vehicle_number: &str, base_url: &str, stream_url: &str, id: Uuid) -> Self {
        let title = format!("WoT-ID-Mfr-VIN-{}", vehicle_number);
        let root = format!("{}/{}", base_url.trim_end_matches('/'), slugify(&title));

        let properties = PropertyName::ALL
            .into_iter()
            .map(|name| (name.as_str().to_string(), property_affordance(name, &root)))
            .collect();

        let actions = ActionName::ALL
            .into_iter()
            .map(|name| (name.as_str().to_string(), action_affordance(name, &root)))
            .collect();

        let events = EventName::ALL
            .into_iter()
            .map(|name| (name.as_str().to_string(), event_affordance(name, stream_url)))
            .collect();

        let mut security_definitions = BTreeMap::new();
        security_definitions.insert(
            "nosec_sc".to_string(),
            SecurityScheme {
                scheme: "nosec".to_string(),
            },
        );

        let stream_form = Form {
            href: stream_url.to_string(),
            op: vec![
                "observeallproperties".to_string(),
                "subscribeallevents".to_string(),
            ],
            content_type: Some("application/json".to_string()),
            subprotocol: Some("websocket".to_string()),
        };

        Self {
            context: vec![
                serde_json::Value::String(TD_CONTEXT.to_string()),
                serde_json::json!({ "@language": "en" }),
            ],
            id: format!("urn:uuid:{}", id),
            title,
            description: "Smart Vehicle".to_string(),
            security_definitions,
            security: vec!["nosec_sc".to_string()],
            properties,
            actions,
            events,
            forms: vec![
                Form::json(format!("{}/properties", root), &["readallproperties"]),
                stream_form,
            ],
        }
    }

    /// Path segment the thing is served under
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }

    /// URL of the read-all-properties form
    pub fn properties_href(&self) -> Option<&str> {
        self.forms
            .iter()
            .find(|f| f.op.iter().any(|op| op == "readallproperties"))
            .map(|f| f.href.as_str())
    }

    /// URL of the notification stream form
    pub fn stream_href(&self) -> Option<&str> {
        self.forms
            .iter()
            .find(|f| f.op.iter().any(|op| op == "observeallproperties"))
            .map(|f| f.href.as_str())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Reject descriptions the thing cannot be exposed with
    pub fn validate(&self) -> Result<(), ThingError> {
        if self.title.trim().is_empty() {
            return Err(ThingError::InvalidDescription("empty title".into()));
        }
        if !self.id.starts_with("urn:") {
            return Err(ThingError::InvalidDescription(format!("id '{}' is not a URN", self.id)));
        }
        for scheme in &self.security {
            if !self.security_definitions.contains_key(scheme) {
                return Err(ThingError::InvalidDescription(format!(
                    "security '{}' has no definition",
                    scheme
                )));
            }
        }

        for name in PropertyName::ALL {
            if !self.properties.contains_key(name.as_str()) {
                return Err(ThingError::InvalidDescription(format!("missing property {}", name)));
            }
        }
        for name in ActionName::ALL {
            if !self.actions.contains_key(name.as_str()) {
                return Err(ThingError::InvalidDescription(format!("missing action {}", name)));
            }
        }
        for name in EventName::ALL {
            if !self.events.contains_key(name.as_str()) {
                return Err(ThingError::InvalidDescription(format!("missing event {}", name)));
            }
        }

        let hrefs = self
            .forms
            .iter()
            .chain(self.properties.values().flat_map(|p| p.forms.iter()))
            .chain(self.actions.values().flat_map(|a| a.forms.iter()))
            .chain(self.events.values().flat_map(|e| e.forms.iter()));
        for form in hrefs {
            Url::parse(&form.href).map_err(|e| {
                ThingError::InvalidDescription(format!("bad form href '{}': {}", form.href, e))
            })?;
        }

        if self.properties_href().is_none() {
            return Err(ThingError::InvalidDescription(
                "no readallproperties form".into(),
            ));
        }

        Ok(())
    }
}

fn slugify(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

fn property_affordance(name: PropertyName, root: &str) -> PropertyAffordance {
    let (title, description, schema) = match name {
        PropertyName::FleetId => (
            "prop-fleet-id",
            "Property fleet ID",
            DataSchema::of(DataType::String),
        ),
        PropertyName::VehicleId => (
            "prop-vehicle-id",
            "Property vehicle ID",
            DataSchema::of(DataType::String),
        ),
        PropertyName::OilLevel => (
            "prop-oil-level",
            "Property oil level",
            DataSchema::bounded(DataType::Integer, Some(0), Some(100)),
        ),
        PropertyName::TyrePressure => (
            "prop-tyre-pressure",
            "Property tyre pressure",
            DataSchema::bounded(DataType::Integer, Some(0), Some(50)),
        ),
        PropertyName::TotalMileage => (
            "prop-total-mileage",
            "Property total mileage",
            DataSchema::bounded(DataType::Integer, Some(0), None),
        ),
        PropertyName::ServiceDistance => (
            "prop-service-distance",
            "Property remaining distance until next service is due",
            DataSchema::bounded(DataType::Number, None, Some(MAX_SERVICE_DISTANCE)),
        ),
        PropertyName::DoorStatus => (
            "prop-door-status",
            "Property door status 'LOCKED' or 'UNLOCKED'",
            DataSchema::of(DataType::String),
        ),
        PropertyName::MaintenanceNeeded => (
            "prop-maintenance-needed",
            "Property maintenance needed",
            DataSchema::of(DataType::Boolean),
        ),
    };

    let ops: &[&str] = if name.is_writable() {
        &["readproperty", "writeproperty"]
    } else {
        &["readproperty"]
    };

    PropertyAffordance {
        title: title.to_string(),
        description: description.to_string(),
        schema,
        read_only: !name.is_writable(),
        observable: name.is_observable(),
        forms: vec![Form::json(format!("{}/properties/{}", root, name), ops)],
    }
}

fn action_affordance(name: ActionName, root: &str) -> ActionAffordance {
    let (title, description) = match name {
        ActionName::LockDoor => ("action-lock-door", "Action lock the car door"),
        ActionName::UnlockDoor => ("action-unlock-door", "Action unlock the car door"),
    };

    ActionAffordance {
        title: title.to_string(),
        description: description.to_string(),
        input: None,
        output: Some(DataSchema::of(DataType::String)),
        forms: vec![Form::json(format!("{}/actions/{}", root, name), &["invokeaction"])],
    }
}

fn event_affordance(name: EventName, stream_url: &str) -> EventAffordance {
    let (title, description) = match name {
        EventName::LowOnOil => ("event-low-on-oil", "Oil level dropped below its threshold"),
        EventName::LowTyrePressure => (
            "event-low-tyre-pressure",
            "Tyre pressure dropped below its threshold",
        ),
        EventName::MaintenanceNeeded => ("event-maintenance-needed", "Maintenance is required"),
    };

    EventAffordance {
        title: title.to_string(),
        description: description.to_string(),
        data: DataSchema::of(DataType::String),
        forms: vec![Form {
            href: stream_url.to_string(),
            op: vec!["subscribeevent".to_string()],
            content_type: Some("application/json".to_string()),
            subprotocol: Some("websocket".to_string()),
        }],
    }
}
