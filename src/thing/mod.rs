//! Thing module - the exposed vehicle and its description
//!
//! [`ExposedThing`] is the single owner of vehicle state. Emulation ticks,
//! property writes and action invocations all go through one mutex, and
//! every resulting notification is published on the [`EventBus`] before the
//! lock is released, so notification order matches the order of changes.

mod description;
mod error;
mod names;

pub use description::{
    ActionAffordance, DataSchema, DataType, EventAffordance, Form, PropertyAffordance,
    ThingDescription, MAX_SERVICE_DISTANCE,
};
pub use error::ThingError;
pub use names::{ActionName, EventName, PropertyName};

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::alerts::{Alert, AlertFlags, MaintenanceLatch, Metric, ThresholdWatcher};
use crate::core::{EventBus, Notification};
use crate::sensors::{DoorStatus, SensorModel, SensorTask, VehicleState};

struct Inner {
    state: VehicleState,
    flags: AlertFlags,
    latch: MaintenanceLatch,
    model: SensorModel,
}

/// The emulated vehicle as seen by the protocol layer
pub struct ExposedThing {
    description: ThingDescription,
    watcher: ThresholdWatcher,
    inner: Mutex<Inner>,
    event_bus: Arc<EventBus>,
}

impl ExposedThing {
    pub fn new(
        description: ThingDescription,
        state: VehicleState,
        model: SensorModel,
        watcher: ThresholdWatcher,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let latch = MaintenanceLatch::new(state.maintenance_needed);
        Self {
            description,
            watcher,
            inner: Mutex::new(Inner {
                state,
                flags: AlertFlags::default(),
                latch,
                model,
            }),
            event_bus,
        }
    }

    pub fn description(&self) -> &ThingDescription {
        &self.description
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> VehicleState {
        self.inner.lock().state.clone()
    }

    pub fn alert_flags(&self) -> AlertFlags {
        self.inner.lock().flags
    }

    pub fn read_property(&self, name: &str) -> Result<Value, ThingError> {
        let property = PropertyName::from_str(name)?;
        let inner = self.inner.lock();
        Ok(property_value(&inner.state, property))
    }

    pub fn read_all_properties(&self) -> Map<String, Value> {
        let inner = self.inner.lock();
        PropertyName::ALL
            .into_iter()
            .map(|p| (p.as_str().to_string(), property_value(&inner.state, p)))
            .collect()
    }

    /// Validate and commit an external write. Rejected writes leave the
    /// state untouched and notify nobody.
    pub fn write_property(&self, name: &str, value: Value) -> Result<(), ThingError> {
        let property = PropertyName::from_str(name)?;

        let mut inner = self.inner.lock();
        match property {
            PropertyName::FleetId => {
                let fleet_id = value
                    .as_str()
                    .ok_or_else(|| ThingError::validation(property.as_str(), "expected a string"))?;
                inner.state.fleet_id = fleet_id.to_string();
            }
            PropertyName::MaintenanceNeeded => {
                let needed = value
                    .as_bool()
                    .ok_or_else(|| ThingError::validation(property.as_str(), "expected a boolean"))?;
                inner.state.maintenance_needed = needed;
                inner.latch.record(needed);
            }
            PropertyName::ServiceDistance => {
                let distance = integral(&value)
                    .ok_or_else(|| ThingError::validation(property.as_str(), "expected an integral number"))?;
                if distance > MAX_SERVICE_DISTANCE {
                    return Err(ThingError::validation(
                        property.as_str(),
                        format!("{} exceeds maximum {}", distance, MAX_SERVICE_DISTANCE),
                    ));
                }
                inner.state.service_distance = distance;
            }
            other => return Err(ThingError::ReadOnly(other.as_str().to_string())),
        }

        info!("Property {} written", property);
        self.publish(Notification::property(property, property_value(&inner.state, property)));
        Ok(())
    }

    /// Invoke an action; input is ignored, neither action takes any
    pub fn invoke_action(&self, name: &str, _input: Option<Value>) -> Result<Value, ThingError> {
        let status = match ActionName::from_str(name)? {
            ActionName::LockDoor => self.lock_door(),
            ActionName::UnlockDoor => self.unlock_door(),
        };
        Ok(Value::String(status.as_str().to_string()))
    }

    pub fn lock_door(&self) -> DoorStatus {
        self.set_door(DoorStatus::Locked)
    }

    pub fn unlock_door(&self) -> DoorStatus {
        self.set_door(DoorStatus::Unlocked)
    }

    fn set_door(&self, status: DoorStatus) -> DoorStatus {
        let mut inner = self.inner.lock();
        inner.state.door_status = status;
        info!("Door {}", status);
        self.publish(Notification::property(
            PropertyName::DoorStatus,
            property_value(&inner.state, PropertyName::DoorStatus),
        ));
        status
    }

    /// Publish the current value of `property`
    pub fn notify_property_change(&self, property: PropertyName) {
        let inner = self.inner.lock();
        self.publish(Notification::property(property, property_value(&inner.state, property)));
    }

    pub fn emit_event(&self, event: EventName, payload: &str) {
        self.publish(Notification::event(event, payload));
    }

    /// Run one emulation task and publish what it produced
    pub fn tick(&self, task: SensorTask) -> Vec<Notification> {
        let mut inner = self.inner.lock();
        let mut notifications = Vec::new();
        self.apply(&mut inner, task, &mut notifications);
        self.publish_all(&notifications);
        notifications
    }

    /// Run every emulation task as one atomic batch
    pub fn run_pass(&self) -> Vec<Notification> {
        let mut inner = self.inner.lock();
        let mut notifications = Vec::new();
        for task in SensorTask::ALL {
            self.apply(&mut inner, task, &mut notifications);
        }
        self.publish_all(&notifications);
        notifications
    }

    fn apply(&self, inner: &mut Inner, task: SensorTask, out: &mut Vec<Notification>) {
        let Inner {
            state,
            flags,
            latch,
            model,
        } = inner;

        let metric = match task {
            SensorTask::Oil => {
                let level = model.decay_oil(state);
                debug!("Reading sensor - oilLevel: {}", level);
                Metric::OilLevel
            }
            SensorTask::Tyre => {
                let pressure = model.decay_tyre_pressure(state);
                debug!("Reading sensor - tyrePressure: {}", pressure);
                Metric::TyrePressure
            }
            SensorTask::Odometer => {
                let (mileage, remaining) = model.advance_odometer(state);
                debug!("Reading milometer: {}, distance left until next service: {}", mileage, remaining);
                out.push(Notification::property(PropertyName::TotalMileage, mileage.into()));
                out.push(Notification::property(PropertyName::ServiceDistance, remaining.into()));
                Metric::ServiceDistance
            }
        };

        let (new_flags, alerts) = self.watcher.evaluate_metric(metric, state, *flags);
        *flags = new_flags;

        for alert in alerts {
            match alert {
                Alert::MaintenanceNeeded(reason) => {
                    state.maintenance_needed = true;
                    info!("Maintenance needed ({}) on {}", reason.as_str(), state.vehicle_id);
                    if latch.should_notify(true) {
                        out.push(Notification::property(PropertyName::MaintenanceNeeded, Value::Bool(true)));
                    }
                    out.push(Notification::event(EventName::MaintenanceNeeded, reason.message()));
                }
                Alert::LowOnOil => {
                    out.push(Notification::event(
                        EventName::LowOnOil,
                        format!("Oil level is low: {}%", state.oil_level),
                    ));
                }
                Alert::LowTyrePressure => {
                    out.push(Notification::event(
                        EventName::LowTyrePressure,
                        format!("Tyre pressure is low: {} PSI", state.tyre_pressure),
                    ));
                }
            }
        }
    }

    fn publish_all(&self, notifications: &[Notification]) {
        for notification in notifications {
            self.publish(notification.clone());
        }
    }

    /// Never blocks, callers publish while holding the state lock
    fn publish(&self, notification: Notification) {
        if let Err(e) = self.event_bus.publish(notification) {
            warn!("Failed to publish notification: {}", e);
        }
    }
}

fn property_value(state: &VehicleState, property: PropertyName) -> Value {
    match property {
        PropertyName::FleetId => Value::String(state.fleet_id.clone()),
        PropertyName::VehicleId => Value::String(state.vehicle_id.clone()),
        PropertyName::OilLevel => state.oil_level.into(),
        PropertyName::TyrePressure => state.tyre_pressure.into(),
        PropertyName::TotalMileage => state.total_mileage.into(),
        PropertyName::ServiceDistance => state.service_distance.into(),
        PropertyName::DoorStatus => Value::String(state.door_status.as_str().to_string()),
        PropertyName::MaintenanceNeeded => Value::Bool(state.maintenance_needed),
    }
}

/// Accept integers and floats without a fractional part
fn integral(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}
