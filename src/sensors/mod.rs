//! Sensor module - vehicle state and the emulated sensor model

mod model;
mod state;

pub use model::{SensorModel, SensorTask};
pub use state::{DoorStatus, VehicleState};
