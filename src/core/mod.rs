//! Core module - wires the exposed thing to its timers, bindings and directory

mod engine;
mod event_bus;
mod scheduler;

pub use engine::Engine;
pub use event_bus::{EventBus, Notification, PublishError, ThingEvent};
pub use scheduler::EmulationScheduler;

use serde::{Deserialize, Serialize};

use crate::registry::RegistrationState;

/// Point-in-time view of a running vehicle engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub running: bool,
    pub vehicle_id: String,
    pub thing_id: String,
    pub uptime_seconds: u64,
    pub notifications_published: u64,
    pub stream_clients: usize,
    /// `None` when no directory is configured
    pub registration: Option<RegistrationState>,
}
