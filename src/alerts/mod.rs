// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Alerts module - threshold watching with fire-once flags
//!
//! ```text
//!  metric >= threshold           metric < threshold, flag clear
//!  ───────────────────  Clear ─────────────────────────────────► Latched
//!                                  (alerts emitted exactly once)
//! ```
//!
//! A latched flag is never cleared by the watcher, even if the metric
//! recovers. The only path back is a restart.

mod watcher;

pub use watcher::{Metric, ThresholdWatcher};

use serde::{Deserialize, Serialize};

/// Latched alert flags, one per watched metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFlags {
    pub oil_low: bool,
    pub tyre_low: bool,
    pub service_due: bool,
}

/// Why maintenance was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaintenanceReason {
    OilLow,
    TyrePressureLow,
    ServiceDue,
}

impl MaintenanceReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceReason::OilLow => "oil low",
            MaintenanceReason::TyrePressureLow => "tyre pressure low",
            MaintenanceReason::ServiceDue => "service due",
        }
    }

    /// Payload carried by `eventMaintenanceNeeded`
    pub fn message(&self) -> &'static str {
        match self {
            MaintenanceReason::OilLow => "Maintenance needed! - oil level is low.",
            MaintenanceReason::TyrePressureLow => "Maintenance needed! - tyre pressure is low.",
            MaintenanceReason::ServiceDue => "Maintenance needed! - next scheduled service is due.",
        }
    }
}

/// Alert produced by a threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alert {
    MaintenanceNeeded(MaintenanceReason),
    LowOnOil,
    LowTyrePressure,
}

/// Remembers the last `maintenanceNeeded` value a change notification went
/// out for, so concurrent crossings collapse into one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceLatch {
    last_notified: bool,
}

impl MaintenanceLatch {
    pub fn new(initial: bool) -> Self {
        Self {
            last_notified: initial,
        }
    }

    /// Returns true when `value` differs from the last notified value,
    /// recording it as notified.
    pub fn should_notify(&mut self, value: bool) -> bool {
        if self.last_notified == value {
            return false;
        }
        self.last_notified = value;
        true
    }

    /// Record a value that was notified through another path
    pub fn record(&mut self, value: bool) {
        self.last_notified = value;
    }

    pub fn last_notified(&self) -> bool {
        self.last_notified
    }
}
