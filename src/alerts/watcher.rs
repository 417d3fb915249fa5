// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Threshold watcher

use serde::{Deserialize, Serialize};

use super::{Alert, AlertFlags, MaintenanceReason};
use crate::config::ThresholdConfig;
use crate::sensors::VehicleState;

/// Metrics with an alert threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    OilLevel,
    TyrePressure,
    ServiceDistance,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::OilLevel, Metric::TyrePressure, Metric::ServiceDistance];
}

/// Pure evaluation of vehicle state against fixed thresholds
#[derive(Debug, Clone, Copy)]
pub struct ThresholdWatcher {
    thresholds: ThresholdConfig,
}

impl ThresholdWatcher {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Check every metric. Conditions are independent; several may fire.
    pub fn evaluate(&self, state: &VehicleState, flags: AlertFlags) -> (AlertFlags, Vec<Alert>) {
        let mut flags = flags;
        let mut alerts = Vec::new();
        for metric in Metric::ALL {
            self.check(metric, state, &mut flags, &mut alerts);
        }
        (flags, alerts)
    }

    /// Check a single metric, used by the per-sensor ticks
    pub fn evaluate_metric(
        &self,
        metric: Metric,
        state: &VehicleState,
        flags: AlertFlags,
    ) -> (AlertFlags, Vec<Alert>) {
        let mut flags = flags;
        let mut alerts = Vec::new();
        self.check(metric, state, &mut flags, &mut alerts);
        (flags, alerts)
    }

    fn check(&self, metric: Metric, state: &VehicleState, flags: &mut AlertFlags, alerts: &mut Vec<Alert>) {
        match metric {
            Metric::OilLevel => {
                if state.oil_level < self.thresholds.oil_level && !flags.oil_low {
                    flags.oil_low = true;
                    alerts.push(Alert::MaintenanceNeeded(MaintenanceReason::OilLow));
                    alerts.push(Alert::LowOnOil);
                }
            }
            Metric::TyrePressure => {
                if state.tyre_pressure < self.thresholds.tyre_pressure && !flags.tyre_low {
                    flags.tyre_low = true;
                    alerts.push(Alert::MaintenanceNeeded(MaintenanceReason::TyrePressureLow));
                    alerts.push(Alert::LowTyrePressure);
                }
            }
            Metric::ServiceDistance => {
                if state.service_distance < self.thresholds.service_distance && !flags.service_due {
                    flags.service_due = true;
                    alerts.push(Alert::MaintenanceNeeded(MaintenanceReason::ServiceDue));
                }
            }
        }
    }
}

impl Default for ThresholdWatcher {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_fires_above_thresholds() {
        let watcher = ThresholdWatcher::default();
        let (flags, alerts) = watcher.evaluate(&VehicleState::default(), AlertFlags::default());
        assert_eq!(flags, AlertFlags::default());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_oil_crossing_fires_once() {
        let watcher = ThresholdWatcher::default();
        let mut state = VehicleState::default();
        state.oil_level = 69;

        let (flags, alerts) = watcher.evaluate(&state, AlertFlags::default());
        assert!(flags.oil_low);
        assert_eq!(
            alerts,
            vec![Alert::MaintenanceNeeded(MaintenanceReason::OilLow), Alert::LowOnOil]
        );

        state.oil_level = 40;
        let (again, alerts) = watcher.evaluate(&state, flags);
        assert_eq!(again, flags);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let watcher = ThresholdWatcher::default();
        let mut state = VehicleState::default();
        state.oil_level = 70;
        state.tyre_pressure = 20;
        state.service_distance = 500;

        let (_, alerts) = watcher.evaluate(&state, AlertFlags::default());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_all_metrics_fire_independently() {
        let watcher = ThresholdWatcher::default();
        let mut state = VehicleState::default();
        state.oil_level = 10;
        state.tyre_pressure = 5;
        state.service_distance = -20;

        let (flags, alerts) = watcher.evaluate(&state, AlertFlags::default());
        assert!(flags.oil_low && flags.tyre_low && flags.service_due);
        assert_eq!(alerts.len(), 5);
        assert!(alerts.contains(&Alert::MaintenanceNeeded(MaintenanceReason::ServiceDue)));
        assert!(alerts.contains(&Alert::LowTyrePressure));
    }

    #[test]
    fn test_evaluate_metric_ignores_other_metrics() {
        let watcher = ThresholdWatcher::default();
        let mut state = VehicleState::default();
        state.oil_level = 10;
        state.tyre_pressure = 5;

        let (flags, alerts) = watcher.evaluate_metric(Metric::TyrePressure, &state, AlertFlags::default());
        assert!(flags.tyre_low);
        assert!(!flags.oil_low);
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn test_flags_stay_latched_after_recovery() {
        let watcher = ThresholdWatcher::default();
        let mut state = VehicleState::default();
        state.tyre_pressure = 10;
        let (flags, _) = watcher.evaluate(&state, AlertFlags::default());

        state.tyre_pressure = 35;
        let (flags, alerts) = watcher.evaluate(&state, flags);
        assert!(flags.tyre_low);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let watcher = ThresholdWatcher::new(ThresholdConfig {
            oil_level: 101,
            tyre_pressure: 0,
            service_distance: 0,
        });
        let (flags, _) = watcher.evaluate(&VehicleState::default(), AlertFlags::default());
        assert!(flags.oil_low);
        assert!(!flags.tyre_low);
    }
}
