// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Configuration module

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::sensors::DoorStatus;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity and starting values of the emulated vehicle
    pub vehicle: VehicleConfig,

    /// Emulation tick periods and random draw ranges
    pub emulation: EmulationConfig,

    /// Alert thresholds
    pub thresholds: ThresholdConfig,

    /// Directory registration
    pub registration: RegistrationConfig,

    /// HTTP binding and notification stream
    pub server: ServerConfig,

    /// Consumer (snapshot forwarder)
    pub consumer: ConsumerConfig,

    /// Directory bridge
    pub bridge: BridgeConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("leetfleet"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject values the emulation cannot run with
    pub fn validate(&self) -> Result<()> {
        let emulation = &self.emulation;
        for (name, range) in [
            ("oil_decay", emulation.oil_decay),
            ("tyre_decay", emulation.tyre_decay),
            ("odometer_step", emulation.odometer_step),
        ] {
            if range.min > range.max {
                bail!("emulation.{} has min {} above max {}", name, range.min, range.max);
            }
        }

        for (name, ms) in [
            ("oil_interval_ms", emulation.oil_interval_ms),
            ("tyre_interval_ms", emulation.tyre_interval_ms),
            ("odometer_interval_ms", emulation.odometer_interval_ms),
        ] {
            if ms == 0 {
                bail!("emulation.{} must be greater than zero", name);
            }
        }

        if self.bridge.interval_secs == 0 {
            bail!("bridge.interval_secs must be greater than zero");
        }

        if self.vehicle.vehicle_number.trim().is_empty() {
            bail!("vehicle.vehicle_number must not be empty");
        }

        Ok(())
    }
}

/// Vehicle identity and seed values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Number injected into the thing title (`WoT-ID-Mfr-VIN-<n>`)
    pub vehicle_number: String,

    pub fleet_id: String,

    /// Oil level in percent
    pub oil_level: i64,

    /// Tyre pressure in PSI
    pub tyre_pressure: i64,

    /// Odometer reading in km
    pub total_mileage: u64,

    /// Remaining distance until the next service in km
    pub service_distance: i64,

    pub door_status: DoorStatus,

    pub maintenance_needed: bool,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            vehicle_number: "1".to_string(),
            fleet_id: "not_defined".to_string(),
            oil_level: 100,
            tyre_pressure: 35,
            total_mileage: 44,
            service_distance: 15000,
            door_status: DoorStatus::Unlocked,
            maintenance_needed: false,
        }
    }
}

/// Inclusive bounds for a uniform integer draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRange {
    pub min: u32,
    pub max: u32,
}

impl DrawRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// Emulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulationConfig {
    /// Delay before the first tick, gives registration a head start
    pub startup_delay_ms: u64,

    pub oil_interval_ms: u64,

    pub tyre_interval_ms: u64,

    pub odometer_interval_ms: u64,

    /// Fixed RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,

    /// Oil lost per oil tick, in percent
    pub oil_decay: DrawRange,

    /// Pressure lost per tyre tick, in PSI
    pub tyre_decay: DrawRange,

    /// Distance driven per odometer tick, in km
    pub odometer_step: DrawRange,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: 2000,
            oil_interval_ms: 5000,
            tyre_interval_ms: 10000,
            odometer_interval_ms: 1000,
            seed: None,
            oil_decay: DrawRange::new(0, 5),
            tyre_decay: DrawRange::new(0, 3),
            odometer_step: DrawRange::new(100, 999),
        }
    }
}

impl EmulationConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn oil_interval(&self) -> Duration {
        Duration::from_millis(self.oil_interval_ms)
    }

    pub fn tyre_interval(&self) -> Duration {
        Duration::from_millis(self.tyre_interval_ms)
    }

    pub fn odometer_interval(&self) -> Duration {
        Duration::from_millis(self.odometer_interval_ms)
    }
}

/// Alert thresholds, a metric strictly below its threshold raises the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub oil_level: i64,
    pub tyre_pressure: i64,
    pub service_distance: i64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            oil_level: 70,
            tyre_pressure: 20,
            service_distance: 500,
        }
    }
}

/// Directory registration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Directory things endpoint, e.g. `http://localhost:9000/api/things/`.
    /// Registration is disabled when absent.
    pub directory_url: Option<String>,

    pub retry_delay_secs: u64,

    pub timeout_secs: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            directory_url: None,
            retry_delay_secs: 15,
            timeout_secs: 10,
        }
    }
}

impl RegistrationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP binding and notification stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub http_port: u16,
    pub websocket_port: u16,
    pub websocket_max_clients: usize,

    /// Base URL advertised in the thing description forms
    pub public_host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: 8080,
            websocket_port: 8765,
            websocket_max_clients: 64,
            public_host: "localhost".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn http_base_url(&self) -> String {
        format!("http://{}:{}/", self.public_host, self.http_port)
    }

    pub fn stream_url(&self) -> String {
        format!("ws://{}:{}/", self.public_host, self.websocket_port)
    }
}

/// Consumer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Directory things endpoint used to look up `thing_id`
    pub directory_url: String,

    pub thing_id: Option<String>,

    /// Direct thing description URL, takes precedence over the directory lookup
    pub td_url: Option<String>,

    /// Notification stream URL, defaults to the one advertised in the description
    pub stream_url: Option<String>,

    /// Ingestion endpoint receiving snapshots and event messages
    pub downstream_url: String,

    pub timeout_secs: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            directory_url: "http://localhost:9000/api/things/".to_string(),
            thing_id: None,
            td_url: None,
            stream_url: None,
            downstream_url: "http://webportal:8080/wot".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Directory bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub directory_url: String,
    pub interval_secs: u64,

    /// Registrations older than this are deleted from the directory
    pub expiry_secs: u64,

    pub timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            directory_url: "http://localhost:9000/api/things/".to_string(),
            interval_secs: 60,
            expiry_secs: 3600,
            timeout_secs: 10,
        }
    }
}
