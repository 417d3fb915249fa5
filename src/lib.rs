// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! LeetFleet - Web of Things smart vehicle
//!
//! An emulated vehicle exposed as a Web of Things "thing", plus the two
//! services that live around it:
//! - the vehicle itself: sensor emulation, threshold alerts, HTTP binding,
//!   a WebSocket notification stream and directory registration
//! - a consumer that observes one vehicle and forwards its state to an
//!   ingestion endpoint
//! - a directory bridge that expires stale registrations and mirrors the
//!   live vehicles
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Vehicle Engine                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌──────────────────┐     │
//! │  │ Scheduler │ → │ ExposedThing │ ← │ HTTP binding     │     │
//! │  │ (ticks)   │   │ state+alerts │   │ read/write/act   │     │
//! │  └───────────┘   └──────────────┘   └──────────────────┘     │
//! │                         ↓                                    │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                      Event Bus                         │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                         ↓                                    │
//! │  ┌──────────────────┐          ┌─────────────────────────┐   │
//! │  │ Notification     │          │ Registration client     │   │
//! │  │ stream (ws)      │          │ (directory PUT, retry)  │   │
//! │  └──────────────────┘          └─────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//!            ↓                                   ↓
//!      ┌───────────┐                     ┌───────────────┐
//!      │ Consumer  │ → downstream        │ Directory     │ ← Bridge
//!      └───────────┘                     └───────────────┘
//! ```

#![allow(dead_code)]

pub mod alerts;
pub mod config;
pub mod consumer;
pub mod core;
pub mod registry;
pub mod sensors;
pub mod server;
pub mod thing;

// Re-exports for convenience
pub use config::Config;
pub use consumer::{Consumer, VehicleSnapshot};
pub use crate::core::{Engine, EventBus, Notification};
pub use registry::{DirectoryBridge, RegistrationClient, RegistrationState};
pub use thing::{ExposedThing, ThingDescription, ThingError};

/// LeetFleet version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// LeetFleet name
pub const NAME: &str = "LeetFleet";
