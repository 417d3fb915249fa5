// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Event bus carrying property changes and thing events

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::thing::{EventName, PropertyName};

/// Something observers of the thing want to hear about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notification {
    /// An observable property changed
    Property {
        name: PropertyName,
        value: serde_json::Value,
    },
    /// A thing event was emitted
    Event { name: EventName, data: String },
}

impl Notification {
    pub fn property(name: PropertyName, value: serde_json::Value) -> Self {
        Notification::Property { name, value }
    }

    pub fn event(name: EventName, data: impl Into<String>) -> Self {
        Notification::Event {
            name,
            data: data.into(),
        }
    }

    /// Affordance name, used for subscription filtering
    pub fn topic(&self) -> &'static str {
        match self {
            Notification::Property { name, .. } => name.as_str(),
            Notification::Event { name, .. } => name.as_str(),
        }
    }

    pub fn is_property(&self, property: PropertyName) -> bool {
        matches!(self, Notification::Property { name, .. } if *name == property)
    }

    pub fn is_event(&self, event: EventName) -> bool {
        matches!(self, Notification::Event { name, .. } if *name == event)
    }
}

/// Notification stamped by the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThingEvent {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub notification: Notification,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("no subscriber is listening for '{0}'")]
    NoSubscribers(&'static str),
}

/// Central pub/sub for thing notifications
pub struct EventBus {
    event_tx: broadcast::Sender<ThingEvent>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    /// Publish to every current subscriber, returning how many received it
    pub fn publish(&self, notification: Notification) -> Result<usize, PublishError> {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let topic = notification.topic();
        let event = ThingEvent {
            id,
            timestamp: Utc::now(),
            notification,
        };
        self.event_tx
            .send(event)
            .map_err(|_| PublishError::NoSubscribers(topic))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThingEvent> {
        self.event_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }

    /// Number of notifications published so far
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
