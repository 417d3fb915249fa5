// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Registration of the thing description with a directory

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::Directory;
use crate::thing::ThingDescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationState {
    Unregistered,
    Registering,
    Registered,
}

/// Keeps trying to register until the directory accepts the description
pub struct RegistrationClient {
    directory: Arc<dyn Directory>,
    description: ThingDescription,
    retry_delay: Duration,
    state: Mutex<RegistrationState>,
    attempts: AtomicU32,
}

impl RegistrationClient {
    pub fn new(directory: Arc<dyn Directory>, description: ThingDescription, retry_delay: Duration) -> Self {
        Self {
            directory,
            description,
            retry_delay,
            state: Mutex::new(RegistrationState::Unregistered),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> RegistrationState {
        *self.state.lock()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// One registration attempt. Success is any status below 300.
    pub async fn attempt(&self) -> RegistrationState {
        if self.state() == RegistrationState::Registered {
            return RegistrationState::Registered;
        }

        *self.state.lock() = RegistrationState::Registering;
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let id = &self.description.id;
        let next = match self.directory.put_thing(id, &self.description.to_json()).await {
            Ok(status) if status < 300 => {
                info!("Thing {} registered with directory (status {})", id, status);
                RegistrationState::Registered
            }
            Ok(status) => {
                warn!("Failed to register {}: directory returned {}", id, status);
                RegistrationState::Unregistered
            }
            Err(e) => {
                warn!("Failed to register {}: {}", id, e);
                RegistrationState::Unregistered
            }
        };

        *self.state.lock() = next;
        next
    }

    /// Retry with a fixed delay until registered or shut down
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> RegistrationState {
        loop {
            if self.attempt().await == RegistrationState::Registered {
                return RegistrationState::Registered;
            }

            info!("Retrying registration in {:?}", self.retry_delay);
            tokio::select! {
                _ = tokio::time::sleep(self.retry_delay) => {}
                _ = shutdown.recv() => {
                    info!("Registration abandoned on shutdown");
                    return self.state();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::testing::FakeDirectory;
    use uuid::Uuid;

    fn description() -> ThingDescription {
        ThingDescription::for_vehicle("1", "http://localhost:8080/", "ws://localhost:8765/", Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_retries_until_accepted() {
        let directory = Arc::new(FakeDirectory::with_statuses(&[500, 500, 500, 201]));
        let td = description();
        let client = RegistrationClient::new(directory.clone(), td.clone(), Duration::from_millis(1));
        let (_tx, rx) = broadcast::channel(1);

        assert_eq!(client.run(rx).await, RegistrationState::Registered);
        assert_eq!(client.attempts(), 4);
        assert_eq!(directory.puts.lock().len(), 4);
        assert!(directory.puts.lock().iter().all(|id| id == &td.id));
        assert_eq!(directory.things.lock()[&td.id]["title"], "WoT-ID-Mfr-VIN-1");
    }

    #[tokio::test]
    async fn test_transport_error_leaves_unregistered() {
        let directory = Arc::new(FakeDirectory::with_statuses(&[0]));
        let client = RegistrationClient::new(directory, description(), Duration::from_millis(1));

        assert_eq!(client.attempt().await, RegistrationState::Unregistered);
        assert_eq!(client.attempt().await, RegistrationState::Registered);
    }

    #[tokio::test]
    async fn test_registered_is_terminal() {
        let directory = Arc::new(FakeDirectory::with_statuses(&[204]));
        let client = RegistrationClient::new(directory.clone(), description(), Duration::from_millis(1));

        assert_eq!(client.attempt().await, RegistrationState::Registered);
        assert_eq!(client.attempt().await, RegistrationState::Registered);
        assert_eq!(directory.puts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_retrying() {
        let directory = Arc::new(FakeDirectory::with_statuses(&[500; 64]));
        let client = Arc::new(RegistrationClient::new(directory, description(), Duration::from_secs(60)));
        let (tx, rx) = broadcast::channel(1);

        let handle = {
            let client = client.clone();
            tokio::spawn(async move { client.run(rx).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(()).unwrap();

        assert_eq!(handle.await.unwrap(), RegistrationState::Unregistered);
        assert_eq!(client.attempts(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_attempts_all_counted() {
        let directory = Arc::new(FakeDirectory::with_statuses(&[500; 64]));
        let client = Arc::new(RegistrationClient::new(directory.clone(), description(), Duration::from_millis(1)));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let client = client.clone();
            handles.push(tokio::spawn(async move { client.attempt().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), RegistrationState::Unregistered);
        }

        assert_eq!(client.attempts(), 32);
        assert_eq!(directory.puts.lock().len(), 32);
    }
}
