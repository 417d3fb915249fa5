// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Directory bridge - expires stale registrations and mirrors live things

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{Directory, DirectoryEntry};
use crate::consumer::{ThingReader, VehicleSnapshot};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub live: usize,
    pub expired: usize,
    pub refreshed: usize,
    pub dropped: usize,
}

pub struct DirectoryBridge {
    directory: Arc<dyn Directory>,
    reader: Arc<dyn ThingReader>,
    expiry: Duration,
    snapshots: Mutex<HashMap<String, VehicleSnapshot>>,
}

impl DirectoryBridge {
    pub fn new(directory: Arc<dyn Directory>, reader: Arc<dyn ThingReader>, expiry: Duration) -> Self {
        Self {
            directory,
            reader,
            expiry,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn snapshot(&self, id: &str) -> Option<VehicleSnapshot> {
        self.snapshots.lock().get(id).cloned()
    }

    pub fn tracked(&self) -> usize {
        self.snapshots.lock().len()
    }

    fn is_expired(&self, entry: &DirectoryEntry, now: DateTime<Utc>) -> bool {
        entry
            .created()
            .and_then(|created| now.signed_duration_since(created).to_std().ok())
            .map(|age| age > self.expiry)
            .unwrap_or(false)
    }

    /// One pass: delete expired things, refresh the rest, forget the unlisted
    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<ReconcileReport> {
        let entries = self.directory.list_things().await?;
        let mut report = ReconcileReport::default();
        let mut live = Vec::new();

        for entry in entries {
            if self.is_expired(&entry, now) {
                info!("Registration of {} expired, removing from directory", entry.id);
                if let Err(e) = self.directory.delete_thing(&entry.id).await {
                    warn!("Failed to delete {}: {}", entry.id, e);
                }
                self.snapshots.lock().remove(&entry.id);
                report.expired += 1;
            } else {
                live.push(entry);
            }
        }

        for entry in &live {
            let td_url = {
                let mut snapshots = self.snapshots.lock();
                let snapshot = snapshots.entry(entry.id.clone()).or_insert_with(|| {
                    debug!("Tracking {}", entry.id);
                    let mut snapshot = VehicleSnapshot::default();
                    if let Some(title) = &entry.title {
                        snapshot.vehicle_id = title.clone();
                    }
                    snapshot
                });
                if let Some(url) = entry.td_url() {
                    snapshot.td_url = url;
                }
                snapshot.td_url.clone()
            };

            let url = format!("{}/properties", td_url.trim_end_matches('/'));
            match self.reader.get_json(&url).await {
                Ok(Value::Object(properties)) => {
                    if let Some(snapshot) = self.snapshots.lock().get_mut(&entry.id) {
                        snapshot.apply_properties(&properties);
                    }
                    report.refreshed += 1;
                }
                Ok(other) => warn!("Unexpected properties from {}: {}", url, other),
                Err(e) => warn!("Failed to refresh {}: {}", entry.id, e),
            }
        }

        let listed: HashSet<&str> = live.iter().map(|e| e.id.as_str()).collect();
        {
            let mut snapshots = self.snapshots.lock();
            let before = snapshots.len();
            snapshots.retain(|id, _| listed.contains(id.as_str()));
            report.dropped = before - snapshots.len();
        }

        report.live = live.len();
        Ok(report)
    }

    /// Reconcile every `interval` until shutdown
    pub async fn run(&self, interval: Duration, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.reconcile(Utc::now()).await {
                        Ok(report) => info!(
                            "Directory reconciled: {} live, {} expired, {} refreshed, {} dropped",
                            report.live, report.expired, report.refreshed, report.dropped
                        ),
                        Err(e) => warn!("Directory reconciliation failed: {}", e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Directory bridge stopping");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::testing::FakeDirectory;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeReader(HashMap<String, Value>);

    #[async_trait]
    impl ThingReader for FakeReader {
        async fn get_json(&self, url: &str) -> Result<Value> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("404 for {}", url))
        }
    }

    fn entry(id: &str, n: u32, created: &str) -> Value {
        json!({
            "id": id,
            "title": format!("WoT-ID-Mfr-VIN-{}", n),
            "registration": { "created": created },
            "forms": [{
                "href": format!("http://car{}:8080/wot-id-mfr-vin-{}/properties", n, n),
                "op": ["readallproperties"]
            }]
        })
    }

    fn now() -> DateTime<Utc> {
        "2026-05-01T12:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn test_expired_things_deleted() {
        let directory = Arc::new(FakeDirectory::default());
        directory.insert(entry("urn:uuid:old", 1, "2026-05-01T10:30:00Z"));
        directory.insert(entry("urn:uuid:new", 2, "2026-05-01T11:30:00Z"));

        let reader = Arc::new(FakeReader(HashMap::from([(
            "http://car2:8080/wot-id-mfr-vin-2/properties".to_string(),
            json!({ "propOilLevel": 61, "propTotalMileage": 720 }),
        )])));
        let bridge = DirectoryBridge::new(directory.clone(), reader, Duration::from_secs(3600));

        let report = bridge.reconcile(now()).await.unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.live, 1);
        assert_eq!(report.refreshed, 1);
        assert_eq!(*directory.deleted.lock(), vec!["urn:uuid:old".to_string()]);

        let snapshot = bridge.snapshot("urn:uuid:new").unwrap();
        assert_eq!(snapshot.vehicle_id, "WoT-ID-Mfr-VIN-2");
        assert_eq!(snapshot.td_url, "http://car2:8080/wot-id-mfr-vin-2/");
        assert_eq!(snapshot.oil_level, 61);
        assert_eq!(snapshot.mileage, 720);
        assert!(bridge.snapshot("urn:uuid:old").is_none());
    }

    #[tokio::test]
    async fn test_unlisted_things_dropped() {
        let directory = Arc::new(FakeDirectory::default());
        directory.insert(entry("urn:uuid:a", 1, "2026-05-01T11:59:00Z"));
        directory.insert(entry("urn:uuid:b", 2, "2026-05-01T11:59:00Z"));
        let bridge = DirectoryBridge::new(
            directory.clone(),
            Arc::new(FakeReader(HashMap::new())),
            Duration::from_secs(3600),
        );

        let report = bridge.reconcile(now()).await.unwrap();
        assert_eq!(report.live, 2);
        assert_eq!(report.refreshed, 0);
        assert_eq!(bridge.tracked(), 2);

        directory.things.lock().remove("urn:uuid:a");
        let report = bridge.reconcile(now()).await.unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(bridge.tracked(), 1);
        assert!(bridge.snapshot("urn:uuid:b").is_some());
    }

    #[tokio::test]
    async fn test_missing_created_never_expires() {
        let directory = Arc::new(FakeDirectory::default());
        directory.insert(json!({ "id": "urn:uuid:bare" }));
        let bridge = DirectoryBridge::new(
            directory.clone(),
            Arc::new(FakeReader(HashMap::new())),
            Duration::from_secs(1),
        );

        let report = bridge.reconcile(now()).await.unwrap();
        assert_eq!(report.expired, 0);
        assert!(directory.deleted.lock().is_empty());
        assert_eq!(bridge.snapshot("urn:uuid:bare").unwrap().vehicle_id, "WoT-ID-Mfr-VIN-0000");
    }
}
