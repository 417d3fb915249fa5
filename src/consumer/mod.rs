// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Consumer - observes a vehicle thing and forwards its state downstream
//!
//! The consumer fetches the thing description, reads every property once
//! to seed a [`VehicleSnapshot`], posts it, then follows the notification
//! stream. Observed property changes re-post the whole snapshot; events
//! post a one-line text message.

mod snapshot;

pub use snapshot::VehicleSnapshot;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::ConsumerConfig;
use crate::core::Notification;
use crate::thing::{EventName, ThingDescription};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Where snapshots and event messages end up
#[async_trait]
pub trait Downstream: Send + Sync {
    async fn post_snapshot(&self, snapshot: &VehicleSnapshot) -> Result<()>;

    async fn post_message(&self, message: &str) -> Result<()>;
}

/// HTTP ingestion endpoint; any status of 300 or above is a failure
pub struct HttpDownstream {
    url: String,
    client: reqwest::Client,
}

impl HttpDownstream {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build downstream client")?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Downstream for HttpDownstream {
    async fn post_snapshot(&self, snapshot: &VehicleSnapshot) -> Result<()> {
        let response = self.client.post(&self.url).json(snapshot).send().await?;
        if response.status().as_u16() >= 300 {
            bail!("downstream rejected snapshot: {}", response.status());
        }
        Ok(())
    }

    async fn post_message(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(message.to_string())
            .send()
            .await?;
        if response.status().as_u16() >= 300 {
            bail!("downstream rejected message: {}", response.status());
        }
        Ok(())
    }
}

/// Reads JSON documents exposed by a thing or a directory
#[async_trait]
pub trait ThingReader: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}

pub struct HttpThingReader {
    client: reqwest::Client,
}

impl HttpThingReader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build thing client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ThingReader for HttpThingReader {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// What a notification turns into on the downstream side
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Snapshot(VehicleSnapshot),
    Message(String),
}

fn event_phrase(event: EventName) -> &'static str {
    match event {
        EventName::LowOnOil => "is low on oil",
        EventName::LowTyrePressure => "has low tyre pressure",
        EventName::MaintenanceNeeded => "requires maintenance",
    }
}

/// Where to fetch the description from: an explicit URL wins over a
/// directory lookup by id
pub fn description_url(config: &ConsumerConfig) -> Result<String> {
    if let Some(url) = &config.td_url {
        return Ok(url.clone());
    }
    let id = config
        .thing_id
        .as_deref()
        .ok_or_else(|| anyhow!("either a thing id or a description URL is required"))?;
    Ok(format!("{}/{}", config.directory_url.trim_end_matches('/'), id))
}

pub struct Consumer {
    description: ThingDescription,
    downstream: Arc<dyn Downstream>,
    snapshot: Mutex<VehicleSnapshot>,
}

impl Consumer {
    pub fn new(description: ThingDescription, downstream: Arc<dyn Downstream>) -> Self {
        let snapshot = VehicleSnapshot::from_description(&description);
        Self {
            description,
            downstream,
            snapshot: Mutex::new(snapshot),
        }
    }

    pub fn description(&self) -> &ThingDescription {
        &self.description
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        self.snapshot.lock().clone()
    }

    /// Seed the snapshot with one read of every property
    pub async fn initialise(&self, reader: &dyn ThingReader) -> Result<()> {
        let href = self
            .description
            .properties_href()
            .ok_or_else(|| anyhow!("{} has no readallproperties form", self.description.title))?;

        let properties = match reader.get_json(href).await? {
            Value::Object(map) => map,
            other => bail!("expected a property map from {}, got {}", href, other),
        };
        self.seed(&properties);
        Ok(())
    }

    pub fn seed(&self, properties: &Map<String, Value>) {
        self.snapshot.lock().apply_properties(properties);
    }

    /// Fold a notification into the snapshot and decide what to post
    pub fn apply(&self, notification: &Notification) -> Option<Outbound> {
        match notification {
            Notification::Property { name, value } => {
                if !name.is_observable() {
                    return None;
                }
                let mut snapshot = self.snapshot.lock();
                if !snapshot.apply_property(*name, value) {
                    return None;
                }
                Some(Outbound::Snapshot(snapshot.clone()))
            }
            Notification::Event { name, .. } => {
                let vehicle_id = self.snapshot.lock().vehicle_id.clone();
                info!("Vehicle {} {}", vehicle_id, event_phrase(*name));
                Some(Outbound::Message(format!(
                    "Event message - vehicle {} {}",
                    vehicle_id,
                    event_phrase(*name)
                )))
            }
        }
    }

    pub async fn handle(&self, notification: &Notification) {
        if let Some(outbound) = self.apply(notification) {
            self.deliver(outbound).await;
        }
    }

    pub async fn publish_snapshot(&self) {
        let snapshot = self.snapshot();
        self.deliver(Outbound::Snapshot(snapshot)).await;
    }

    /// Post to the downstream; failures are logged and dropped
    async fn deliver(&self, outbound: Outbound) {
        let result = match &outbound {
            Outbound::Snapshot(snapshot) => {
                debug!("Posting snapshot for {}: {:?}", snapshot.vehicle_id, snapshot);
                self.downstream.post_snapshot(snapshot).await
            }
            Outbound::Message(message) => self.downstream.post_message(message).await,
        };

        if let Err(e) = result {
            warn!("Downstream delivery failed for {}: {}", self.description.title, e);
        }
    }

    /// Follow the notification stream at `url` until shutdown, reconnecting
    /// when the connection drops
    pub async fn observe(&self, url: &str, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        loop {
            match connect_async(url).await {
                Ok((mut ws, _)) => {
                    info!("Observing {} via {}", self.description.title, url);
                    loop {
                        tokio::select! {
                            msg = ws.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => self.on_text(&text).await,
                                    Some(Ok(Message::Close(_))) | None => break,
                                    Some(Err(e)) => {
                                        warn!("Notification stream error: {}", e);
                                        break;
                                    }
                                    _ => {}
                                }
                            }
                            _ = shutdown.recv() => {
                                let _ = ws.close(None).await;
                                return Ok(());
                            }
                        }
                    }
                    warn!("Notification stream {} closed", url);
                }
                Err(e) => warn!("Failed to connect to {}: {}", url, e),
            }

            tokio::select! {
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                _ = shutdown.recv() => return Ok(()),
            }
        }
    }

    async fn on_text(&self, text: &str) {
        match serde_json::from_str::<Notification>(text) {
            Ok(notification) => self.handle(&notification).await,
            // welcome, pong and other control messages
            Err(_) => debug!("Ignoring stream message: {}", text),
        }
    }
}

/// Fetch, seed, post and then observe, as configured
pub async fn run(config: &ConsumerConfig, shutdown: broadcast::Receiver<()>) -> Result<()> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let reader = HttpThingReader::new(timeout)?;
    let downstream = Arc::new(HttpDownstream::new(&config.downstream_url, timeout)?);

    let url = description_url(config)?;
    info!("Fetching thing description from {}", url);
    let description: ThingDescription = serde_json::from_value(reader.get_json(&url).await?)
        .with_context(|| format!("{} is not a thing description", url))?;

    let consumer = Consumer::new(description, downstream);
    consumer.initialise(&reader).await?;
    consumer.publish_snapshot().await;

    let stream_url = config
        .stream_url
        .clone()
        .or_else(|| consumer.description().stream_href().map(str::to_string))
        .ok_or_else(|| anyhow!("no notification stream for {}", consumer.description().title))?;

    consumer.observe(&stream_url, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EventBus;
    use crate::server::NotificationServer;
    use crate::thing::PropertyName;
    use std::collections::HashMap;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeDownstream {
        fail: bool,
        snapshots: Mutex<Vec<VehicleSnapshot>>,
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Downstream for FakeDownstream {
        async fn post_snapshot(&self, snapshot: &VehicleSnapshot) -> Result<()> {
            if self.fail {
                bail!("503 Service Unavailable");
            }
            self.snapshots.lock().push(snapshot.clone());
            Ok(())
        }

        async fn post_message(&self, message: &str) -> Result<()> {
            if self.fail {
                bail!("503 Service Unavailable");
            }
            self.messages.lock().push(message.to_string());
            Ok(())
        }
    }

    struct FakeReader(HashMap<String, Value>);

    #[async_trait]
    impl ThingReader for FakeReader {
        async fn get_json(&self, url: &str) -> Result<Value> {
            self.0.get(url).cloned().ok_or_else(|| anyhow!("404 for {}", url))
        }
    }

    fn description() -> ThingDescription {
        ThingDescription::for_vehicle("5", "http://car:8080/", "ws://car:8765/", Uuid::new_v4())
    }

    #[test]
    fn test_description_url() {
        let mut config = ConsumerConfig {
            thing_id: Some("urn:uuid:abc".to_string()),
            ..ConsumerConfig::default()
        };
        assert_eq!(
            description_url(&config).unwrap(),
            "http://localhost:9000/api/things/urn:uuid:abc"
        );

        config.td_url = Some("http://car:8080/wot-id-mfr-vin-5".to_string());
        assert_eq!(description_url(&config).unwrap(), "http://car:8080/wot-id-mfr-vin-5");

        assert!(description_url(&ConsumerConfig::default()).is_err());
    }

    #[test]
    fn test_observed_property_updates_snapshot() {
        let consumer = Consumer::new(description(), Arc::new(FakeDownstream::default()));

        let out = consumer.apply(&Notification::property(PropertyName::TotalMileage, 1234.into()));
        match out {
            Some(Outbound::Snapshot(snapshot)) => {
                assert_eq!(snapshot.mileage, 1234);
                assert_eq!(snapshot.vehicle_id, "WoT-ID-Mfr-VIN-5");
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(consumer
            .apply(&Notification::property(PropertyName::OilLevel, 3.into()))
            .is_none());
        assert_eq!(consumer.snapshot().oil_level, 50);
    }

    #[test]
    fn test_events_become_messages() {
        let consumer = Consumer::new(description(), Arc::new(FakeDownstream::default()));
        let cases = [
            (EventName::LowOnOil, "is low on oil"),
            (EventName::LowTyrePressure, "has low tyre pressure"),
            (EventName::MaintenanceNeeded, "requires maintenance"),
        ];
        for (event, phrase) in cases {
            assert_eq!(
                consumer.apply(&Notification::event(event, "x")),
                Some(Outbound::Message(format!(
                    "Event message - vehicle WoT-ID-Mfr-VIN-5 {}",
                    phrase
                )))
            );
        }
    }

    #[tokio::test]
    async fn test_initialise_and_publish() {
        let td = description();
        let href = td.properties_href().unwrap().to_string();
        let reader = FakeReader(HashMap::from([(
            href,
            serde_json::json!({
                "propFleetId": "fleet-9",
                "propOilLevel": 88,
                "propTotalMileage": 500,
                "propDoorStatus": "UNLOCKED"
            }),
        )]));
        let downstream = Arc::new(FakeDownstream::default());
        let consumer = Consumer::new(td, downstream.clone());

        consumer.initialise(&reader).await.unwrap();
        consumer.publish_snapshot().await;

        let posted = downstream.snapshots.lock().clone();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].fleet_id, "fleet-9");
        assert_eq!(posted[0].oil_level, 88);
        assert_eq!(posted[0].td_url, "http://car:8080/wot-id-mfr-vin-5/");
    }

    #[tokio::test]
    async fn test_initialise_fails_without_properties() {
        let consumer = Consumer::new(description(), Arc::new(FakeDownstream::default()));
        assert!(consumer.initialise(&FakeReader(HashMap::new())).await.is_err());
    }

    #[tokio::test]
    async fn test_downstream_failure_is_dropped() {
        let downstream = Arc::new(FakeDownstream {
            fail: true,
            ..FakeDownstream::default()
        });
        let consumer = Consumer::new(description(), downstream);

        consumer
            .handle(&Notification::property(PropertyName::DoorStatus, "LOCKED".into()))
            .await;
        consumer
            .handle(&Notification::event(EventName::LowOnOil, "x"))
            .await;
        assert_eq!(consumer.snapshot().door_status, "LOCKED");
    }

    #[tokio::test]
    async fn test_observe_stream() {
        let bus = Arc::new(EventBus::default());
        let server = NotificationServer::new("127.0.0.1:0".parse().unwrap(), 4, bus.clone());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let addr = server.start(shutdown_rx).await.unwrap();

        let downstream = Arc::new(FakeDownstream::default());
        let consumer = Arc::new(Consumer::new(description(), downstream.clone()));
        let observer = {
            let consumer = consumer.clone();
            let rx = shutdown_tx.subscribe();
            let url = format!("ws://{}", addr);
            tokio::spawn(async move { consumer.observe(&url, rx).await })
        };

        for _ in 0..100 {
            if server.client_count().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        bus.publish(Notification::property(PropertyName::FleetId, "fleet-3".into()))
            .unwrap();
        bus.publish(Notification::event(EventName::MaintenanceNeeded, "due"))
            .unwrap();

        for _ in 0..100 {
            if !downstream.messages.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(downstream.snapshots.lock()[0].fleet_id, "fleet-3");
        assert_eq!(
            downstream.messages.lock()[0],
            "Event message - vehicle WoT-ID-Mfr-VIN-5 requires maintenance"
        );

        shutdown_tx.send(()).unwrap();
        observer.await.unwrap().unwrap();
    }
}
