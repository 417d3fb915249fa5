// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Vehicle engine - exposes the thing and drives it until shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{EmulationScheduler, EngineStatus, EventBus};
use crate::alerts::ThresholdWatcher;
use crate::config::Config;
use crate::registry::{HttpDirectory, RegistrationClient};
use crate::sensors::{SensorModel, VehicleState};
use crate::server::{self, NotificationServer};
use crate::thing::{ExposedThing, ThingDescription};

pub struct Engine {
    pub config: Arc<Config>,
    thing: Arc<ExposedThing>,
    stream: NotificationServer,
    registration: Option<Arc<RegistrationClient>>,
    start_time: Option<Instant>,
}

impl Engine {
    /// Build the thing from configuration. An invalid description is fatal.
    pub fn new(config: Config) -> Result<Self> {
        let description = ThingDescription::for_vehicle(
            &config.vehicle.vehicle_number,
            &config.server.http_base_url(),
            &config.server.stream_url(),
            Uuid::new_v4(),
        );
        description
            .validate()
            .context("refusing to expose an invalid thing description")?;

        let bus = Arc::new(EventBus::default());
        let thing = Arc::new(ExposedThing::new(
            description.clone(),
            VehicleState::from_config(&config.vehicle),
            SensorModel::new(&config.emulation),
            ThresholdWatcher::new(config.thresholds),
            bus.clone(),
        ));

        let stream = NotificationServer::new(
            bind_addr(&config.server.bind_address, config.server.websocket_port)?,
            config.server.websocket_max_clients,
            bus,
        );

        let registration = match &config.registration.directory_url {
            Some(url) => {
                let directory = HttpDirectory::new(url, config.registration.timeout())?;
                Some(Arc::new(RegistrationClient::new(
                    Arc::new(directory),
                    description,
                    config.registration.retry_delay(),
                )))
            }
            None => {
                info!("No directory configured, registration disabled");
                None
            }
        };

        info!("Thing {} ({}) created", thing.description().title, thing.description().id);

        Ok(Self {
            config: Arc::new(config),
            thing,
            stream,
            registration,
            start_time: None,
        })
    }

    pub fn thing(&self) -> &Arc<ExposedThing> {
        &self.thing
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.start_time.is_some(),
            vehicle_id: self.thing.description().title.clone(),
            thing_id: self.thing.description().id.clone(),
            uptime_seconds: self.uptime(),
            notifications_published: self.thing.event_bus().published(),
            stream_clients: self.stream.client_count().await,
            registration: self.registration.as_ref().map(|r| r.state()),
        }
    }

    /// Run until Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Serve, register and emulate until `signal` resolves, then shut
    /// everything down
    pub async fn run_until<F>(&mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Starting vehicle engine...");

        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        // Both bindings are bound before registration or emulation start
        let http_addr = bind_addr(&self.config.server.bind_address, self.config.server.http_port)?;
        let listener = server::bind(http_addr).await?;
        self.stream.start(shutdown_tx.subscribe()).await?;

        self.start_time = Some(Instant::now());
        let http = tokio::spawn(server::serve(self.thing.clone(), listener, shutdown_tx.subscribe()));

        if let Some(registration) = &self.registration {
            let registration = registration.clone();
            let rx = shutdown_tx.subscribe();
            tokio::spawn(async move {
                registration.run(rx).await;
            });
        }

        let scheduler = EmulationScheduler::new(self.thing.clone(), &self.config.emulation);
        let emulation = {
            let rx = shutdown_tx.subscribe();
            tokio::spawn(async move { scheduler.run(rx).await })
        };

        info!("Vehicle {} running", self.thing.description().title);

        signal.await;

        info!("Shutdown signal received, stopping...");
        if shutdown_tx.send(()).is_err() {
            warn!("No task was listening for shutdown");
        }

        emulation.await??;
        http.await??;

        self.start_time = None;
        info!("Vehicle engine stopped");
        Ok(())
    }
}

fn bind_addr(host: &str, port: u16) -> Result<SocketAddr> {
    format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", host, port))
}
