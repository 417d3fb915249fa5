// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! Emulation scheduler - periodic sensor ticks

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::EmulationConfig;
use crate::sensors::SensorTask;
use crate::thing::ExposedThing;

struct ScheduledTask {
    task: SensorTask,
    interval: Duration,
    enabled: bool,
}

/// Drives the exposed thing's sensor tasks, each on its own period
pub struct EmulationScheduler {
    thing: Arc<ExposedThing>,
    startup_delay: Duration,
    tasks: Vec<ScheduledTask>,
}

impl EmulationScheduler {
    pub fn new(thing: Arc<ExposedThing>, config: &EmulationConfig) -> Self {
        let tasks = vec![
            ScheduledTask {
                task: SensorTask::Oil,
                interval: config.oil_interval(),
                enabled: true,
            },
            ScheduledTask {
                task: SensorTask::Tyre,
                interval: config.tyre_interval(),
                enabled: true,
            },
            ScheduledTask {
                task: SensorTask::Odometer,
                interval: config.odometer_interval(),
                enabled: true,
            },
        ];

        for t in &tasks {
            debug!("Scheduled task '{}' with interval {:?}", t.task.name(), t.interval);
        }

        Self {
            thing,
            startup_delay: config.startup_delay(),
            tasks,
        }
    }

    pub fn interval(&self, task: SensorTask) -> Option<Duration> {
        self.tasks.iter().find(|t| t.task == task).map(|t| t.interval)
    }

    pub fn enable_task(&mut self, task: SensorTask, enabled: bool) {
        if let Some(t) = self.tasks.iter_mut().find(|t| t.task == task) {
            t.enabled = enabled;
        }
    }

    /// Wait for the startup delay, then tick every enabled task until
    /// shutdown is signalled.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(self.startup_delay) => {}
            _ = shutdown.recv() => {
                info!("Emulation cancelled before start");
                return Ok(());
            }
        }

        info!("Starting emulation of {}", self.thing.description().title);

        let mut workers = JoinSet::new();
        for t in self.tasks.iter().filter(|t| t.enabled) {
            let thing = self.thing.clone();
            let task = t.task;
            let period = t.interval;
            let mut shutdown = shutdown.resubscribe();

            workers.spawn(async move {
                // First tick lands one full period after start
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            thing.tick(task);
                        }
                        _ = shutdown.recv() => {
                            debug!("Task '{}' stopping", task.name());
                            break;
                        }
                    }
                }
            });
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                warn!("Emulation task failed: {}", e);
            }
        }

        info!("Emulation stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::ThresholdWatcher;
    use crate::core::EventBus;
    use crate::sensors::{SensorModel, VehicleState};
    use crate::thing::ThingDescription;

    fn fast_config() -> EmulationConfig {
        EmulationConfig {
            startup_delay_ms: 0,
            oil_interval_ms: 5,
            tyre_interval_ms: 7,
            odometer_interval_ms: 3,
            seed: Some(11),
            ..EmulationConfig::default()
        }
    }

    fn make_thing(config: &EmulationConfig) -> Arc<ExposedThing> {
        Arc::new(ExposedThing::new(
            ThingDescription::for_vehicle("9", "http://localhost:8080", "ws://localhost:8765", uuid::Uuid::new_v4()),
            VehicleState::default(),
            SensorModel::new(config),
            ThresholdWatcher::default(),
            Arc::new(EventBus::default()),
        ))
    }

    #[test]
    fn test_intervals_come_from_config() {
        let config = fast_config();
        let scheduler = EmulationScheduler::new(make_thing(&config), &config);
        assert_eq!(scheduler.interval(SensorTask::Oil), Some(Duration::from_millis(5)));
        assert_eq!(scheduler.interval(SensorTask::Tyre), Some(Duration::from_millis(7)));
        assert_eq!(scheduler.interval(SensorTask::Odometer), Some(Duration::from_millis(3)));
    }

    #[tokio::test]
    async fn test_ticks_until_shutdown() {
        let config = fast_config();
        let thing = make_thing(&config);
        let scheduler = EmulationScheduler::new(thing.clone(), &config);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        let state = thing.snapshot();
        assert!(state.total_mileage > 44);
        assert_eq!(
            state.total_mileage as i64 - 44,
            15000 - state.service_distance
        );

        // Nothing moves after shutdown
        let frozen = thing.snapshot();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(thing.snapshot(), frozen);
    }

    #[tokio::test]
    async fn test_disabled_task_never_ticks() {
        let config = fast_config();
        let thing = make_thing(&config);
        let mut scheduler = EmulationScheduler::new(thing.clone(), &config);
        scheduler.enable_task(SensorTask::Odometer, false);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(thing.snapshot().total_mileage, 44);
    }

    #[tokio::test]
    async fn test_shutdown_during_startup_delay() {
        let config = EmulationConfig {
            startup_delay_ms: 60_000,
            ..fast_config()
        };
        let thing = make_thing(&config);
        let scheduler = EmulationScheduler::new(thing.clone(), &config);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(thing.snapshot(), VehicleState::default());
    }
}
