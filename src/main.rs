// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/leetfleet-rs

//! LeetFleet - Web of Things smart vehicle
//!
//! One binary, three roles:
//! - `vehicle`: expose an emulated vehicle, register it, emulate sensors
//! - `consume`: observe a vehicle and forward snapshots downstream
//! - `bridge`: expire stale directory entries and mirror live vehicles

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use leetfleet::consumer::{self, HttpThingReader};
use leetfleet::registry::HttpDirectory;
use leetfleet::{Config, DirectoryBridge, Engine, VERSION};

/// LeetFleet - Web of Things smart vehicle
#[derive(Parser, Debug)]
#[command(name = "leetfleet")]
#[command(author = "LeetFleet Project")]
#[command(version = VERSION)]
#[command(about = "Emulated WoT smart vehicle, consumer and directory bridge")]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expose, register and emulate a vehicle
    Vehicle {
        /// Vehicle number, used in the vehicle id and title
        #[arg(short = 'n', long)]
        number: Option<String>,

        /// Directory things endpoint to register with
        #[arg(long)]
        directory: Option<String>,

        /// HTTP binding port
        #[arg(long)]
        http_port: Option<u16>,

        /// Notification stream port
        #[arg(long)]
        ws_port: Option<u16>,

        /// Host name advertised in the thing description
        #[arg(long)]
        public_host: Option<String>,

        /// Seed for reproducible emulation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Observe a vehicle and forward its state downstream
    Consume {
        /// Thing id to look up in the directory
        #[arg(long)]
        thing_id: Option<String>,

        /// Thing description URL, bypasses the directory
        #[arg(long)]
        td_url: Option<String>,

        /// Ingestion endpoint
        #[arg(long)]
        downstream: Option<String>,
    },

    /// Reconcile the directory with the live vehicles
    Bridge {
        /// Directory things endpoint
        #[arg(long)]
        directory: Option<String>,

        /// Seconds between passes
        #[arg(long)]
        interval: Option<u64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("LeetFleet v{}", VERSION);

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;
    info!("Configuration loaded from {:?}", config_path);

    apply_overrides(&mut config, &args.command);
    config.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    match args.command {
        Command::Vehicle { .. } => rt.block_on(run_vehicle(config)),
        Command::Consume { .. } => rt.block_on(run_consumer(config)),
        Command::Bridge { .. } => rt.block_on(run_bridge(config)),
    }
}

fn apply_overrides(config: &mut Config, command: &Command) {
    match command {
        Command::Vehicle {
            number,
            directory,
            http_port,
            ws_port,
            public_host,
            seed,
        } => {
            if let Some(number) = number {
                config.vehicle.vehicle_number = number.clone();
            }
            if let Some(directory) = directory {
                config.registration.directory_url = Some(directory.clone());
            }
            if let Some(port) = http_port {
                config.server.http_port = *port;
            }
            if let Some(port) = ws_port {
                config.server.websocket_port = *port;
            }
            if let Some(host) = public_host {
                config.server.public_host = host.clone();
            }
            if seed.is_some() {
                config.emulation.seed = *seed;
            }
        }
        Command::Consume {
            thing_id,
            td_url,
            downstream,
        } => {
            if thing_id.is_some() {
                config.consumer.thing_id = thing_id.clone();
            }
            if td_url.is_some() {
                config.consumer.td_url = td_url.clone();
            }
            if let Some(url) = downstream {
                config.consumer.downstream_url = url.clone();
            }
        }
        Command::Bridge {
            directory,
            interval,
        } => {
            if let Some(url) = directory {
                config.bridge.directory_url = url.clone();
            }
            if let Some(secs) = interval {
                config.bridge.interval_secs = *secs;
            }
        }
    }
}

async fn run_vehicle(config: Config) -> Result<()> {
    let mut engine = Engine::new(config)?;
    info!("   Press Ctrl+C to shutdown");
    engine.run().await?;
    info!("LeetFleet vehicle shutdown complete");
    Ok(())
}

/// Spawn a task that broadcasts shutdown on Ctrl-C
fn shutdown_on_ctrl_c() -> broadcast::Sender<()> {
    let (tx, _) = broadcast::channel(1);
    let signal_tx = tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, cleaning up..."),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = signal_tx.send(());
    });
    tx
}

async fn run_consumer(config: Config) -> Result<()> {
    let shutdown = shutdown_on_ctrl_c();
    consumer::run(&config.consumer, shutdown.subscribe()).await?;
    info!("LeetFleet consumer shutdown complete");
    Ok(())
}

async fn run_bridge(config: Config) -> Result<()> {
    let timeout = Duration::from_secs(config.bridge.timeout_secs);
    let directory = Arc::new(HttpDirectory::new(&config.bridge.directory_url, timeout)?);
    let reader = Arc::new(HttpThingReader::new(timeout)?);
    let bridge = DirectoryBridge::new(directory, reader, Duration::from_secs(config.bridge.expiry_secs));

    info!(
        "Bridging directory {} every {}s",
        config.bridge.directory_url, config.bridge.interval_secs
    );

    let shutdown = shutdown_on_ctrl_c();
    bridge
        .run(Duration::from_secs(config.bridge.interval_secs), shutdown.subscribe())
        .await?;
    info!("LeetFleet bridge shutdown complete");
    Ok(())
}
