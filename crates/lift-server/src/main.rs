//! Lift server: connects storage, seeds a fresh building, runs the
//! visitor status sweeper and relays access events to the log.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use lift_access::{BroadcastPublisher, StatusSweeper};
use lift_db::repository::SurrealVisitorAccessRepository;
use lift_db::{DbManager, seed_defaults};
use tokio::sync::{broadcast, watch};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "lift-server", version, about = "Smart lift access service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "lift.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lift=info".parse()?))
        .json()
        .init();

    let args = Args::parse();
    let config = ServerConfig::load(&args.config)?;

    tracing::info!(config = %args.config.display(), "Starting lift server...");

    let manager = DbManager::connect(&config.db).await?;
    let db = manager.client().clone();

    let report = seed_defaults(&db, &config.seed).await?;
    if report.floors_created > 0 || report.admin_created {
        tracing::info!(
            floors = report.floors_created,
            admin = report.admin_created,
            "Seeded empty database"
        );
    }

    let publisher = match config.event_capacity {
        Some(capacity) => BroadcastPublisher::new(capacity.max(1)),
        None => BroadcastPublisher::default(),
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let relay = tokio::spawn(relay_events(publisher.subscribe(), shutdown_rx.clone()));

    let sweeper = StatusSweeper::new(SurrealVisitorAccessRepository::new(db), publisher);
    let interval = Duration::from_secs(config.access.sweep_interval_secs.max(1));
    let sweep = tokio::spawn(async move { sweeper.run_periodic(interval, shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Background tasks already stopped");
    }
    sweep.await?;
    relay.await?;

    tracing::info!("Lift server stopped.");
    Ok(())
}

/// Write every published event to the log until shutdown.
async fn relay_events(
    mut events: broadcast::Receiver<lift_access::AccessEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => match event.to_json() {
                    Ok(json) => tracing::info!(event = %json, "Access event"),
                    Err(e) => tracing::warn!(error = %e, "Unserializable access event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event relay fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
