//! Koinonia storage daemon
//!
//! Opens the configured backend and runs the background maintenance
//! loops: notification delivery, the stale-request sweep and the
//! reset-token purge. The service layer is exported from the library
//! crate for whatever front end sits on top.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use koinonia_server::services::{NotificationOutbox, RecoveryService, StaleSweeper};
use koinonia_server::{storage, StoreConfig};

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(
        "Starting Koinonia storage daemon v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("PID: {}", std::process::id());

    if let Err(e) = run().await {
        error!("Daemon failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    info!("Loading configuration...");
    let config = StoreConfig::from_env().context("Failed to load configuration")?;
    info!(
        "Config loaded: backend={:?}, db={}, sweep every {}h",
        config.backend, config.database_path, config.sweep_interval_hours
    );

    let store = storage::open(&config)
        .await
        .context("Failed to open storage backend")?;

    info!("Starting notification delivery worker...");
    let (outbox, delivery) = NotificationOutbox::spawn(store.clone());

    info!("Starting stale-request sweep...");
    let sweeper = StaleSweeper::new(store.clone(), outbox.clone());
    let sweep = sweeper.spawn(Duration::from_secs(
        config.sweep_interval_hours.saturating_mul(3600),
    ));

    info!("Starting reset-token purge...");
    let recovery = RecoveryService::new(store.clone());
    let purge = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match recovery.purge_expired().await {
                Ok(0) => {}
                Ok(count) => info!("Purged {} expired reset tokens", count),
                Err(e) => warn!("Reset token purge failed: {}", e),
            }
        }
    });

    info!("Maintenance loops running");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down...");

    sweep.abort();
    purge.abort();

    // Dropping the last handle lets the worker drain queued batches and exit.
    drop(outbox);
    if let Err(e) = delivery.await {
        if !e.is_cancelled() {
            error!("Notification worker ended abnormally: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}
