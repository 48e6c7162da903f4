//! Runway Worker
//!
//! A stateless worker that consumes provisioning run requests from a queue
//! and prepares each run's configuration for the provisioning engine.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Repositories: HTTP communication with the queue, bundle store and control plane
//! - Services: Run processing and variable resolution
//! - Scheduler: Queue polling and acknowledgment
//!
//! For every message the worker fetches the configuration bundle, extracts
//! it into an ephemeral execution root, selects the engine version, exports
//! the workspace variables and runs engine initialization, then cleans up.

mod archive;
mod config;
mod engine;
mod environment;
mod process;
mod repository;
mod scheduler;
mod service;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::archive::TarExtractor;
use crate::config::Config;
use crate::process::{CommandExecutor, ProcessExecutor};
use crate::repository::{
    HttpBundleStore, HttpRunQueue, HttpRunStatusRepository, HttpVariableRepository,
};
use crate::scheduler::RunPoller;
use crate::service::RunProcessor;
use runway_client::{BundleStoreClient, ControlPlaneClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runway_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Runway Worker");

    // Load configuration
    let config = Config::load()?;
    info!(
        "Loaded configuration: worker_id={}, control_plane_url={}, bundle_store_url={}",
        config.worker_id, config.control_plane_url, config.bundle_store_url
    );

    // Initialize clients
    let control_plane = Arc::new(ControlPlaneClient::new(config.control_plane_url.clone()));
    let bundle_store = BundleStoreClient::new(config.bundle_store_url.clone());

    info!("Clients initialized");

    // Initialize services
    let executor: Arc<dyn ProcessExecutor> = Arc::new(CommandExecutor);
    let processor = Arc::new(RunProcessor::new(
        &config,
        Arc::new(HttpBundleStore::new(
            bundle_store,
            config.bundle_bucket.clone(),
        )),
        Arc::new(HttpVariableRepository::new(control_plane.clone())),
        Arc::new(HttpRunStatusRepository::new(control_plane.clone())),
        executor.clone(),
        Arc::new(TarExtractor::new(executor)),
    ));

    info!("Services initialized");

    let queue = Arc::new(HttpRunQueue::new(
        control_plane,
        config.queue_name.clone(),
    ));
    let poller = RunPoller::new(config.clone(), queue, processor);

    info!("Worker initialized successfully");
    info!(
        "Execution root: {}, engine version: {}, run timeout: {:?}",
        config.work_dir.display(),
        config.engine_version,
        config.run_timeout
    );

    let shutdown = CancellationToken::new();
    spawn_shutdown_listener(shutdown.clone());

    // Start polling loop
    info!("Starting run polling loop");
    if let Err(e) = poller.run(shutdown).await {
        error!("Poller error: {}", e);
        return Err(e);
    }

    info!("Runway Worker stopped");
    Ok(())
}

/// Cancels `shutdown` on Ctrl-C so the current run can finish first
fn spawn_shutdown_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, finishing current run"),
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
        shutdown.cancel();
    });
}
