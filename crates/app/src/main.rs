//! esusync: headless coordinator for municipal e-SUS import/export jobs.

mod runtime;

use std::sync::Arc;

use anyhow::Context;
use esusync_core::ImportCoordinator;
use esusync_domain::{BillingPeriod, DashboardState};
use esusync_infra::{
    config, ApiClient, ApiClientConfig, AutoImportScheduler, FileStateCache, FsArtifactStore,
    HttpBackendGateway, PushListener, PushListenerConfig,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let app_config = config::load().context("loading configuration")?;
    info!(backend = %app_config.backend.base_url, "starting esusync");

    let api = ApiClient::new(ApiClientConfig {
        base_url: app_config.backend.base_url.clone(),
        timeout: app_config.backend.timeout(),
        max_attempts: app_config.backend.max_attempts,
    })
    .context("building API client")?;

    let gateway = Arc::new(HttpBackendGateway::new(api));
    let store = Arc::new(FsArtifactStore::new(app_config.downloads.dir.clone()));
    let cache = Arc::new(FileStateCache::new(app_config.cache.path.clone()));

    let period = BillingPeriod::previous_month(chrono::Local::now().date_naive());
    let mut coordinator =
        ImportCoordinator::new(DashboardState::new(period), gateway, store, cache);
    coordinator.initialize().await;

    let listener = PushListener::new(PushListenerConfig {
        url: format!(
            "{}{}",
            app_config.backend.base_url.trim_end_matches('/'),
            app_config.push.path
        ),
        reconnect_attempts: app_config.push.reconnect_attempts,
        reconnect_base_delay: app_config.push.reconnect_base_delay(),
    })
    .context("building push listener")?;

    let (event_tx, event_rx) = mpsc::channel(64);
    listener.start(event_tx).context("starting push listener")?;

    let (command_tx, command_rx) = mpsc::channel(16);
    let shutdown_tx = command_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(runtime::Command::Shutdown).await;
            }
            Err(err) => warn!(%err, "signal handler failed"),
        }
    });

    let scheduler = AutoImportScheduler::new(runtime::ChannelImportJob::new(command_tx.clone()));
    let auto_update = coordinator.state().auto_update.clone();
    if auto_update.enabled {
        match scheduler.start(&auto_update.time).await {
            Ok(()) => info!(time = %auto_update.time, "auto-import enabled"),
            Err(err) => warn!(%err, "auto-import scheduler failed to start"),
        }
    }

    runtime::run(&mut coordinator, event_rx, command_rx).await;

    if scheduler.is_running().await {
        if let Err(err) = scheduler.stop().await {
            warn!(%err, "scheduler did not stop cleanly");
        }
    }
    if listener.is_running() {
        if let Err(err) = listener.stop().await {
            warn!(%err, "push listener did not stop cleanly");
        }
    }
    info!("esusync stopped");
    Ok(())
}
