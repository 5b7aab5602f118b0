pub mod auth;
pub mod cache;
pub mod config;
pub mod distributed;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod observability;
pub mod registry;

pub use auth::*;
pub use config::*;
pub use error::*;

use std::panic;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use crate::distributed::InProcessDistributedCache;
use crate::lifecycle::ProcessLifecycle;

/// Binary entry point: parse the command line and serve until shutdown
pub async fn run() -> Result<()> {
    run_with(Cli::parse()).await
}

pub async fn run_with(cli: Cli) -> Result<()> {
    let app_config = config::load_config_with(&cli)?;

    if let Err(e) = logging::setup_tracing(&app_config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    panic::set_hook(Box::new(|panic_info| {
        error!(?panic_info, "FATAL: Panic occurred");
        std::process::exit(1);
    }));

    info!(
        environment = app_config.environment.as_str(),
        "Authentication cache starting up"
    );

    let lifecycle = Arc::new(ProcessLifecycle::new());
    let service = AuthCacheService::new(
        AuthCacheConfig::from(&app_config.auth_cache),
        Arc::clone(&lifecycle),
    )
    .with_default_providers()
    .with_in_memory_policy(non_distributable_policy());
    service.activate(&app_config.auth_cache).await?;

    let store = if app_config.distributed.enabled {
        let store = Arc::new(InProcessDistributedCache::with_limit(
            &app_config.distributed.name,
            app_config.distributed.max_entries,
        ));
        service.set_distributed_cache(store.clone()).await;
        Some(store)
    } else {
        None
    };

    lifecycle.mark_ready();

    let period = Duration::from_secs(cli.stats_interval.max(1));
    let mut stats_interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = stats_interval.tick() => {
                let stats = AuthCacheManagement::stats(&service).await;
                info!(
                    entries = stats.entries,
                    distributed_entries = store.as_ref().map(|store| store.len()),
                    hits = stats.hits,
                    misses = stats.misses,
                    hit_rate = stats.hit_rate,
                    evictions = stats.evictions,
                    "Authentication cache statistics"
                );
            }
            _ = &mut shutdown => break,
        }
    }

    lifecycle.mark_stopping();
    service.deactivate().await;
    info!("Authentication cache stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
