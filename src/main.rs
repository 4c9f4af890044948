//! Herald - Discord channel bridge
//!
//! Mirrors messages posted in one Discord channel into the channels it is
//! bridged to, under a disguised persona, and keeps reactions and deletions
//! in step across every copy.

mod bridge;
mod common;
mod config;
mod discord;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use bridge::{load_routes, BridgeOrchestrator, DocumentTable, LinkGraph, PersonaDictionary, PersonaGenerator};
use config::{env::get_config_path, load_and_validate};
use discord::{build_http_client, CommandHandler, DiscordBotBuilder, SerenityTransport};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Herald v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("  Data directory: {}", config.bridge.data_dir);
    info!("  Link retention: {} days", config.bridge.link_retention_days);

    // ============================================================
    // Load bridge state
    // ============================================================
    let routes_path = config.bridge.routes_path();
    let routes = load_routes(&routes_path, &config.bridge.routes).map_err(|e| {
        error!("Failed to load channel routes from {}: {}", routes_path.display(), e);
        e
    })?;
    if routes.is_empty() {
        warn!("No channel routes configured; messages will not be mirrored");
    }

    let mut dictionaries =
        DocumentTable::<PersonaDictionary>::open(config.bridge.persona_store_path())?;
    let personas = PersonaGenerator::load_or_seed(&mut dictionaries)?;

    let links = LinkGraph::open(config.bridge.link_store_path())?;
    let sources = links.reconcile().await;
    info!(sources, "Message links loaded");

    let http_client = build_http_client()?;
    let transport = Arc::new(SerenityTransport::new(http_client.clone()));
    let bridge = Arc::new(BridgeOrchestrator::new(transport, routes, personas, links));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ============================================================
    // Maintenance: purge stale links
    // ============================================================
    let purge_task = {
        let bridge = bridge.clone();
        let retention = chrono::Duration::days(i64::from(config.bridge.link_retention_days));
        let interval = Duration::from_secs(config.bridge.purge_interval_hours.saturating_mul(3600));
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(threshold) = Utc::now().checked_sub_signed(retention) else {
                            warn!("Link retention is out of range, skipping purge");
                            continue;
                        };
                        match bridge.links().purge_older_than(threshold).await {
                            Ok(0) => debug!("No stale links to purge"),
                            Ok(purged) => info!(purged, "Purged stale message links"),
                            Err(e) => error!("Failed to purge stale links: {}", e),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Link maintenance task ended");
        })
    };

    // ============================================================
    // Start Discord bot
    // ============================================================
    let discord_bot = DiscordBotBuilder::new(
        config.discord.token.clone(),
        http_client,
        bridge,
        CommandHandler::new(config.discord.command_prefix.clone()),
        shutdown_rx,
    )
    .build()
    .await?;

    info!("Starting Discord bot...");
    let mut discord_task = tokio::spawn(async move {
        discord_bot.run().await;
    });

    let shutdown = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping bridge...");
            true
        }
        _ = &mut discord_task => false,
    };

    // Handle graceful shutdown
    if shutdown {
        if let Err(e) = shutdown_tx.send(true) {
            debug!("Shutdown channel closed (tasks already exited): {}", e);
        }
        let timeout = Duration::from_secs(5);
        match tokio::time::timeout(timeout, discord_task).await {
            Ok(Ok(())) => info!("Discord bot stopped gracefully"),
            Ok(Err(e)) => warn!("Discord task panicked: {}", e),
            Err(_) => warn!("Discord shutdown timed out"),
        }
    } else if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }

    if let Err(e) = purge_task.await {
        warn!("Link maintenance task panicked: {}", e);
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
