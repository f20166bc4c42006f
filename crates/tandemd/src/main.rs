//! tandemd: anonymous peer matching and signaling relay daemon.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use tandem_api::ApiState;
use tandem_core::config::TandemConfig;
use tandem_services::{CachedResolver, Clock, GeoResolver, HttpGeoResolver, StaticResolver, SystemClock};

mod maintenance;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = TandemConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = TandemConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        TandemConfig::default()
    });

    let addr: SocketAddr = format!("{}:{}", config.server.bind_addr, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.server.bind_addr, config.server.port))?;
    tracing::info!(
        %addr,
        environment = %config.server.environment,
        block_ttl_secs = config.matching.block_ttl_secs,
        geolocation = config.geolocation.enabled,
        "tandemd starting"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // ── Geolocation ──────────────────────────────────────────────────────────
    let geo_cache = if config.geolocation.enabled {
        let http = HttpGeoResolver::new(&config.geolocation)
            .context("failed to build geolocation client")?;
        Some(Arc::new(CachedResolver::new(
            Arc::new(http),
            config.geolocation.cache_ttl(),
            clock.clone(),
        )))
    } else {
        None
    };
    let geo: Arc<dyn GeoResolver> = match &geo_cache {
        Some(cache) => cache.clone(),
        None => Arc::new(StaticResolver::default()),
    };

    let sweep_interval = config.matching.sweep_interval();
    let state = ApiState::new(config, geo, clock);

    // ── Shutdown channel ─────────────────────────────────────────────────────
    {
        let shutdown = state.shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────
    let sweeper = tokio::spawn(maintenance::sweep_loop(
        state.coordinator.clone(),
        geo_cache,
        state.limits.clone(),
        sweep_interval,
    ));

    let stats_printer = tokio::spawn(maintenance::stats_loop(state.coordinator.clone()));

    let server = tokio::spawn(tandem_api::serve(state, addr));

    // ── Wait for exit ────────────────────────────────────────────────────────
    // The server returns once the shutdown broadcast has drained connections.
    tokio::select! {
        r = server => match r {
            Ok(Ok(())) => tracing::info!("server stopped"),
            Ok(Err(e)) => return Err(e),
            Err(e) => tracing::error!("server task exited: {:?}", e),
        },
        r = sweeper       => tracing::error!("sweeper exited: {:?}", r),
        r = stats_printer => tracing::error!("stats printer exited: {:?}", r),
    }

    Ok(())
}
