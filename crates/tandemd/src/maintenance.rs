//! Background maintenance: block-list sweep, cache purge, stats snapshot.

use std::sync::Arc;
use std::time::Duration;

use tandem_api::Limiters;
use tandem_services::{CachedResolver, SharedCoordinator};

const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Pop expired block entries and drop stale cache and limiter entries.
pub async fn sweep_loop(
    coordinator: SharedCoordinator,
    geo_cache: Option<Arc<CachedResolver>>,
    limits: Limiters,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;

        let released = coordinator.lock().await.sweep_blocks();
        if released > 0 {
            tracing::info!(released, "block entries expired");
        }

        if let Some(cache) = &geo_cache {
            let purged = cache.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, remaining = cache.len(), "geolocation cache purged");
            }
        }

        let idle = limits.purge_idle();
        if idle > 0 {
            tracing::debug!(idle, "idle rate-limit buckets dropped");
        }
    }
}

pub async fn stats_loop(coordinator: SharedCoordinator) {
    let mut interval = tokio::time::interval(STATS_INTERVAL);
    loop {
        interval.tick().await;
        let stats = coordinator.lock().await.stats();
        tracing::info!(
            connected = stats.active_users,
            waiting = stats.waiting_users,
            sessions = stats.active_sessions,
            blocked = stats.blocked_users,
            "coordinator snapshot"
        );
    }
}
