//! HTTP and WebSocket handlers: the transport adapter around the coordinator.

pub mod chat;
pub mod report;
pub mod status;
pub mod ws;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tandem_core::config::{LimitsConfig, TandemConfig};
use tandem_core::report::unix_millis;
use tandem_services::{
    new_shared, Clock, Coordinator, GeoResolver, KeyedLimiter, SharedCoordinator,
    TracingReportSink,
};

#[derive(Clone)]
pub struct Limiters {
    pub api: KeyedLimiter,
    pub reports: KeyedLimiter,
    pub connections: KeyedLimiter,
}

impl Limiters {
    pub fn new(config: &LimitsConfig, clock: Arc<dyn Clock>) -> Self {
        let minute = Duration::from_secs(60);
        Self {
            api: KeyedLimiter::new(
                "api",
                config.api_requests_per_window,
                Duration::from_secs(config.api_window_secs),
                clock.clone(),
            ),
            reports: KeyedLimiter::new("reports", config.reports_per_minute, minute, clock.clone()),
            connections: KeyedLimiter::new(
                "connections",
                config.connections_per_minute,
                minute,
                clock,
            ),
        }
    }

    /// Drop idle buckets from every limiter.
    pub fn purge_idle(&self) -> usize {
        self.api.purge_idle() + self.reports.purge_idle() + self.connections.purge_idle()
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub coordinator: SharedCoordinator,
    pub geo: Arc<dyn GeoResolver>,
    /// Same sink the coordinator submits to; read here for report stats.
    pub reports: TracingReportSink,
    pub limits: Limiters,
    pub config: Arc<TandemConfig>,
    pub started_at: Instant,
    /// Shutdown broadcast. Closes peer connections and the listener.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

impl ApiState {
    pub fn new(config: TandemConfig, geo: Arc<dyn GeoResolver>, clock: Arc<dyn Clock>) -> Self {
        let reports = TracingReportSink::new();
        let coordinator = new_shared(Coordinator::new(
            &config.matching,
            clock.clone(),
            Arc::new(reports.clone()),
        ));
        let limits = Limiters::new(&config.limits, clock);
        let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
        Self {
            coordinator,
            geo,
            reports,
            limits,
            config: Arc::new(config),
            started_at: Instant::now(),
            shutdown_tx,
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// The caller's address. The first `X-Forwarded-For` entry wins when the
/// server is configured to trust its proxy.
pub fn client_ip(state: &ApiState, headers: &HeaderMap, remote: SocketAddr) -> IpAddr {
    if state.config.server.trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip.to_canonical();
        }
    }
    remote.ip().to_canonical()
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

pub fn rate_limited(message: &str) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse { error: message }),
    )
        .into_response()
}

// Re-export handler functions for use in router setup.
pub use chat::{handle_chat_stats, handle_location, handle_test_connection};
pub use report::{handle_report_stats, handle_report_submit};
pub use status::{handle_blocks, handle_health, handle_sessions, handle_status};
pub use ws::handle_ws_upgrade;
