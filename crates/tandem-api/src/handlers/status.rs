//! /health, /status, /sessions, /blocks handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use tandem_services::coordinator::{BlockSummary, SessionSummary};
use tandem_services::CoordinatorStats;

use super::{unix_millis, ApiState};

// ── /health ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub uptime_secs: u64,
    pub environment: String,
}

pub async fn handle_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: unix_millis(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        environment: state.config.server.environment.clone(),
    })
}

// ── /status ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: &'static str,
    pub uptime_secs: u64,
    #[serde(flatten)]
    pub stats: CoordinatorStats,
    pub geolocation_enabled: bool,
    pub block_ttl_secs: u64,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let stats = state.coordinator.lock().await.stats();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        stats,
        geolocation_enabled: state.config.geolocation.enabled,
        block_ttl_secs: state.config.matching.block_ttl_secs,
    })
}

// ── /sessions ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

pub async fn handle_sessions(State(state): State<ApiState>) -> Json<SessionsResponse> {
    let sessions = state.coordinator.lock().await.sessions();
    Json(SessionsResponse { sessions })
}

// ── /blocks ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct BlocksResponse {
    pub blocks: Vec<BlockSummary>,
}

pub async fn handle_blocks(State(state): State<ApiState>) -> Json<BlocksResponse> {
    let blocks = state.coordinator.lock().await.blocks();
    Json(BlocksResponse { blocks })
}
