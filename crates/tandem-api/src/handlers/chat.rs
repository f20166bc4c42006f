//! /chat/location, /chat/stats, /chat/test-connection handlers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use tandem_core::Location;
use tandem_services::CoordinatorStats;

use super::{client_ip, unix_millis, ApiState};

pub async fn handle_location(
    State(state): State<ApiState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<Location> {
    let addr = client_ip(&state, &headers, remote);
    Json(state.geo.resolve(addr).await)
}

pub async fn handle_chat_stats(State(state): State<ApiState>) -> Json<CoordinatorStats> {
    Json(state.coordinator.lock().await.stats())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionResponse {
    pub status: &'static str,
    pub web_rtc_supported: bool,
    /// Unix milliseconds.
    pub server_time: u64,
}

pub async fn handle_test_connection() -> Json<TestConnectionResponse> {
    Json(TestConnectionResponse {
        status: "OK",
        web_rtc_supported: true,
        server_time: unix_millis(),
    })
}
