//! Per-address rate limiting for `/api/*`.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::handlers::{client_ip, rate_limited, ApiState};

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let addr = client_ip(&state, request.headers(), remote);
    if !state.limits.api.check(addr) {
        return rate_limited("Too many requests from this IP, please try again later.");
    }
    next.run(request).await
}
