pub mod handlers;
pub mod limit;

use std::net::SocketAddr;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub use handlers::{ApiState, Limiters};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

pub fn router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/chat/location", get(handlers::handle_location))
        .route("/chat/stats", get(handlers::handle_chat_stats))
        .route("/chat/test-connection", get(handlers::handle_test_connection))
        .route("/report", post(handlers::handle_report_submit))
        .route("/report/stats", get(handlers::handle_report_stats))
        .route("/status", get(handlers::handle_status))
        .route("/sessions", get(handlers::handle_sessions))
        .route("/blocks", get(handlers::handle_blocks))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            limit::api_rate_limit,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/ws", get(handlers::handle_ws_upgrade))
        .route("/health", get(handlers::handle_health))
        .with_state(state.clone())
        .nest("/api", api_routes)
        .layer(cors_layer(&state.config.server.cors_origins))
}

/// Bind and serve until the shutdown broadcast fires.
pub async fn serve(state: ApiState, addr: SocketAddr) -> anyhow::Result<()> {
    let mut shutdown = state.shutdown_tx.subscribe();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening for peers on /ws");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown.recv().await;
    })
    .await?;
    Ok(())
}
