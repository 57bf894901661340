//! Unauthenticated service banner and health-check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /`: service banner with the endpoint map.
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "letscloud-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "tools": "/tools",
            "servers": "/api/v1/servers",
            "contexts": "/mcp/contexts",
            "templates": "/mcp/templates",
            "clients": "/clients",
            "websocket": "/mcp",
        },
    }))
}

/// `GET /health`: liveness probe.
///
/// Reports `503` with `status: "unhealthy"` while the upstream credential is
/// missing, so orchestrators hold traffic until the gateway can actually
/// reach the LetsCloud API. No authentication required.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if !state.dispatcher.upstream_configured() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "error": "LETSCLOUD_API_TOKEN is not configured",
            })),
        );
    }

    let uptime = state.start_time.elapsed().as_secs();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_seconds": uptime,
            "upstream": "configured",
            "tools_available": state.dispatcher.catalog().len(),
        })),
    )
}
