#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unused_async)]

//! # letscloud-gateway
//!
//! HTTP and WebSocket gateway exposing LetsCloud infrastructure management
//! to AI agents and plain REST clients, protected by a pre-shared API key.
//!
//! Every surface routes through the one tool dispatcher from the
//! `mcp-letscloud` library: the stdio MCP binary, the WebSocket endpoint,
//! and the REST facade all share its validation, error taxonomy, and
//! upstream client.
//!
//! ## API surface
//!
//! | Method     | Path                    | Auth | Description                                |
//! |------------|-------------------------|------|--------------------------------------------|
//! | GET        | `/`                     | No   | Service banner and endpoint map            |
//! | GET        | `/health`               | No   | Liveness probe (503 until upstream is set) |
//! | GET        | `/tools`                | Yes  | Tool catalog with JSON Schemas             |
//! | POST       | `/tools/{name}`         | Yes  | Invoke one tool                            |
//! | GET, POST  | `/api/v1/servers`       | Yes  | List / create servers                      |
//! | GET, DELETE| `/api/v1/servers/{id}`  | Yes  | Fetch / delete one server                  |
//! | POST, GET  | `/mcp/contexts`         | Yes  | Submit / list contexts                     |
//! | GET, DELETE| `/mcp/contexts/{id}`    | Yes  | Fetch / remove one context                 |
//! | GET        | `/mcp/templates`        | Yes  | Context templates                          |
//! | GET        | `/mcp/health`           | Yes  | Context subsystem health                   |
//! | POST, GET  | `/clients`              | Yes  | Register / list API clients                |
//! | GET, PUT, DELETE | `/clients/{id}`   | Yes  | Fetch / update / remove one client         |
//! | GET        | `/mcp`                  | Yes* | WebSocket MCP (JSON-RPC frames)            |
//!
//! *WebSocket auth is via `?token=<key>` query param (no `Authorization`
//! header available during the upgrade handshake).
//!
//! ## Architecture
//!
//! ```text
//! main.rs       - entry point, router setup, graceful shutdown
//! config.rs     - TOML + env-var configuration
//! auth.rs       - Bearer token middleware, constant-time comparison
//! state.rs      - shared state (dispatcher, context hub, client store)
//! ws.rs         - WebSocket MCP transport
//! routes/
//!   health.rs   - GET /, GET /health
//!   tools.rs    - tool catalog and invocation
//!   servers.rs  - REST facade over the server tools
//!   contexts.rs - context processing and store
//!   clients.rs  - in-memory API client registry
//! ```

mod auth;
mod config;
mod routes;
mod state;
mod ws;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use auth::ApiKey;
use config::Config;
use state::AppState;

/// HTTP + WebSocket gateway for LetsCloud infrastructure tools.
#[derive(Parser)]
#[command(name = "letscloud-gateway", version)]
struct Cli {
    /// Path to TOML config file.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    // Initialize tracing
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    info!("letscloud-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}", config.server.listen);

    if config.auth.api_key == "change-me" {
        warn!("Using default API key; set GATEWAY_API_KEY or update config");
    }
    if config.upstream.api_token.is_empty() {
        warn!("LETSCLOUD_API_TOKEN is not set; tool calls will fail until it is");
    }

    let state = AppState::new(config);
    info!(
        "{} tools available, upstream {}",
        state.dispatcher.catalog().len(),
        state.config.upstream.base_url
    );

    // Build router
    let public_routes = Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health));

    let authed_routes = Router::new()
        .route("/tools", get(routes::tools::list_tools))
        .route("/tools/{name}", post(routes::tools::call_tool))
        .route(
            "/api/v1/servers",
            get(routes::servers::list_servers).post(routes::servers::create_server),
        )
        .route(
            "/api/v1/servers/{id}",
            get(routes::servers::get_server).delete(routes::servers::delete_server),
        )
        .route(
            "/mcp/contexts",
            post(routes::contexts::submit_context).get(routes::contexts::list_contexts),
        )
        .route(
            "/mcp/contexts/{id}",
            get(routes::contexts::get_context).delete(routes::contexts::delete_context),
        )
        .route("/mcp/templates", get(routes::contexts::list_templates))
        .route("/mcp/health", get(routes::contexts::mcp_health))
        .route(
            "/clients",
            post(routes::clients::create_client).get(routes::clients::list_clients),
        )
        .route(
            "/clients/{id}",
            get(routes::clients::get_client)
                .put(routes::clients::update_client)
                .delete(routes::clients::delete_client),
        )
        .layer(middleware::from_fn(auth::require_api_key));

    let ws_route = Router::new().route("/mcp", get(ws::ws_upgrade));

    let app = Router::new()
        .merge(public_routes)
        .merge(authed_routes)
        .merge(ws_route)
        .layer(Extension(ApiKey(state.config.auth.api_key.clone())))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let listener = TcpListener::bind(&state.config.server.listen)
        .await
        .expect("Failed to bind");

    info!("Server ready");

    // Graceful shutdown
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM");
            tokio::select! {
                _ = ctrl_c => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("Received SIGINT");
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("Server error");

    info!("Goodbye");
}
