//! WebSocket MCP transport.
//!
//! ## Connection lifecycle
//!
//! 1. Client connects to `GET /mcp?token=<api_key>`: the token is validated
//!    in constant time before the upgrade completes.
//! 2. Each text frame carries one JSON-RPC request and is answered with one
//!    response frame. Notifications (requests without an `id`) produce no
//!    frame at all.
//! 3. On close (or any transport error) the connection simply ends; there is
//!    no per-connection state to tear down.
//!
//! The method surface is identical to the stdio transport (`initialize`,
//! `tools/list`, `tools/call`, `ping`) because both feed the same protocol
//! handler.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use mcp_letscloud::rpc;

use crate::auth::constant_time_eq;
use crate::state::AppState;

/// Query parameters for the WebSocket upgrade request.
#[derive(Deserialize)]
pub struct WsQuery {
    /// API key passed as a query parameter (since HTTP headers aren't
    /// available during a browser WebSocket upgrade).
    pub token: String,
}

/// `GET /mcp?token=<key>`: WebSocket upgrade handler.
///
/// Validates the token before upgrading. Returns `403 Forbidden` on auth
/// failure.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    if !constant_time_eq(
        state.config.auth.api_key.as_bytes(),
        query.token.as_bytes(),
    ) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Frame loop: parse, dispatch, answer.
async fn handle_ws(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    info!("MCP WebSocket client connected");

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                let Some(response) = rpc::handle_frame(&state.dispatcher, &text).await else {
                    continue;
                };
                let frame = response.to_string();
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            // Ping/pong frames are handled by the websocket layer; binary
            // frames are not part of the MCP surface.
            _ => {}
        }
    }

    debug!("MCP WebSocket client disconnected");
}
