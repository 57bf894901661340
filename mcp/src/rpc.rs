//! MCP (Model Context Protocol) JSON-RPC handler.
//!
//! Implements the [MCP protocol](https://spec.modelcontextprotocol.io/):
//! JSON-RPC 2.0 requests in, responses out. The method handling lives in
//! [`handle_request`] so that every transport shares it: [`run_stdio`] feeds
//! it newline-delimited frames from stdin, and the gateway's WebSocket
//! endpoint feeds it text frames.
//!
//! ## Supported methods
//!
//! | Method              | Description                      |
//! |---------------------|----------------------------------|
//! | `initialize`        | Handshake, returns capabilities  |
//! | `tools/list`        | List available tool definitions  |
//! | `tools/call`        | Execute a tool and return result |
//! | `ping`              | Liveness check                   |
//!
//! Notifications (`notifications/initialized`, `notifications/cancelled`)
//! are acknowledged silently. Tool failures are carried in-band as
//! `isError` results, not JSON-RPC protocol errors.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::dispatch::{DispatchError, Dispatcher};

const SERVER_NAME: &str = "mcp-letscloud";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Parse one raw frame and handle it. Returns `None` when no response
/// should be sent (notifications).
pub async fn handle_frame(dispatcher: &Dispatcher, raw: &str) -> Option<Value> {
    let request: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            return Some(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {
                    "code": -32700,
                    "message": format!("Parse error: {}", e)
                }
            }));
        }
    };
    handle_request(dispatcher, &request).await
}

/// Handle a parsed JSON-RPC request. Returns `None` for notifications.
pub async fn handle_request(dispatcher: &Dispatcher, request: &Value) -> Option<Value> {
    let id = request.get("id").cloned();
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");

    // Notifications (no id) are acknowledged silently
    if id.is_none() {
        match method {
            "notifications/initialized" | "notifications/cancelled" => {}
            _ => {
                eprintln!("mcp-letscloud: unknown notification: {}", method);
            }
        }
        return None;
    }

    let response = match method {
        "initialize" => handle_initialize(),
        "tools/list" => handle_tools_list(dispatcher),
        "tools/call" => handle_tools_call(dispatcher, request).await,
        "ping" => json!({ "jsonrpc": "2.0", "result": {} }),
        _ => json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32601,
                "message": format!("Method not found: {}", method)
            }
        }),
    };

    Some(inject_id(response, id))
}

/// Handle `initialize`: protocol version, capabilities, and server info.
fn handle_initialize() -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        }
    })
}

/// Handle `tools/list`: the catalog in registration order.
fn handle_tools_list(dispatcher: &Dispatcher) -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "tools": dispatcher.catalog().definitions()
        }
    })
}

/// Handle `tools/call`: invoke through the dispatcher and wrap the outcome
/// as MCP content.
async fn handle_tools_call(dispatcher: &Dispatcher, request: &Value) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    let outcome = dispatcher.invoke(name, &args).await;
    json!({
        "jsonrpc": "2.0",
        "result": tool_result(outcome)
    })
}

/// Render an invocation outcome as an MCP `tools/call` result: a single
/// text content block, with `isError` set on failure.
fn tool_result(outcome: Result<Value, DispatchError>) -> Value {
    match outcome {
        Ok(payload) => {
            let text = serde_json::to_string_pretty(&payload).unwrap_or_default();
            json!({ "content": [{ "type": "text", "text": text }] })
        }
        Err(e) => {
            let text = format!("{}: {}", e.kind.as_str(), e.message);
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": true
            })
        }
    }
}

/// Inject the request `id` into a response object.
fn inject_id(mut response: Value, id: Option<Value>) -> Value {
    if let Some(id) = id {
        response["id"] = id;
    }
    response
}

/// Run the MCP server on stdio, processing JSON-RPC requests until EOF.
///
/// stdout carries protocol frames only; diagnostics go to stderr.
pub async fn run_stdio(dispatcher: &Dispatcher) {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("mcp-letscloud: stdin read error: {}", e);
                break;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(response) = handle_frame(dispatcher, trimmed).await {
            write_response(&mut stdout, &response).await;
        }
    }
}

/// Write a JSON-RPC response to stdout (one line, flushed immediately).
async fn write_response(stdout: &mut tokio::io::Stdout, response: &Value) {
    let mut output = serde_json::to_string(response).unwrap_or_default();
    output.push('\n');
    if let Err(e) = stdout.write_all(output.as_bytes()).await {
        eprintln!("mcp-letscloud: stdout write error: {}", e);
    }
    if let Err(e) = stdout.flush().await {
        eprintln!("mcp-letscloud: stdout flush error: {}", e);
    }
}
