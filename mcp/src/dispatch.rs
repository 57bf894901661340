//! Tool dispatch: argument validation, coercion, and upstream invocation.
//!
//! [`Dispatcher::invoke`] is the single entry point every transport uses;
//! the stdio MCP loop, the WebSocket endpoint, and the HTTP facade are all
//! thin adapters over it. The sequence for a call:
//!
//! 1. Look up the tool in the catalog (unknown name means a not-found
//!    failure).
//! 2. Check required parameters in declared order, failing on the first
//!    missing one.
//! 3. Reject unknown argument keys and coerce the rest to their declared
//!    kinds.
//! 4. Resolve the upstream client, created lazily on first use. A missing
//!    API token fails the request here, before any network I/O.
//! 5. Call the matching [`LetsCloudClient`] method and return its payload.
//!
//! Failures never escape as panics: everything becomes a [`DispatchError`]
//! carrying a machine-readable [`ErrorKind`] plus a human-readable message.
//! Transports map the kind into their own code space (HTTP status, MCP
//! `isError` text).

use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;

use crate::catalog::{ToolCatalog, ToolDef};
use crate::client::{ClientError, LetsCloudClient};
use crate::config::UpstreamConfig;

/// Machine-readable failure classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable configuration (e.g. no API token).
    Config,
    /// The arguments failed schema validation.
    Validation,
    /// Unknown tool name, or the upstream reported 404 for a resource.
    NotFound,
    /// The upstream API rejected the request or was unreachable.
    Upstream,
    /// A bug: a state that validation should have made impossible.
    Internal,
}

impl ErrorKind {
    /// Stable identifier used in error payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "configuration_error",
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Upstream => "upstream_error",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// HTTP status the facade maps this kind to.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Config => 500,
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Upstream => 502,
            ErrorKind::Internal => 500,
        }
    }
}

/// A failed invocation: kind + detail. The only failure channel out of
/// [`Dispatcher::invoke`].
#[derive(Clone, Debug)]
pub struct DispatchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DispatchError {
    pub fn config(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Config,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ClientError> for DispatchError {
    fn from(e: ClientError) -> Self {
        let kind = if e.is_not_found() {
            ErrorKind::NotFound
        } else {
            ErrorKind::Upstream
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}

/// The tool dispatcher. One instance per process, shared by every transport.
pub struct Dispatcher {
    catalog: ToolCatalog,
    upstream: UpstreamConfig,
    client: OnceCell<LetsCloudClient>,
}

impl Dispatcher {
    /// Create a dispatcher over the given upstream configuration. The HTTP
    /// client is not built until the first invocation needs it.
    pub fn new(upstream: UpstreamConfig) -> Self {
        Self {
            catalog: ToolCatalog::new(),
            upstream,
            client: OnceCell::new(),
        }
    }

    /// The tool catalog, for `tools/list` and the facade listing.
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Whether an upstream API token is configured (for health reporting).
    pub fn upstream_configured(&self) -> bool {
        !self.upstream.api_token.trim().is_empty()
    }

    /// Resolve the shared upstream client, building it on first use.
    ///
    /// `OnceCell` guarantees a single construction under concurrent first
    /// calls. A missing token leaves the cell empty so a later, fixed
    /// configuration could still succeed.
    async fn client(&self) -> Result<&LetsCloudClient, DispatchError> {
        self.client
            .get_or_try_init(|| async {
                if self.upstream.api_token.trim().is_empty() {
                    return Err(DispatchError::config(
                        "LETSCLOUD_API_TOKEN is not set; cannot call the LetsCloud API",
                    ));
                }
                Ok(LetsCloudClient::new(
                    &self.upstream.base_url,
                    &self.upstream.api_token,
                    self.upstream.timeout_secs,
                ))
            })
            .await
    }

    /// Invoke a tool by name with a JSON argument object.
    ///
    /// Returns the structured payload on success. Presentation (pretty
    /// printing, result envelopes) is left to the transports.
    pub async fn invoke(&self, name: &str, args: &Value) -> Result<Value, DispatchError> {
        let tool = self
            .catalog
            .lookup(name)
            .ok_or_else(|| DispatchError::not_found(format!("Tool '{}' not found", name)))?;
        let args = validate_args(tool, args)?;
        let client = self.client().await?;
        call_tool(client, tool.name, &args).await
    }
}

/// Validate arguments against a tool descriptor.
///
/// Checks run in a fixed order and stop at the first violation: required
/// parameters (in declared order), then unknown keys, then per-parameter
/// type coercion. Returns the coerced argument map.
fn validate_args(tool: &ToolDef, args: &Value) -> Result<Map<String, Value>, DispatchError> {
    let supplied = match args {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        _ => {
            return Err(DispatchError::validation(
                "Tool arguments must be a JSON object",
            ))
        }
    };

    for param in tool.params.iter().filter(|p| p.required) {
        // A null value counts as missing
        let present = supplied.get(param.name).map(|v| !v.is_null()).unwrap_or(false);
        if !present {
            return Err(DispatchError::validation(format!(
                "Missing required parameter: {}",
                param.name
            )));
        }
    }

    for key in supplied.keys() {
        if tool.param(key).is_none() {
            return Err(DispatchError::validation(format!(
                "Unknown parameter: {}",
                key
            )));
        }
    }

    let mut coerced = Map::new();
    for param in &tool.params {
        if let Some(value) = supplied.get(param.name) {
            if value.is_null() {
                continue;
            }
            let value = param.coerce(value).map_err(DispatchError::validation)?;
            coerced.insert(param.name.to_string(), value);
        }
    }
    Ok(coerced)
}

/// Read a coerced resource ID. Validation has already type-checked it; a
/// negative value is still rejected here since upstream IDs are positive.
fn require_u64(args: &Map<String, Value>, name: &str) -> Result<u64, DispatchError> {
    match args.get(name).and_then(Value::as_u64) {
        Some(id) => Ok(id),
        None => Err(DispatchError::validation(format!(
            "Parameter '{}' must be a positive integer",
            name
        ))),
    }
}

/// Replace an empty upstream body with a structured acknowledgement, so
/// destructive operations always return something useful.
fn ack_or(payload: Value, ack: Value) -> Value {
    let empty = match &payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        ack
    } else {
        payload
    }
}

/// Route a validated call to the upstream client method.
async fn call_tool(
    client: &LetsCloudClient,
    name: &str,
    args: &Map<String, Value>,
) -> Result<Value, DispatchError> {
    match name {
        "list_servers" => Ok(client.list_servers().await?),
        "get_server" => {
            let id = require_u64(args, "server_id")?;
            Ok(client.get_server(id).await?)
        }
        "create_server" => Ok(client.create_server(&Value::Object(args.clone())).await?),
        "delete_server" => {
            let id = require_u64(args, "server_id")?;
            let payload = client.delete_server(id).await?;
            Ok(ack_or(payload, json!({ "server_id": id, "status": "deleted" })))
        }
        "reboot_server" => {
            let id = require_u64(args, "server_id")?;
            let payload = client.reboot_server(id).await?;
            Ok(ack_or(payload, json!({ "server_id": id, "status": "rebooting" })))
        }
        "shutdown_server" => {
            let id = require_u64(args, "server_id")?;
            let payload = client.shutdown_server(id).await?;
            Ok(ack_or(payload, json!({ "server_id": id, "status": "stopping" })))
        }
        "start_server" => {
            let id = require_u64(args, "server_id")?;
            let payload = client.start_server(id).await?;
            Ok(ack_or(payload, json!({ "server_id": id, "status": "starting" })))
        }
        "list_ssh_keys" => Ok(client.list_ssh_keys().await?),
        "get_ssh_key" => {
            let id = require_u64(args, "key_id")?;
            Ok(client.get_ssh_key(id).await?)
        }
        "create_ssh_key" => Ok(client.create_ssh_key(&Value::Object(args.clone())).await?),
        "delete_ssh_key" => {
            let id = require_u64(args, "key_id")?;
            let payload = client.delete_ssh_key(id).await?;
            Ok(ack_or(payload, json!({ "key_id": id, "status": "deleted" })))
        }
        "create_snapshot" => {
            let server_id = require_u64(args, "server_id")?;
            // server_id routes the request; only label/description go upstream
            let mut body = Map::new();
            for field in ["label", "description"] {
                if let Some(v) = args.get(field) {
                    body.insert(field.to_string(), v.clone());
                }
            }
            Ok(client.create_snapshot(server_id, &Value::Object(body)).await?)
        }
        "get_snapshot" => {
            let server_id = require_u64(args, "server_id")?;
            let snapshot_id = require_u64(args, "snapshot_id")?;
            Ok(client.get_snapshot(server_id, snapshot_id).await?)
        }
        "list_snapshots" => {
            let server_id = require_u64(args, "server_id")?;
            Ok(client.list_snapshots(server_id).await?)
        }
        "delete_snapshot" => {
            let server_id = require_u64(args, "server_id")?;
            let snapshot_id = require_u64(args, "snapshot_id")?;
            let payload = client.delete_snapshot(server_id, snapshot_id).await?;
            Ok(ack_or(
                payload,
                json!({ "server_id": server_id, "snapshot_id": snapshot_id, "status": "deleted" }),
            ))
        }
        "restore_snapshot" => {
            let server_id = require_u64(args, "server_id")?;
            let snapshot_id = require_u64(args, "snapshot_id")?;
            let payload = client.restore_snapshot(server_id, snapshot_id).await?;
            Ok(ack_or(
                payload,
                json!({ "server_id": server_id, "snapshot_id": snapshot_id, "status": "restoring" }),
            ))
        }
        "list_plans" => Ok(client.list_plans().await?),
        "list_images" => Ok(client.list_images().await?),
        "list_locations" => Ok(client.list_locations().await?),
        "get_account_info" => Ok(client.account_profile().await?),
        // Catalog and match are maintained together; a miss here is a bug
        _ => Err(DispatchError::internal(format!(
            "No handler for tool '{}'",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::Path;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    /// Bind a stub upstream on an ephemeral port, returning its base URL.
    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn dispatcher_for(base_url: &str) -> Dispatcher {
        Dispatcher::new(UpstreamConfig {
            api_token: "test-token".into(),
            base_url: base_url.into(),
            timeout_secs: 5,
            ..UpstreamConfig::default()
        })
    }

    /// A dispatcher with no token: any path that reaches client resolution
    /// fails with a Config error, so other error kinds prove no network
    /// call was attempted.
    fn unconfigured_dispatcher() -> Dispatcher {
        Dispatcher::new(UpstreamConfig {
            api_token: String::new(),
            base_url: "http://127.0.0.1:1".into(),
            ..UpstreamConfig::default()
        })
    }

    /// Build a syntactically valid argument object from a tool's descriptor.
    fn sample_args(tool: &ToolDef, skip: Option<&str>) -> Value {
        let mut map = Map::new();
        for param in tool.params.iter().filter(|p| p.required) {
            if Some(param.name) == skip {
                continue;
            }
            let value = match param.kind {
                crate::catalog::ParamKind::String => json!("sample"),
                crate::catalog::ParamKind::Integer => json!(1),
                crate::catalog::ParamKind::Float => json!(1.5),
                crate::catalog::ParamKind::Boolean => json!(true),
                crate::catalog::ParamKind::Array => json!([1]),
                crate::catalog::ParamKind::Object => json!({}),
            };
            map.insert(param.name.to_string(), value);
        }
        Value::Object(map)
    }

    #[tokio::test]
    async fn every_tool_accepts_complete_required_arguments() {
        let stub = Router::new().fallback(|| async { Json(json!({ "data": {} })) });
        let base = spawn_stub(stub).await;
        let dispatcher = dispatcher_for(&base);

        let names: Vec<&str> = dispatcher.catalog().iter().map(|t| t.name).collect();
        for name in names {
            let tool = dispatcher.catalog().lookup(name).unwrap().clone();
            let args = sample_args(&tool, None);
            let result = dispatcher.invoke(name, &args).await;
            assert!(result.is_ok(), "{name} failed: {:?}", result.err());
        }
    }

    #[tokio::test]
    async fn omitting_any_required_parameter_fails_before_any_network_call() {
        let dispatcher = unconfigured_dispatcher();
        let tools: Vec<ToolDef> = dispatcher.catalog().iter().cloned().collect();
        for tool in tools {
            for param in tool.params.iter().filter(|p| p.required) {
                let args = sample_args(&tool, Some(param.name));
                let err = dispatcher.invoke(tool.name, &args).await.unwrap_err();
                assert_eq!(
                    err.kind,
                    ErrorKind::Validation,
                    "{}/{} classified as {:?}",
                    tool.name,
                    param.name,
                    err.kind
                );
                assert!(
                    err.message.contains(param.name),
                    "{}: message '{}' does not name '{}'",
                    tool.name,
                    err.message,
                    param.name
                );
            }
        }
    }

    #[tokio::test]
    async fn first_missing_required_parameter_wins() {
        let dispatcher = unconfigured_dispatcher();
        let err = dispatcher
            .invoke("create_server", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Missing required parameter: label");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found_without_network() {
        let dispatcher = unconfigured_dispatcher();
        let err = dispatcher
            .invoke("nonexistent_tool", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains("nonexistent_tool"));
    }

    #[tokio::test]
    async fn unknown_argument_key_is_rejected() {
        let dispatcher = unconfigured_dispatcher();
        let err = dispatcher
            .invoke("list_servers", &json!({ "flavor": "xl" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("flavor"));
    }

    #[tokio::test]
    async fn coercion_failure_is_a_validation_error() {
        let dispatcher = unconfigured_dispatcher();
        let err = dispatcher
            .invoke("get_server", &json!({ "server_id": "not-a-number" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("server_id"));
    }

    #[tokio::test]
    async fn missing_token_is_a_config_error_after_validation() {
        let dispatcher = unconfigured_dispatcher();
        let err = dispatcher.invoke("list_servers", &json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert!(err.message.contains("LETSCLOUD_API_TOKEN"));
    }

    #[tokio::test]
    async fn list_servers_payload_passes_through_structurally() {
        let servers = json!([
            { "id": 1, "label": "web-1", "status": "running" },
            { "id": 2, "label": "db-1", "status": "stopped" }
        ]);
        let body = servers.clone();
        let stub = Router::new().route(
            "/instances",
            get(move || {
                let body = body.clone();
                async move { Json(json!({ "success": true, "data": body })) }
            }),
        );
        let base = spawn_stub(stub).await;
        let dispatcher = dispatcher_for(&base);

        let payload = dispatcher.invoke("list_servers", &json!({})).await.unwrap();
        assert_eq!(payload, servers);
    }

    #[tokio::test]
    async fn upstream_failure_is_captured_not_raised() {
        let stub = Router::new().route(
            "/instances/{id}",
            get(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "backend exploded" })),
                )
            }),
        );
        let base = spawn_stub(stub).await;
        let dispatcher = dispatcher_for(&base);

        let err = dispatcher
            .invoke("get_server", &json!({ "server_id": 42 }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Upstream);
        assert!(err.message.contains("backend exploded"));
    }

    #[tokio::test]
    async fn upstream_404_maps_to_not_found() {
        let stub = Router::new().route(
            "/instances/{id}",
            get(|| async {
                (
                    axum::http::StatusCode::NOT_FOUND,
                    Json(json!({ "message": "Instance not found" })),
                )
            }),
        );
        let base = spawn_stub(stub).await;
        let dispatcher = dispatcher_for(&base);

        let err = dispatcher
            .invoke("get_server", &json!({ "server_id": 999 }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn create_server_round_trip_echoes_coerced_body() {
        let stub = Router::new().route(
            "/instances",
            post(|Json(body): Json<Value>| async move {
                let mut data = body;
                data["id"] = json!(123);
                Json(json!({ "data": data }))
            }),
        );
        let base = spawn_stub(stub).await;
        let dispatcher = dispatcher_for(&base);

        let args = json!({
            "label": "web-1",
            "plan_slug": "1vcpu-1gb",
            "image_slug": "ubuntu-24.04",
            "location_slug": "mia1",
            "ssh_keys": ["7", 8]
        });
        let payload = dispatcher.invoke("create_server", &args).await.unwrap();
        assert_eq!(payload["id"], json!(123));
        assert_eq!(payload["label"], json!("web-1"));
        // String key IDs were coerced to integers before forwarding
        assert_eq!(payload["ssh_keys"], json!([7, 8]));
    }

    #[tokio::test]
    async fn delete_server_acknowledges_empty_upstream_body() {
        let stub = Router::new().route(
            "/instances/{id}",
            axum::routing::delete(|Path(id): Path<u64>| async move {
                let _ = id;
                Json(json!({}))
            }),
        );
        let base = spawn_stub(stub).await;
        let dispatcher = dispatcher_for(&base);

        let payload = dispatcher
            .invoke("delete_server", &json!({ "server_id": "55" }))
            .await
            .unwrap();
        assert_eq!(payload, json!({ "server_id": 55, "status": "deleted" }));
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let dispatcher = unconfigured_dispatcher();
        let err = dispatcher
            .invoke("list_servers", &json!(["positional"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn null_argument_counts_as_missing() {
        let dispatcher = unconfigured_dispatcher();
        let err = dispatcher
            .invoke("get_server", &json!({ "server_id": null }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("server_id"));
    }
}
