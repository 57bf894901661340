//! HTTP client for the LetsCloud REST API.
//!
//! [`LetsCloudClient`] wraps `reqwest::Client` and provides one method per
//! (resource, verb) pair. All responses are returned as `serde_json::Value`;
//! the dispatch layer handles formatting for the AI agent.
//!
//! ## Authentication
//!
//! Every endpoint uses Bearer token authentication with the account's API
//! token.
//!
//! ## Response envelope
//!
//! The upstream API wraps payloads as `{"success": …, "data": …}`. The
//! envelope is unwrapped here, in exactly one place: callers always see the
//! inner `data` value. Non-2xx responses are parsed for a `message` (or
//! `error`) field in the JSON body; if parsing fails, the raw response body
//! is returned as the error message.

use std::time::Duration;

use serde_json::{json, Value};

/// HTTP client for a LetsCloud account.
pub struct LetsCloudClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl LetsCloudClient {
    /// Create a new client for the API at the given base URL.
    pub fn new(base_url: &str, api_token: &str, timeout_secs: u64) -> Self {
        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "letscloud-mcp/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");
        // Strip trailing slash for consistent URL construction
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            api_token: api_token.to_string(),
        }
    }

    /// The API base URL (without trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/{path}`.
    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let resp = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// `POST {base}/{path}` with an optional JSON body.
    async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value, ClientError> {
        let mut req = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_token);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await.map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    /// `DELETE {base}/{path}`.
    async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        let resp = self
            .http
            .delete(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(ClientError::Request)?;
        Self::handle_response(resp).await
    }

    // --- Instances ---

    /// `GET /instances`: list all virtual servers on the account.
    pub async fn list_servers(&self) -> Result<Value, ClientError> {
        self.get("instances").await
    }

    /// `GET /instances/:id`: fetch one server.
    pub async fn get_server(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("instances/{}", id)).await
    }

    /// `POST /instances`: provision a new server.
    pub async fn create_server(&self, body: &Value) -> Result<Value, ClientError> {
        self.post("instances", Some(body)).await
    }

    /// `DELETE /instances/:id`: destroy a server.
    pub async fn delete_server(&self, id: u64) -> Result<Value, ClientError> {
        self.delete(&format!("instances/{}", id)).await
    }

    /// `POST /instances/:id/reboot`: power-cycle a server.
    pub async fn reboot_server(&self, id: u64) -> Result<Value, ClientError> {
        self.post(&format!("instances/{}/reboot", id), None).await
    }

    /// `POST /instances/:id/shutdown`: power a server off.
    pub async fn shutdown_server(&self, id: u64) -> Result<Value, ClientError> {
        self.post(&format!("instances/{}/shutdown", id), None).await
    }

    /// `POST /instances/:id/start`: power a server on.
    pub async fn start_server(&self, id: u64) -> Result<Value, ClientError> {
        self.post(&format!("instances/{}/start", id), None).await
    }

    // --- SSH keys ---

    /// `GET /ssh-keys`: list SSH keys on the account.
    pub async fn list_ssh_keys(&self) -> Result<Value, ClientError> {
        self.get("ssh-keys").await
    }

    /// `GET /ssh-keys/:id`: fetch one SSH key.
    pub async fn get_ssh_key(&self, id: u64) -> Result<Value, ClientError> {
        self.get(&format!("ssh-keys/{}", id)).await
    }

    /// `POST /ssh-keys`: register a new SSH key.
    pub async fn create_ssh_key(&self, body: &Value) -> Result<Value, ClientError> {
        self.post("ssh-keys", Some(body)).await
    }

    /// `DELETE /ssh-keys/:id`: remove an SSH key.
    pub async fn delete_ssh_key(&self, id: u64) -> Result<Value, ClientError> {
        self.delete(&format!("ssh-keys/{}", id)).await
    }

    // --- Snapshots ---

    /// `GET /instances/:id/snapshots`: list snapshots of a server.
    pub async fn list_snapshots(&self, server_id: u64) -> Result<Value, ClientError> {
        self.get(&format!("instances/{}/snapshots", server_id)).await
    }

    /// `GET /instances/:id/snapshots/:sid`: fetch one snapshot.
    pub async fn get_snapshot(&self, server_id: u64, snapshot_id: u64) -> Result<Value, ClientError> {
        self.get(&format!("instances/{}/snapshots/{}", server_id, snapshot_id))
            .await
    }

    /// `POST /instances/:id/snapshots`: create a snapshot of a server.
    pub async fn create_snapshot(&self, server_id: u64, body: &Value) -> Result<Value, ClientError> {
        self.post(&format!("instances/{}/snapshots", server_id), Some(body))
            .await
    }

    /// `DELETE /instances/:id/snapshots/:sid`: delete a snapshot.
    pub async fn delete_snapshot(
        &self,
        server_id: u64,
        snapshot_id: u64,
    ) -> Result<Value, ClientError> {
        self.delete(&format!("instances/{}/snapshots/{}", server_id, snapshot_id))
            .await
    }

    /// `POST /instances/:id/snapshots/:sid/restore`: roll a server back to
    /// a snapshot.
    pub async fn restore_snapshot(
        &self,
        server_id: u64,
        snapshot_id: u64,
    ) -> Result<Value, ClientError> {
        self.post(
            &format!("instances/{}/snapshots/{}/restore", server_id, snapshot_id),
            None,
        )
        .await
    }

    // --- Catalog resources ---

    /// `GET /plans`: available server plans.
    pub async fn list_plans(&self) -> Result<Value, ClientError> {
        self.get("plans").await
    }

    /// `GET /images`: available OS images.
    pub async fn list_images(&self) -> Result<Value, ClientError> {
        self.get("images").await
    }

    /// `GET /locations`: available datacenter locations.
    pub async fn list_locations(&self) -> Result<Value, ClientError> {
        self.get("locations").await
    }

    /// `GET /profile`: account profile and balance.
    pub async fn account_profile(&self) -> Result<Value, ClientError> {
        self.get("profile").await
    }

    /// Parse an HTTP response. Returns the payload on success, or a
    /// [`ClientError`] with the upstream message on failure.
    ///
    /// Success bodies are unwrapped from the `{"data": …}` envelope when
    /// present; empty success bodies (e.g. from DELETE) become `{}`.
    async fn handle_response(resp: reqwest::Response) -> Result<Value, ClientError> {
        let status = resp.status();
        let body = resp.text().await.map_err(ClientError::Request)?;

        if status.is_success() {
            if body.trim().is_empty() {
                return Ok(json!({}));
            }
            let parsed: Value = serde_json::from_str(&body)
                .map_err(|e| ClientError::Protocol(format!("Invalid JSON from API: {}", e)))?;
            Ok(unwrap_envelope(parsed))
        } else {
            // Try to extract the error message from the JSON body
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v["message"]
                        .as_str()
                        .or_else(|| v["error"].as_str())
                        .map(String::from)
                })
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Unwrap the `{"data": …}` response envelope, passing any other shape
/// through untouched.
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Errors returned by [`LetsCloudClient`] methods.
#[derive(Debug)]
pub enum ClientError {
    /// HTTP transport error (connection refused, timeout, DNS failure, etc.).
    Request(reqwest::Error),
    /// The API returned a non-2xx HTTP status.
    Api { status: u16, message: String },
    /// The response body was not valid JSON.
    Protocol(String),
}

impl ClientError {
    /// Returns `true` if the error is an HTTP 404 Not Found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Request(e) => write!(f, "HTTP request failed: {}", e),
            ClientError::Api { status, message } => {
                write!(f, "API error (HTTP {}): {}", status, message)
            }
            ClientError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}
