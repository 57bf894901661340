//! API client registry endpoints.
//!
//! - `POST /clients`: register a client
//! - `GET /clients`: list registered clients
//! - `GET /clients/{id}`: fetch one client
//! - `PUT /clients/{id}`: partial update
//! - `DELETE /clients/{id}`: remove a client
//!
//! The registry is an in-memory keyed store; a gateway restart clears it.
//! `allowed_actions` and `rate_limit` are carried as client metadata and are
//! not enforced on requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::state::AppState;

/// A registered API client.
#[derive(Clone, Debug, Serialize)]
pub struct ClientRecord {
    pub id: String,
    pub name: String,
    pub api_token: String,
    pub is_active: bool,
    pub allowed_actions: Vec<String>,
    pub rate_limit: u32,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

/// Body of `POST /clients`. Everything except `name` has a default;
/// a missing `api_token` is generated.
#[derive(Debug, Deserialize)]
pub struct CreateClient {
    pub name: String,
    pub api_token: Option<String>,
    pub is_active: Option<bool>,
    pub allowed_actions: Option<Vec<String>>,
    pub rate_limit: Option<u32>,
}

/// Body of `PUT /clients/{id}`. Absent fields keep their current values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub api_token: Option<String>,
    pub is_active: Option<bool>,
    pub allowed_actions: Option<Vec<String>>,
    pub rate_limit: Option<u32>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn default_actions() -> Vec<String> {
    vec![
        "create".to_string(),
        "read".to_string(),
        "update".to_string(),
        "delete".to_string(),
    ]
}

/// Mutex-guarded in-memory client registry.
#[derive(Clone, Default)]
pub struct ClientStore {
    inner: Arc<Mutex<HashMap<String, ClientRecord>>>,
}

impl ClientStore {
    /// Register a client, filling defaults and generating ids/tokens.
    pub async fn insert(&self, request: CreateClient) -> ClientRecord {
        let now = now_ms();
        let record = ClientRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            api_token: request
                .api_token
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            is_active: request.is_active.unwrap_or(true),
            allowed_actions: request.allowed_actions.unwrap_or_else(default_actions),
            rate_limit: request.rate_limit.unwrap_or(100),
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.inner
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        record
    }

    /// All registered clients, oldest first.
    pub async fn list(&self) -> Vec<ClientRecord> {
        let store = self.inner.lock().await;
        let mut clients: Vec<ClientRecord> = store.values().cloned().collect();
        clients.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        clients
    }

    pub async fn get(&self, id: &str) -> Option<ClientRecord> {
        self.inner.lock().await.get(id).cloned()
    }

    /// Apply a partial update; `None` when the id is unknown.
    pub async fn update(&self, id: &str, update: UpdateClient) -> Option<ClientRecord> {
        let mut store = self.inner.lock().await;
        let record = store.get_mut(id)?;
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(token) = update.api_token {
            record.api_token = token;
        }
        if let Some(active) = update.is_active {
            record.is_active = active;
        }
        if let Some(actions) = update.allowed_actions {
            record.allowed_actions = actions;
        }
        if let Some(limit) = update.rate_limit {
            record.rate_limit = limit;
        }
        record.updated_at_ms = now_ms();
        Some(record.clone())
    }

    pub async fn remove(&self, id: &str) -> Option<ClientRecord> {
        self.inner.lock().await.remove(id)
    }
}

fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "Client not found"})),
    )
}

/// `POST /clients`: register a new API client.
pub async fn create_client(
    State(state): State<AppState>,
    Json(request): Json<CreateClient>,
) -> Json<ClientRecord> {
    Json(state.clients.insert(request).await)
}

/// `GET /clients`: every registered client.
pub async fn list_clients(State(state): State<AppState>) -> Json<Value> {
    let clients = state.clients.list().await;
    let total = clients.len();
    Json(json!({ "clients": clients, "total": total }))
}

/// `GET /clients/{id}`: one client; 404 for unknown ids.
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClientRecord>, (StatusCode, Json<Value>)> {
    state.clients.get(&id).await.map(Json).ok_or_else(not_found)
}

/// `PUT /clients/{id}`: partial update; absent fields are left untouched.
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<UpdateClient>,
) -> Result<Json<ClientRecord>, (StatusCode, Json<Value>)> {
    state
        .clients
        .update(&id, update)
        .await
        .map(Json)
        .ok_or_else(not_found)
}

/// `DELETE /clients/{id}`: remove a client.
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .clients
        .remove(&id)
        .await
        .map(|_| Json(json!({"message": "Client deleted successfully"})))
        .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{
        body::Body,
        http::Request,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    use crate::config::Config;

    fn app() -> Router {
        let config: Config = toml::from_str("").unwrap();
        let state = AppState::new(config);
        Router::new()
            .route("/clients", post(create_client).get(list_clients))
            .route(
                "/clients/{id}",
                get(get_client).put(update_client).delete(delete_client),
            )
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request_json(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn creation_fills_defaults() {
        let app = app();
        let response = app
            .oneshot(request_json("POST", "/clients", json!({ "name": "agent-1" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "agent-1");
        assert!(!body["id"].as_str().unwrap().is_empty());
        assert!(!body["api_token"].as_str().unwrap().is_empty());
        assert_eq!(body["is_active"], true);
        assert_eq!(body["rate_limit"], 100);
        assert_eq!(body["allowed_actions"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn listing_contains_created_clients() {
        let app = app();
        for name in ["agent-1", "agent-2"] {
            app.clone()
                .oneshot(request_json("POST", "/clients", json!({ "name": name })))
                .await
                .unwrap();
        }
        let response = app
            .oneshot(Request::get("/clients").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn fetch_update_delete_round_trip() {
        let app = app();
        let created = body_json(
            app.clone()
                .oneshot(request_json(
                    "POST",
                    "/clients",
                    json!({ "name": "agent-1", "api_token": "fixed-token" }),
                ))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let fetched = body_json(
            app.clone()
                .oneshot(
                    Request::get(format!("/clients/{id}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(fetched["api_token"], "fixed-token");

        // Partial update: only is_active changes
        let updated = body_json(
            app.clone()
                .oneshot(request_json(
                    "PUT",
                    &format!("/clients/{id}"),
                    json!({ "is_active": false }),
                ))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(updated["is_active"], false);
        assert_eq!(updated["name"], "agent-1");
        assert_eq!(updated["api_token"], "fixed-token");

        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/clients/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let deleted = body_json(response).await;
        assert_eq!(deleted["message"], "Client deleted successfully");

        let response = app
            .oneshot(
                Request::get(format!("/clients/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_ids_are_404() {
        let app = app();
        let response = app
            .clone()
            .oneshot(request_json("PUT", "/clients/ghost", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::delete("/clients/ghost").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
