//! REST facade over the server tools.
//!
//! - `GET /api/v1/servers`: list all servers
//! - `POST /api/v1/servers`: create a server
//! - `GET /api/v1/servers/{id}`: fetch one server
//! - `DELETE /api/v1/servers/{id}`: delete a server
//!
//! These are thin adapters over the shared dispatcher: the same validation
//! and upstream client as `tools/call`, with REST-shaped paths and bodies.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::routes::tools::dispatch_error;
use crate::state::AppState;

/// `GET /api/v1/servers`: upstream server list, passed through unchanged.
pub async fn list_servers(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .dispatcher
        .invoke("list_servers", &Value::Null)
        .await
        .map(Json)
        .map_err(|e| dispatch_error(&e))
}

/// `GET /api/v1/servers/{id}`: one server; 404 when the upstream reports
/// no such instance.
pub async fn get_server(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .dispatcher
        .invoke("get_server", &json!({ "server_id": id }))
        .await
        .map(Json)
        .map_err(|e| dispatch_error(&e))
}

/// `POST /api/v1/servers`: create a server. The body is the tool argument
/// object (`label`, `plan_slug`, `image_slug`, `location_slug`, …);
/// validation failures come back as 400.
pub async fn create_server(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .dispatcher
        .invoke("create_server", &body)
        .await
        .map(Json)
        .map_err(|e| dispatch_error(&e))
}

/// `DELETE /api/v1/servers/{id}`: delete a server.
pub async fn delete_server(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .dispatcher
        .invoke("delete_server", &json!({ "server_id": id }))
        .await
        .map(|_| Json(json!({ "message": format!("Server {id} deleted successfully") })))
        .map_err(|e| dispatch_error(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    use crate::config::Config;

    /// In-process upstream stub with two servers and an echoing create.
    async fn spawn_stub() -> String {
        let stub = Router::new()
            .route(
                "/instances",
                get(|| async {
                    Json(json!({ "data": [
                        { "id": 1, "label": "web-01" },
                        { "id": 2, "label": "db-01" },
                    ]}))
                })
                .post(|Json(mut body): Json<Value>| async move {
                    body["id"] = json!(123);
                    Json(json!({ "data": body }))
                }),
            )
            .route(
                "/instances/{id}",
                get(|Path(id): Path<u64>| async move {
                    if id == 1 {
                        (
                            StatusCode::OK,
                            Json(json!({ "data": { "id": 1, "label": "web-01" } })),
                        )
                    } else {
                        (
                            StatusCode::NOT_FOUND,
                            Json(json!({ "message": "Server not found" })),
                        )
                    }
                })
                .delete(|| async { (StatusCode::OK, Json(json!({ "data": {} }))) }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn stub_app() -> Router {
        let base_url = spawn_stub().await;
        let mut config: Config = toml::from_str("").unwrap();
        config.upstream.api_token = "token".to_string();
        config.upstream.base_url = base_url;
        let state = AppState::new(config);
        Router::new()
            .route("/api/v1/servers", get(list_servers).post(create_server))
            .route(
                "/api/v1/servers/{id}",
                get(get_server).delete(delete_server),
            )
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn listing_passes_the_upstream_payload_through() {
        let app = stub_app().await;
        let response = app
            .oneshot(Request::get("/api/v1/servers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        assert_eq!(body[0]["label"], "web-01");
    }

    #[tokio::test]
    async fn fetching_a_known_server_succeeds() {
        let app = stub_app().await;
        let response = app
            .oneshot(
                Request::get("/api/v1/servers/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
    }

    #[tokio::test]
    async fn upstream_not_found_maps_to_http_404() {
        let app = stub_app().await;
        let response = app
            .oneshot(
                Request::get("/api/v1/servers/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "not_found");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Server not found"));
    }

    #[tokio::test]
    async fn creating_forwards_the_validated_body() {
        let app = stub_app().await;
        let payload = json!({
            "label": "web-02",
            "plan_slug": "1vcpu-1gb-10ssd",
            "image_slug": "ubuntu-24.04-x86_64",
            "location_slug": "MIA1",
        });
        let response = app
            .oneshot(
                Request::post("/api/v1/servers")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 123);
        assert_eq!(body["label"], "web-02");
    }

    #[tokio::test]
    async fn creating_without_required_fields_is_a_400() {
        let app = stub_app().await;
        let response = app
            .oneshot(
                Request::post("/api/v1/servers")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "label": "web-02" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "validation_error");
        assert_eq!(
            body["error"]["message"],
            "Missing required parameter: plan_slug"
        );
    }

    #[tokio::test]
    async fn deleting_acknowledges_with_a_message() {
        let app = stub_app().await;
        let response = app
            .oneshot(
                Request::delete("/api/v1/servers/2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Server 2 deleted successfully");
    }
}
