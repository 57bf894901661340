//! Tool catalog and invocation endpoints.
//!
//! - `GET /tools`: list every tool with its JSON Schema
//! - `POST /tools/{name}`: invoke one tool with a JSON argument object
//!
//! Invocation routes through the shared dispatcher; failures map the error
//! kind onto an HTTP status (validation → 400, not found → 404, upstream →
//! 502, configuration/internal → 500) with an `{"error": {kind, message}}`
//! body.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use mcp_letscloud::dispatch::DispatchError;

use crate::state::AppState;

/// Render a dispatch failure as an HTTP response pair.
pub(crate) fn dispatch_error(e: &DispatchError) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(e.kind.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": {
                "kind": e.kind.as_str(),
                "message": e.message,
            },
        })),
    )
}

/// `GET /tools`: the full tool catalog in registration order.
pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<Value> = state
        .dispatcher
        .catalog()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema(),
            })
        })
        .collect();
    let total = tools.len();
    Json(json!({ "tools": tools, "total": total }))
}

/// `POST /tools/{name}`: invoke a tool.
///
/// The body is `{"arguments": {…}}`; both the body and the `arguments` key
/// may be omitted for tools without required parameters.
pub async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Option<Json<Value>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let args = payload
        .and_then(|Json(body)| body.get("arguments").cloned())
        .unwrap_or(Value::Null);

    match state.dispatcher.invoke(&name, &args).await {
        Ok(result) => Ok(Json(json!({ "tool": name, "result": result }))),
        Err(e) => Err(dispatch_error(&e)),
    }
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

    fn test_state(token: &str) -> AppState {
        let mut config: Config = toml::from_str("").unwrap();
        config.upstream.api_token = token.to_string();
        // TEST-NET-1 address, never routable
        config.upstream.base_url = "http://192.0.2.1:1".to_string();
        AppState::new(config)
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/tools", get(list_tools))
            .route("/tools/{name}", post(call_tool))
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn listing_reports_every_tool_with_schema() {
        let app = app(test_state("token"));
        let response = app
            .oneshot(Request::get("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total"], 20);
        assert_eq!(body["tools"][0]["name"], "list_servers");
        assert_eq!(
            body["tools"][0]["input_schema"]["type"],
            "object"
        );
    }

    #[tokio::test]
    async fn unknown_tool_maps_to_http_404() {
        let app = app(test_state("token"));
        let response = app
            .oneshot(post_json("/tools/warp_drive", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "not_found");
    }

    #[tokio::test]
    async fn validation_failure_maps_to_http_400() {
        let app = app(test_state("token"));
        let response = app
            .oneshot(post_json("/tools/get_server", json!({ "arguments": {} })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "validation_error");
        assert_eq!(
            body["error"]["message"],
            "Missing required parameter: server_id"
        );
    }

    #[tokio::test]
    async fn missing_token_maps_to_http_500() {
        let app = app(test_state(""));
        let response = app
            .oneshot(post_json("/tools/list_servers", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "configuration_error");
    }

    #[tokio::test]
    async fn body_is_optional_for_parameterless_tools() {
        // Unconfigured token keeps the call offline; reaching the config
        // error proves the empty body cleared validation
        let app = app(test_state(""));
        let response = app
            .oneshot(
                Request::post("/tools/list_plans")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "configuration_error");
    }
}
