//! Context processing endpoints.
//!
//! - `POST /mcp/contexts`: submit a context for validation and processing
//! - `GET /mcp/contexts`: list stored contexts (`?type=`/`?kind=` and
//!   `?state=` filters)
//! - `GET /mcp/contexts/{id}`: fetch one stored context
//! - `DELETE /mcp/contexts/{id}`: remove a stored context
//! - `GET /mcp/templates`: context templates derived from validation rules
//!   (optional `?type=` filter)
//! - `GET /mcp/health`: context subsystem health
//!
//! Processing always answers 200; acceptance or failure is carried in the
//! response body's `success` flag, with invalid contexts never stored.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use mcp_letscloud::context::{Context, ContextKind, ContextRequest, ContextResponse, ContextState};

use crate::state::AppState;

/// `POST /mcp/contexts`: validate, store, and run a context.
pub async fn submit_context(
    State(state): State<AppState>,
    Json(request): Json<ContextRequest>,
) -> Json<ContextResponse> {
    let response = state
        .contexts
        .process(&state.dispatcher, request.into_context())
        .await;
    Json(response)
}

/// Query filters for the context listing.
///
/// Contexts serialize their kind as `type`, so that is the filter's wire
/// spelling; `kind` is accepted as an alias.
#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<ContextKind>,
    pub state: Option<ContextState>,
}

/// `GET /mcp/contexts`: stored contexts, oldest first.
pub async fn list_contexts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let contexts = state.contexts.list(query.kind, query.state).await;
    let total = contexts.len();
    Json(json!({ "contexts": contexts, "total": total }))
}

/// `GET /mcp/contexts/{id}`: one stored context; 404 for unknown ids.
pub async fn get_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Context>, (StatusCode, Json<Value>)> {
    match state.contexts.get(&id).await {
        Some(context) => Ok(Json(context)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Context not found"})),
        )),
    }
}

/// `DELETE /mcp/contexts/{id}`: remove a stored context.
pub async fn delete_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.contexts.remove(&id).await {
        Some(_) => Ok(Json(json!({"message": "Context deleted successfully"}))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Context not found"})),
        )),
    }
}

/// Query filter for the template listing.
#[derive(Deserialize)]
pub struct TemplateQuery {
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<ContextKind>,
}

/// `GET /mcp/templates`: templates derived from the registered rules,
/// optionally narrowed to one context type.
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Json<Value> {
    let mut templates = state.contexts.templates();
    if let Some(kind) = query.kind {
        templates.retain(|t| t["type"] == kind.as_str());
    }
    let total = templates.len();
    Json(json!({ "templates": templates, "total": total }))
}

/// `GET /mcp/health`: context subsystem counters.
pub async fn mcp_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "contexts_stored": state.contexts.stored_count().await,
        "templates_available": state.contexts.template_count(),
    }))
}
