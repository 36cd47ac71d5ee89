//! HTTP tool surface: REST endpoints for calling tools and reading history.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::RouterMode;
use crate::error::ToolError;
use crate::memory::{ConversationStore, DEFAULT_HISTORY_LIMIT};
use crate::tools::ToolRegistry;

/// Shared state for the HTTP routes.
#[derive(Clone)]
pub struct HttpState {
    pub tools: Arc<ToolRegistry>,
    pub store: Arc<ConversationStore>,
    pub mode: RouterMode,
}

/// Build the REST routes.
pub fn http_routes(state: HttpState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{name}", post(call_tool))
        .route("/api/history/{user_id}", get(get_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `port` on all interfaces and serve until the task is dropped.
pub async fn serve(state: HttpState, port: u16) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "HTTP tool surface started");
    axum::serve(listener, http_routes(state)).await
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<HttpState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "convo-assist",
        "mode": state.mode.to_string(),
    }))
}

// ── Tools ───────────────────────────────────────────────────────────────

/// GET /api/tools
async fn list_tools(State(state): State<HttpState>) -> impl IntoResponse {
    Json(state.tools.tool_definitions().await)
}

/// POST /api/tools/{name}
///
/// The body is the tool's JSON parameters object. Returns `{"output": ...}`
/// on success and `{"error": ...}` otherwise.
async fn call_tool(
    State(state): State<HttpState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> impl IntoResponse {
    match state.tools.execute(&name, params).await {
        Ok(output) => (
            StatusCode::OK,
            Json(serde_json::json!({"output": output.result})),
        ),
        Err(e) => {
            let status = match e {
                ToolError::NotFound { .. } => StatusCode::NOT_FOUND,
                ToolError::InvalidParameters { .. } => StatusCode::BAD_REQUEST,
            };
            (status, Json(serde_json::json!({"error": e.to_string()})))
        }
    }
}

// ── History ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

/// GET /api/history/{user_id}?limit=N
async fn get_history(
    State(state): State<HttpState>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.store.history(&user_id, limit).await)
}
