//! Tools Router - read-only HTTP view of the catalog
//!
//! Mounted by the service at `/api/tools`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::catalog::ToolCatalog;

/// Tools service state
#[derive(Clone)]
pub struct ToolsState {
    pub catalog: Arc<ToolCatalog>,
}

impl ToolsState {
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self { catalog }
    }
}

/// Create the tools router
///
/// ```ignore
/// use avi_http::RouterBuilder;
/// use avi_tools::router::{create_router, ToolsState};
///
/// let state = ToolsState::new(Arc::new(ToolCatalog::standard()));
/// let router = RouterBuilder::new()
///     .nest("/api/tools", "tools", create_router(state))
///     .build();
/// ```
pub fn create_router(state: ToolsState) -> Router {
    Router::new()
        .route("/", get(list_tools_handler))
        .route("/:name", get(get_tool_handler))
        .with_state(state)
}

/// Service info for the avi-http ServiceRouter trait
pub struct ToolsServiceRouter;

impl avi_http::router::ServiceRouter for ToolsServiceRouter {
    fn prefix() -> &'static str {
        "/api/tools"
    }

    fn name() -> &'static str {
        "tools"
    }

    fn description() -> &'static str {
        "Tool catalog shown to the language model"
    }
}

// === Handlers ===

async fn list_tools_handler(State(state): State<ToolsState>) -> impl IntoResponse {
    let tools: Vec<_> = state
        .catalog
        .list_descriptors()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "access": t.access_level(),
            })
        })
        .collect();

    Json(json!({
        "version": state.catalog.version(),
        "count": tools.len(),
        "tools": tools,
    }))
}

async fn get_tool_handler(
    State(state): State<ToolsState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.catalog.find_by_name(&name) {
        Ok(tool) => (
            StatusCode::OK,
            Json(json!({
                "name": tool.name,
                "description": tool.description,
                "access": tool.access_level(),
                "parameters": tool.parameter_schema,
            })),
        ),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": e.to_string(), "kind": e.kind() })),
        ),
    }
}
