//! Chat Router - HTTP endpoints for chat, models, health and passthrough
//!
//! Mounted by the service at `/api`. NO server code here - just route
//! definitions.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/chat` | POST | One chat turn |
//! | `/models` | GET | Models offered by the backend |
//! | `/models/validate` | POST | Check one model name |
//! | `/health` | GET | Probe controller and model backend |
//! | `/avi/*path` | ANY | Generic controller passthrough |

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use avi_core::{CallContext, Error};
use avi_gateway::{ApiMethod, GenericRequest, QueryParams, ResourceKind};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::orchestrator::{ChatReply, ChatSubmission, RequestOrchestrator};

/// Chat service state
#[derive(Clone)]
pub struct ChatState {
    pub orchestrator: Arc<RequestOrchestrator>,
    /// Budget for one chat turn
    pub request_timeout: Duration,
    /// Budget for each health probe
    pub probe_timeout: Duration,
}

impl ChatState {
    pub fn new(orchestrator: Arc<RequestOrchestrator>, request_timeout: Duration) -> Self {
        Self {
            orchestrator,
            request_timeout,
            probe_timeout: Duration::from_secs(5),
        }
    }

    /// Handlers hold a drop guard so a client disconnect cancels the context
    fn context(&self, timeout: Duration) -> CallContext {
        CallContext::with_timeout(timeout)
    }
}

/// Create the chat router
pub fn create_router(state: ChatState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/models", get(models_handler))
        .route("/models/validate", post(validate_model_handler))
        .route("/health", get(health_handler))
        .route("/avi/*path", any(avi_proxy_handler))
        .with_state(state)
}

/// Service info for the avi-http ServiceRouter trait
pub struct ChatServiceRouter;

impl avi_http::router::ServiceRouter for ChatServiceRouter {
    fn prefix() -> &'static str {
        "/api"
    }

    fn name() -> &'static str {
        "chat"
    }

    fn description() -> &'static str {
        "Chat, model and controller passthrough endpoints"
    }
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// Error rendered as `{"error", "kind"}` with a matching status
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidRequest(rejection.body_text()))
    }
}

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidRequest(_) | Error::UnknownModel(_) | Error::InvalidConversation(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::UnknownTool(_)
        | Error::MissingArgument { .. }
        | Error::InvalidArgument { .. }
        | Error::GatewayValidation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::GatewayNotFound(_) => StatusCode::NOT_FOUND,
        Error::GatewayAuthentication(_) => StatusCode::UNAUTHORIZED,
        Error::ModelTimeout(_) | Error::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::UpstreamModel { .. } | Error::GatewayServer { .. } | Error::GatewayNetwork(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(kind = self.0.kind(), status = status.as_u16(), "Request failed: {}", self.0);
        } else {
            warn!(kind = self.0.kind(), status = status.as_u16(), "Request rejected: {}", self.0);
        }
        let body = json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        (status, Json(body)).into_response()
    }
}

// === Handlers ===

async fn chat_handler(
    State(state): State<ChatState>,
    payload: Result<Json<ChatSubmission>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(submission) = payload?;
    let ctx = state.context(state.request_timeout);
    let _guard = ctx.drop_guard();

    let reply = state.orchestrator.handle(&ctx, submission).await?;
    Ok(Json(reply))
}

async fn models_handler(State(state): State<ChatState>) -> Result<Json<Value>, ApiError> {
    let ctx = state.context(state.probe_timeout);
    let _guard = ctx.drop_guard();

    let adapter = state.orchestrator.adapter();
    let models = adapter.list_available_models(&ctx).await?;
    Ok(Json(json!({
        "models": models,
        "default": adapter.default_model(),
        "provider": adapter.provider(),
    })))
}

#[derive(Deserialize)]
struct ValidateRequest {
    model: String,
}

async fn validate_model_handler(
    State(state): State<ChatState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let ctx = state.context(state.probe_timeout);
    let _guard = ctx.drop_guard();

    let valid = state
        .orchestrator
        .adapter()
        .validate_model(&ctx, &request.model)
        .await?;
    Ok(Json(json!({ "model": request.model, "valid": valid })))
}

async fn health_handler(State(state): State<ChatState>) -> impl IntoResponse {
    let ctx = state.context(state.probe_timeout);
    let _guard = ctx.drop_guard();
    let orchestrator = &state.orchestrator;

    // Generic operations bypass the list cache, so this reaches the controller
    let check = GenericRequest::new(ApiMethod::Get, ResourceKind::VirtualService.collection_path())
        .with_query(QueryParams::new().with("limit_by", "1"));
    let avi = orchestrator.controller().execute(&ctx, &check).await;
    let llm = orchestrator.adapter().list_available_models(&ctx).await;

    let healthy = avi.is_ok() && llm.is_ok();
    let mut status = json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "provider": orchestrator.provider(),
        "avi_status": if avi.is_ok() { "healthy" } else { "unhealthy" },
        "llm_status": if llm.is_ok() { "healthy" } else { "unhealthy" },
    });
    if let Err(e) = &avi {
        warn!(kind = e.kind(), "Controller health check failed: {}", e);
        status["avi_error"] = json!(e.to_string());
    }
    if let Err(e) = &llm {
        warn!(kind = e.kind(), "Model backend health check failed: {}", e);
        status["llm_error"] = json!(e.to_string());
    }
    Json(status)
}

async fn avi_proxy_handler(
    State(state): State<ChatState>,
    method: Method,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let method: ApiMethod = method.as_str().parse()?;
    let mut request = GenericRequest::new(method, path).with_query(params.into_iter().collect());

    let carries_body = matches!(method, ApiMethod::Post | ApiMethod::Put | ApiMethod::Patch);
    if carries_body && !body.is_empty() {
        let parsed: Value = serde_json::from_slice(&body)
            .map_err(|e| Error::InvalidRequest(format!("request body is not JSON: {}", e)))?;
        request = request.with_body(parsed);
    }

    let ctx = state.context(state.request_timeout);
    let _guard = ctx.drop_guard();
    let result = state.orchestrator.controller().execute(&ctx, &request).await?;
    Ok(Json(result))
}
