//! # REST API for the Status Service
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health check
//! - `POST /api/v1/status-list/create` - Create a status list
//! - `POST /api/v1/status-list/publish` - Broadcast externally computed bits
//! - `POST /api/v1/status-list/check` - Check one index
//! - `POST /api/v1/status-list/update` - Revoke, suspend or reinstate indices
//! - `GET  /api/v1/status-list/search` - List head versions of a collection
//! - `POST /api/v1/status-list` - Any of the above, tagged by `operation`

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use shared::{error::StatusError, types::*};

use crate::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = &state.config.api;
    let body_limit = RequestBodyLimitLayer::new(api.max_body_size);
    let enable_cors = api.enable_cors;

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/status-list", post(dispatch))
        .route("/api/v1/status-list/create", post(create_status_list))
        .route("/api/v1/status-list/publish", post(broadcast_status_list))
        .route("/api/v1/status-list/check", post(check_status))
        .route("/api/v1/status-list/update", post(update_status))
        .route("/api/v1/status-list/search", get(search_status_lists))
        .layer(body_limit)
        .with_state(state);

    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": shared::VERSION,
        "registry": state.service.chain().registry().backend_name(),
        "cache": state.cache.stats(),
    }))
}

/// Create a new all-zero status list
///
/// # Request Body
/// ```json
/// {
///   "collectionId": "did:cheqd:testnet:...",
///   "name": "employees",
///   "purpose": "suspension",
///   "length": 140000,
///   "encoding": "base64url"
/// }
/// ```
async fn create_status_list(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateStatusListRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StatusListResourceVersion>), ApiError> {
    let Json(request) = payload?;
    info!(
        collection_id = %request.collection_id,
        name = %request.name,
        purpose = %request.purpose,
        "Create status list request received"
    );

    let version = state.service.create(request).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// Publish caller-supplied compressed bits as the new head
async fn broadcast_status_list(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BroadcastStatusListRequest>, JsonRejection>,
) -> Result<Json<StatusListResourceVersion>, ApiError> {
    let Json(request) = payload?;
    info!(
        collection_id = %request.collection_id,
        name = %request.name,
        "Broadcast status list request received"
    );

    Ok(Json(state.service.broadcast(request).await?))
}

/// Check one index
async fn check_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckStatusRequest>, JsonRejection>,
) -> Result<Json<CheckStatusResult>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.service.check(request).await?))
}

/// Apply an action to a batch of indices
///
/// # Request Body
/// ```json
/// {
///   "collectionId": "did:cheqd:testnet:...",
///   "name": "employees",
///   "indices": [42, 100],
///   "action": "suspend",
///   "publish": true
/// }
/// ```
async fn update_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<UpdateStatusResult>, ApiError> {
    let Json(request) = payload?;
    info!(
        collection_id = %request.collection_id,
        name = %request.name,
        action = %request.action,
        indices = request.indices.len(),
        publish = request.publish,
        "Update status request received"
    );

    Ok(Json(state.service.update(request).await?))
}

/// List head versions of a collection
async fn search_status_lists(
    State(state): State<Arc<AppState>>,
    Query(request): Query<SearchStatusListRequest>,
) -> Result<Json<Vec<StatusListSummary>>, ApiError> {
    Ok(Json(state.service.search(request).await?))
}

/// Tagged-union endpoint
async fn dispatch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.service.handle(request).await?))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StatusError> for ApiError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::InvalidLength { .. }
            | StatusError::IndexOutOfRange { .. }
            | StatusError::UnsupportedAction { .. }
            | StatusError::InvalidKey(_)
            | StatusError::InvalidRequest(_)
            | StatusError::AlreadyExists { .. }
            | StatusError::DecryptionError(_)
            | StatusError::DecodingError(_)
            | StatusError::EncodingError(_) => ApiError::BadRequest(err.to_string()),

            StatusError::NotFound { .. } => ApiError::NotFound(err.to_string()),

            StatusError::AmbiguousHead { .. }
            | StatusError::HeadConflict { .. }
            | StatusError::PartialPublish { .. } => {
                warn!(error = %err, "Status list chain conflict");
                ApiError::Conflict(err.to_string())
            }

            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
