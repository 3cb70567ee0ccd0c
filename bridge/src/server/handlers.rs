//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::BridgeError;
use crate::server::state::ServerState;
use crate::sync::webhook::WebhookPayload;
use crate::utils::version_info;

/// Error body returned by every failing handler
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

/// Handler error wrapper
pub struct ApiError(BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::ValidationError(_) | BridgeError::JsonError(_) => StatusCode::BAD_REQUEST,
            BridgeError::AuthRefreshFailed(_) | BridgeError::AuthError(_) => StatusCode::UNAUTHORIZED,
            BridgeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            BridgeError::Api { .. } | BridgeError::HttpError(_) | BridgeError::UnexpectedResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let code = match &self.0 {
            BridgeError::Api { code, .. } => Some(*code),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub last_synced_at: Option<String>,
    pub err_streak: u32,
    pub last_error: Option<String>,
}

/// Health check handler
pub async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let sync = state.syncer.get_state().await;
    let status = if sync.err_streak == 0 { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        service: "lockbridge".to_string(),
        version: version_info().version,
        last_synced_at: sync.last_synced_at.map(|t| t.to_rfc3339()),
        err_streak: sync.err_streak,
        last_error: sync.last_error,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Lock list handler
pub async fn locks_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.syncer.views().await)
}

/// Single lock handler
pub async fn lock_handler(
    State(state): State<Arc<ServerState>>,
    Path(lock_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .syncer
        .view(lock_id)
        .await
        .ok_or_else(|| BridgeError::NotFound(format!("lock {}", lock_id)))?;
    Ok(Json(view))
}

/// Command response
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
}

/// Lock command handler
pub async fn lock_command_handler(
    State(state): State<Arc<ServerState>>,
    Path(lock_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.syncer.lock(lock_id).await?;
    Ok(Json(CommandResponse {
        success: true,
        message: format!("Lock {} locked", lock_id),
    }))
}

/// Unlock command handler
pub async fn unlock_command_handler(
    State(state): State<Arc<ServerState>>,
    Path(lock_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.syncer.unlock(lock_id).await?;
    Ok(Json(CommandResponse {
        success: true,
        message: format!("Lock {} unlocked", lock_id),
    }))
}

/// Sync handler
pub async fn sync_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match state.syncer.trigger_sync().await {
        Ok(_) => Json(CommandResponse {
            success: true,
            message: "Sync completed successfully".to_string(),
        }),
        Err(e) => Json(CommandResponse {
            success: false,
            message: format!("Sync failed: {}", e),
        }),
    }
}

/// Vendor webhook handler
pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    Path(webhook_id): Path<String>,
    body: String,
) -> Result<Response, ApiError> {
    if state.webhook_id.as_deref() != Some(webhook_id.as_str()) {
        warn!("Webhook called with an unknown id");
        return Err(BridgeError::NotFound("webhook".to_string()).into());
    }

    info!("Webhook called");
    let payload = WebhookPayload::from_form(&body)?;
    state.syncer.apply_webhook(&payload).await;

    Ok("success".into_response())
}
