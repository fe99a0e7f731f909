use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, IntentDto, MessageResponse};
use crate::db::User;
use crate::domain::VoteKind;

#[derive(Deserialize)]
pub struct InitiateRequest {
    pub username: String,
}

#[derive(Deserialize)]
pub struct RecoveryVoteRequest {
    pub vote: VoteKind,
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// POST /recovery
///
/// Unauthenticated. Unknown usernames get the same response shape as
/// known ones.
pub async fn initiate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InitiateRequest>,
) -> Result<Json<ApiResponse<IntentDto>>, ApiError> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::validation("Username is required"));
    }

    let intent = state.recovery().initiate(payload.username.trim()).await?;

    Ok(Json(ApiResponse::success(IntentDto::from(intent))))
}

/// GET /recovery/{token}
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<IntentDto>>, ApiError> {
    let intent = state.recovery().status(&token).await?;

    Ok(Json(ApiResponse::success(IntentDto::from(intent))))
}

/// POST /recovery/{token}/votes
///
/// Authenticated: only trusted voters (active members sharing a project
/// with the affected user) can resolve a recovery.
pub async fn vote(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(token): Path<String>,
    Json(payload): Json<RecoveryVoteRequest>,
) -> Result<Json<ApiResponse<IntentDto>>, ApiError> {
    let intent = state
        .recovery()
        .vote(&token, user.id, payload.vote, payload.reason.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(IntentDto::from(intent))))
}

/// POST /recovery/{token}/password
///
/// Unauthenticated: the approved token is the proof. One-shot; the
/// token is consumed on success.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .recovery()
        .reset_password(&token, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password reset; account re-enters approval".to_string(),
    })))
}
