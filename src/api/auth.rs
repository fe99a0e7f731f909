use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MeDto, MessageResponse, UserDto};
use crate::db::User;
use crate::domain::{AccountState, UserAccessState};
use crate::services::{AuthError, Credential, LoginResult};

const SESSION_CREDENTIAL_KEY: &str = "credential";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Session middleware: resolve the stored credential against the current
/// `token_version` and account state on every request. A mismatch kills
/// the session immediately, so password changes and revocations take
/// effect on the next request, not the next login.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let credential = match session.get::<Credential>(SESSION_CREDENTIAL_KEY).await {
        Ok(Some(credential)) => credential,
        Ok(None) => {
            return Err(ApiError::unauthorized("UNAUTHORIZED", "Not authenticated"));
        }
        Err(e) => return Err(ApiError::internal(format!("Session error: {e}"))),
    };

    match state.auth().validate(&credential).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Err(err @ (AuthError::TokenInvalidated | AuthError::AccountRevoked)) => {
            let _ = session.flush().await;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Second tier for routes that demand a fully active account. Pending
/// and revoked accounts keep a usable session for the approval screens
/// but are rejected here.
pub async fn require_active_middleware(
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let user = request
        .extensions()
        .get::<User>()
        .ok_or_else(|| ApiError::unauthorized("UNAUTHORIZED", "Not authenticated"))?;

    match user.state {
        AccountState::Active => Ok(next.run(request).await),
        AccountState::PendingApproval => Err(ApiError::forbidden(
            "ACCOUNT_PENDING",
            "Account is pending approval",
        )),
        AccountState::Revoked => {
            Err(ApiError::forbidden("ACCOUNT_REVOKED", "Account is revoked"))
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let result = state
        .auth()
        .login(&payload.username, &payload.password)
        .await?;

    session
        .insert(SESSION_CREDENTIAL_KEY, &result.credential)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<User>,
) -> Result<Json<ApiResponse<MeDto>>, ApiError> {
    let access_state: UserAccessState = state.auth().access_state(user.id).await?;

    Ok(Json(ApiResponse::success(MeDto {
        user: UserDto::from(user),
        access_state,
    })))
}

/// PUT /auth/password
///
/// A successful change bumps the token version, so the caller's own
/// session dies too; the client must log in again.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    axum::Extension(user): axum::Extension<User>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth()
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await?;

    let _ = session.flush().await;

    tracing::info!("Password changed for user: {}", user.username);

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated; all sessions invalidated".to_string(),
    })))
}
