use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{AdminError, ApprovalError, AuthError, RecoveryError};

/// Boundary error: an HTTP status, a machine-readable code for clients,
/// and a human-readable message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION", msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }

    pub fn unauthorized(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, msg)
    }

    pub fn forbidden(code: &'static str, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, code, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self.message);
            "An internal error occurred".to_string()
        } else {
            self.message
        };

        let body = ApiResponse::<()>::error(self.code, message);
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::InvalidCredentials | AuthError::UserNotFound | AuthError::TokenInvalidated => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::AccountPending | AuthError::AccountRevoked => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Database(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<ApprovalError> for ApiError {
    fn from(err: ApprovalError) -> Self {
        let status = match &err {
            ApprovalError::NotFound => StatusCode::NOT_FOUND,
            ApprovalError::NotEligibleVoter => StatusCode::FORBIDDEN,
            ApprovalError::ApprovalNotPending
            | ApprovalError::AlreadyVoted
            | ApprovalError::SoloProjectNoSelfApprove => StatusCode::CONFLICT,
            ApprovalError::Database(_) | ApprovalError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<RecoveryError> for ApiError {
    fn from(err: RecoveryError) -> Self {
        let status = match &err {
            RecoveryError::NotFound => StatusCode::NOT_FOUND,
            RecoveryError::Expired => StatusCode::GONE,
            RecoveryError::Rejected | RecoveryError::NotApproved | RecoveryError::NotPending => {
                StatusCode::CONFLICT
            }
            RecoveryError::NotEligibleVoter => StatusCode::FORBIDDEN,
            RecoveryError::AlreadyVoted => StatusCode::CONFLICT,
            RecoveryError::Validation(_) => StatusCode::BAD_REQUEST,
            RecoveryError::Database(_) | RecoveryError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match &err {
            AdminError::UserNotFound(_) => Self::not_found(err.to_string()),
            AdminError::Database(_) | AdminError::Internal(_) => Self::internal(err.to_string()),
        }
    }
}
