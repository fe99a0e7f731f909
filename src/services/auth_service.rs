//! Domain service for authentication and the token version guard.
//!
//! Handles login, per-request credential validation, and authenticated
//! password changes (a security event).

use serde::Serialize;
use thiserror::Error;

use crate::domain::UserAccessState;

/// Errors specific to authentication operations. Authentication errors
/// are terminal for the request; the caller must re-authenticate or wait
/// for approval.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is pending approval")]
    AccountPending,

    #[error("Account has been revoked")]
    AccountRevoked,

    #[error("Session credential has been invalidated")]
    TokenInvalidated,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code for the API/CLI boundary.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials | Self::UserNotFound => "INVALID_CREDENTIALS",
            Self::AccountPending => "ACCOUNT_PENDING",
            Self::AccountRevoked => "ACCOUNT_REVOKED",
            Self::TokenInvalidated => "TOKEN_INVALIDATED",
            Self::Validation(_) => "VALIDATION",
            Self::Database(_) | Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Session credential: user identity plus the token version embedded at
/// issue time. Validation always re-reads the authoritative version, so
/// a bump invalidates every outstanding credential on its next use.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct Credential {
    pub user_id: i32,
    pub username: String,
    pub token_version: i64,
}

/// Login result: the issued credential plus the access-state union the
/// boundary layer renders (active, pending with its approvals, revoked).
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub credential: Credential,
    pub access_state: UserAccessState,
    pub must_change_password: bool,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues a session credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for a bad username or
    /// password, [`AuthError::AccountRevoked`] for a revoked account
    /// regardless of password correctness. A pending account logs in
    /// successfully and reports its state via `access_state`.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Token version guard: validates a previously issued credential
    /// against the stored `token_version`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenInvalidated`] on a version mismatch and
    /// [`AuthError::AccountRevoked`] for revoked accounts.
    async fn validate(&self, credential: &Credential) -> Result<crate::db::User, AuthError>;

    /// The current access state of a user, for `/auth/me`.
    async fn access_state(&self, user_id: i32) -> Result<UserAccessState, AuthError>;

    /// Changes a user's password. This is a security event: it bumps the
    /// token version and re-opens one approval per project membership.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the current password is
    /// incorrect or the new password is invalid.
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
