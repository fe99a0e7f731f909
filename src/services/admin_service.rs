//! Privileged admin override: idempotent operations independent of
//! quorum, exposed through the CLI.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::AccountState;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AdminError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// One roster line for `list-users`.
#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    pub user: User,
    pub memberships: usize,
    pub active_memberships: usize,
}

/// Result of `reset-password`: the generated temporary password plus the
/// state transition the CLI renders.
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    pub temp_password: String,
    pub previous_state: AccountState,
    pub token_version_before: i64,
    pub token_version_after: i64,
    pub memberships_affected: u64,
    pub approvals_opened: usize,
}

#[derive(Debug, Clone)]
pub struct ApproveOutcome {
    pub previous_state: AccountState,
    pub memberships_affected: u64,
    pub approvals_resolved: usize,
}

#[derive(Debug, Clone)]
pub struct RevokeOutcome {
    pub previous_state: AccountState,
    pub token_version_before: i64,
    pub token_version_after: i64,
}

#[async_trait::async_trait]
pub trait AdminService: Send + Sync {
    async fn list_users(&self) -> Result<Vec<UserOverview>, AdminError>;

    /// Admin-initiated reset: temp password, token bump, account and all
    /// memberships to pending, one approval per project.
    async fn reset_password(&self, username: &str) -> Result<ResetOutcome, AdminError>;

    /// Bypass quorum entirely: account active, all memberships active,
    /// all open approvals resolved approved.
    async fn approve(&self, username: &str) -> Result<ApproveOutcome, AdminError>;

    /// Terminal until a later reset/approve cycle; logins fail with a
    /// distinct error regardless of password correctness.
    async fn revoke(&self, username: &str) -> Result<RevokeOutcome, AdminError>;
}
