//! Pre-authentication account recovery: a user who cannot log in asks
//! trusted voters to vouch for them, then resets their password with the
//! approved one-time token.

use thiserror::Error;

use crate::db::Intent;
use crate::domain::VoteKind;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Recovery intent not found")]
    NotFound,

    #[error("Recovery intent has expired")]
    Expired,

    #[error("Recovery intent was rejected")]
    Rejected,

    #[error("Recovery intent is not approved")]
    NotApproved,

    #[error("Recovery intent is no longer pending")]
    NotPending,

    #[error("Voter is not eligible to vote on this recovery")]
    NotEligibleVoter,

    #[error("Voter has already voted on this recovery")]
    AlreadyVoted,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RecoveryError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Expired => "RECOVERY_EXPIRED",
            Self::Rejected => "RECOVERY_REJECTED",
            Self::NotApproved => "RECOVERY_NOT_APPROVED",
            Self::NotPending => "APPROVAL_NOT_PENDING",
            Self::NotEligibleVoter => "NOT_ELIGIBLE_VOTER",
            Self::AlreadyVoted => "ALREADY_VOTED",
            Self::Validation(_) => "VALIDATION",
            Self::Database(_) | Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<sea_orm::DbErr> for RecoveryError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RecoveryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait RecoveryService: Send + Sync {
    /// Opens a recovery intent for a username. Unknown usernames still
    /// get a plausible pending intent (no enumeration signal), but one
    /// with no eligible voters, so it can never resolve.
    async fn initiate(&self, username: &str) -> Result<Intent, RecoveryError>;

    /// Current intent state; evaluates expiry lazily on read.
    async fn status(&self, token: &str) -> Result<Intent, RecoveryError>;

    /// Casts (or replaces) a trusted voter's vote and recomputes
    /// resolution. Mirrors the in-project rules: admins of the user's
    /// projects resolve instantly, regular members count toward quorum.
    async fn vote(
        &self,
        token: &str,
        voter_id: i32,
        vote: VoteKind,
        reason: Option<&str>,
    ) -> Result<Intent, RecoveryError>;

    /// Consumes an approved token to set a new password. Bumps the token
    /// version and re-enters the security-event path exactly like an
    /// authenticated password change.
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), RecoveryError>;
}
