//! The approval engine: opens, tallies and resolves per-project
//! approvals triggered by security events.

use thiserror::Error;

use crate::db::{Approval, Membership};
use crate::domain::VoteKind;
use crate::services::SecurityEvent;

/// Approval/recovery errors are recoverable at the caller's discretion
/// (re-vote, contact an admin) and always carry a structured code.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Approval not found")]
    NotFound,

    #[error("Voter is not an eligible voter for this approval")]
    NotEligibleVoter,

    #[error("Approval is no longer pending")]
    ApprovalNotPending,

    #[error("Voter has already voted on this approval")]
    AlreadyVoted,

    #[error("A solo project member cannot approve their own access")]
    SoloProjectNoSelfApprove,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApprovalError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::NotEligibleVoter => "NOT_ELIGIBLE_VOTER",
            Self::ApprovalNotPending => "APPROVAL_NOT_PENDING",
            Self::AlreadyVoted => "ALREADY_VOTED",
            Self::SoloProjectNoSelfApprove => "SOLO_PROJECT_NO_SELF_APPROVE",
            Self::Database(_) | Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<sea_orm::DbErr> for ApprovalError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ApprovalError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait ApprovalService: Send + Sync {
    /// Applies a security event to a user: account goes pending, every
    /// membership flips to pending, and one approval opens per project
    /// (idempotently). Returns the open approvals.
    async fn open_for_event(
        &self,
        user_id: i32,
        event: SecurityEvent,
        correlation_id: &str,
    ) -> Result<Vec<Approval>, ApprovalError>;

    /// Casts (or replaces) a vote and recomputes resolution.
    ///
    /// # Errors
    ///
    /// [`ApprovalError::NotEligibleVoter`] if the voter is not an active
    /// member of the approval's project or is the affected user;
    /// [`ApprovalError::SoloProjectNoSelfApprove`] when the affected user
    /// is the project's only member; [`ApprovalError::ApprovalNotPending`]
    /// once resolved.
    async fn cast_vote(
        &self,
        approval_id: i32,
        voter_id: i32,
        vote: VoteKind,
        reason: Option<&str>,
    ) -> Result<Approval, ApprovalError>;

    /// Approvals still gating the given user's own access.
    async fn my_pending(&self, user_id: i32) -> Result<Vec<Approval>, ApprovalError>;

    /// Approvals the voter is currently eligible to vote on.
    async fn actionable(&self, voter_id: i32) -> Result<Vec<Approval>, ApprovalError>;

    /// Pending memberships in projects the admin administers.
    async fn pending_members(&self, admin_id: i32) -> Result<Vec<Membership>, ApprovalError>;
}
