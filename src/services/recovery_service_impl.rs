//! `SeaORM` implementation of the `RecoveryService` trait.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::config::{RecoveryConfig, SecurityConfig};
use crate::db::{Intent, Store, VoteUpsert};
use crate::domain::quorum::required_votes;
use crate::domain::{RecoveryStatus, Role, VoteKind};
use crate::services::SecurityEvent;
use crate::services::approval_service::ApprovalService;
use crate::services::audit::AuditTrail;
use crate::services::recovery_service::{RecoveryError, RecoveryService};

pub struct SeaOrmRecoveryService {
    store: Store,
    approvals: Arc<dyn ApprovalService>,
    audit: AuditTrail,
    recovery: RecoveryConfig,
    security: SecurityConfig,
}

impl SeaOrmRecoveryService {
    #[must_use]
    pub fn new(
        store: Store,
        approvals: Arc<dyn ApprovalService>,
        recovery: RecoveryConfig,
        security: SecurityConfig,
    ) -> Self {
        let audit = AuditTrail::new(store.clone());
        Self {
            store,
            approvals,
            audit,
            recovery,
            security,
        }
    }

    /// The intent's trusted voter pool: distinct active members across
    /// the affected user's projects, minus the user.
    async fn voter_pool(&self, user_id: i32) -> Result<Vec<i32>, RecoveryError> {
        let project_ids: Vec<i32> = self
            .store
            .memberships_for_user(user_id)
            .await?
            .into_iter()
            .map(|m| m.project_id)
            .collect();

        Ok(self.store.voter_pool(&project_ids, user_id).await?)
    }

    /// Whether the voter is an active admin of any project the affected
    /// user belongs to. Looked up fresh per vote, never cached.
    async fn is_trusted_admin(&self, voter_id: i32, user_id: i32) -> Result<bool, RecoveryError> {
        let memberships = self.store.memberships_for_user(user_id).await?;

        for membership in memberships {
            if let Some(role) = self.store.role_of(membership.project_id, voter_id).await?
                && role == Role::Admin
            {
                let voter = self
                    .store
                    .get_membership(membership.project_id, voter_id)
                    .await?;
                if voter.is_some_and(|m| m.status == crate::domain::MembershipStatus::Active) {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

#[async_trait]
impl RecoveryService for SeaOrmRecoveryService {
    async fn initiate(&self, username: &str) -> Result<Intent, RecoveryError> {
        let user = self.store.get_user_by_username(username).await?;

        let intent = if let Some(user) = user {
            let pool = self.voter_pool(user.id).await?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let required = required_votes(pool.len() as u32).max(1) as i32;

            self.store
                .create_recovery_intent(
                    username,
                    Some(user.id),
                    required,
                    self.recovery.ttl_hours,
                )
                .await?
        } else {
            // Indistinguishable from the real thing on the outside, but
            // with no user attached there is no voter pool, so every
            // vote fails eligibility and the intent can never resolve.
            self.store
                .create_recovery_intent(username, None, 1, self.recovery.ttl_hours)
                .await?
        };

        self.audit
            .record(
                &AuditTrail::correlation_id(),
                "recovery_initiated",
                json!({
                    "intent_id": intent.id,
                    "username": username,
                    "required_approvals": intent.required_approvals,
                }),
            )
            .await?;

        info!(intent_id = intent.id, "Recovery intent opened");

        Ok(intent)
    }

    async fn status(&self, token: &str) -> Result<Intent, RecoveryError> {
        self.store
            .get_recovery_intent(token)
            .await?
            .ok_or(RecoveryError::NotFound)
    }

    async fn vote(
        &self,
        token: &str,
        voter_id: i32,
        vote: VoteKind,
        reason: Option<&str>,
    ) -> Result<Intent, RecoveryError> {
        let intent = self.status(token).await?;

        match intent.status {
            RecoveryStatus::Pending => {}
            RecoveryStatus::Expired => return Err(RecoveryError::Expired),
            RecoveryStatus::Rejected => return Err(RecoveryError::Rejected),
            RecoveryStatus::Approved | RecoveryStatus::Done => {
                return Err(RecoveryError::NotPending);
            }
        }

        let Some(user_id) = intent.user_id else {
            return Err(RecoveryError::NotEligibleVoter);
        };

        let pool = self.voter_pool(user_id).await?;
        if !pool.contains(&voter_id) {
            return Err(RecoveryError::NotEligibleVoter);
        }

        let correlation_id = AuditTrail::correlation_id();

        match self
            .store
            .upsert_recovery_vote(intent.id, voter_id, vote, reason)
            .await?
        {
            VoteUpsert::LostRace => return Err(RecoveryError::AlreadyVoted),
            VoteUpsert::Inserted | VoteUpsert::Replaced => {}
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let approvals = self.store.recovery_approve_count(intent.id).await? as i32;
        self.store
            .set_recovery_approvals_count(intent.id, approvals)
            .await?;

        self.audit
            .record(
                &correlation_id,
                "recovery_vote_cast",
                json!({
                    "intent_id": intent.id,
                    "voter_id": voter_id,
                    "vote": vote.as_str(),
                }),
            )
            .await?;

        // Resolution mirrors the approval engine: trusted admins resolve
        // instantly in either direction, regular members count toward
        // the approve quorum and their rejects never auto-resolve.
        let resolution = if self.is_trusted_admin(voter_id, user_id).await? {
            match vote {
                VoteKind::Approve => Some(RecoveryStatus::Approved),
                VoteKind::Reject => Some(RecoveryStatus::Rejected),
            }
        } else if vote == VoteKind::Approve && approvals >= intent.required_approvals {
            Some(RecoveryStatus::Approved)
        } else {
            None
        };

        if let Some(to) = resolution
            && self.store.resolve_recovery_if_pending(intent.id, to).await?
        {
            self.audit
                .record(
                    &correlation_id,
                    "recovery_resolved",
                    json!({
                        "intent_id": intent.id,
                        "resolution": to.as_str(),
                    }),
                )
                .await?;

            info!(intent_id = intent.id, resolution = to.as_str(), "Recovery resolved");
        }

        self.status(token).await
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), RecoveryError> {
        if new_password.len() < 8 {
            return Err(RecoveryError::Validation(
                "New password must be at least 8 characters".to_string(),
            ));
        }

        let intent = self.status(token).await?;

        match intent.status {
            RecoveryStatus::Approved => {}
            RecoveryStatus::Expired => return Err(RecoveryError::Expired),
            RecoveryStatus::Rejected => return Err(RecoveryError::Rejected),
            RecoveryStatus::Pending | RecoveryStatus::Done => {
                return Err(RecoveryError::NotApproved);
            }
        }

        // An approved intent can still outlive its deadline; approval is
        // not a license to sit on the token.
        if intent.is_expired_at(&chrono::Utc::now()) {
            return Err(RecoveryError::Expired);
        }

        let user_id = intent.user_id.ok_or(RecoveryError::NotApproved)?;

        // One-time consumption; a concurrent second reset loses here.
        if !self.store.consume_recovery_if_approved(intent.id).await? {
            return Err(RecoveryError::NotApproved);
        }

        self.store
            .set_user_password(user_id, new_password, Some(&self.security))
            .await?;

        let correlation_id = AuditTrail::correlation_id();
        let new_version = self.store.bump_token_version(user_id).await?;

        self.audit
            .record(
                &correlation_id,
                "recovery_password_reset",
                json!({
                    "intent_id": intent.id,
                    "user_id": user_id,
                    "token_version": new_version,
                }),
            )
            .await?;

        // Same security-event path as an authenticated password change.
        self.approvals
            .open_for_event(user_id, SecurityEvent::Recovery, &correlation_id)
            .await
            .map_err(|e| RecoveryError::Internal(e.to_string()))?;

        info!(intent_id = intent.id, user_id, "Recovery token consumed; password reset");

        Ok(())
    }
}
