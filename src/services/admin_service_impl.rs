//! `SeaORM` implementation of the `AdminService` trait.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::db::repositories::user::generate_temp_password;
use crate::db::{Store, User};
use crate::domain::{AccountState, ApprovalStatus, MembershipStatus};
use crate::services::SecurityEvent;
use crate::services::admin_service::{
    AdminError, AdminService, ApproveOutcome, ResetOutcome, RevokeOutcome, UserOverview,
};
use crate::services::approval_service::ApprovalService;
use crate::services::audit::AuditTrail;

pub struct SeaOrmAdminService {
    store: Store,
    approvals: Arc<dyn ApprovalService>,
    audit: AuditTrail,
}

impl SeaOrmAdminService {
    #[must_use]
    pub fn new(store: Store, approvals: Arc<dyn ApprovalService>) -> Self {
        let audit = AuditTrail::new(store.clone());
        Self {
            store,
            approvals,
            audit,
        }
    }

    async fn must_get(&self, username: &str) -> Result<User, AdminError> {
        self.store
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AdminError::UserNotFound(username.to_string()))
    }
}

#[async_trait]
impl AdminService for SeaOrmAdminService {
    async fn list_users(&self) -> Result<Vec<UserOverview>, AdminError> {
        let users = self.store.list_users().await?;
        let mut overviews = Vec::with_capacity(users.len());

        for user in users {
            let memberships = self.store.memberships_for_user(user.id).await?;
            let active = memberships
                .iter()
                .filter(|m| m.status == MembershipStatus::Active)
                .count();

            overviews.push(UserOverview {
                memberships: memberships.len(),
                active_memberships: active,
                user,
            });
        }

        Ok(overviews)
    }

    async fn reset_password(&self, username: &str) -> Result<ResetOutcome, AdminError> {
        let user = self.must_get(username).await?;
        let correlation_id = AuditTrail::correlation_id();

        let temp_password = generate_temp_password();
        self.store
            .set_user_password(user.id, &temp_password, None)
            .await?;
        self.store.require_password_change(user.id).await?;

        let token_version_after = self.store.bump_token_version(user.id).await?;

        let approvals = self
            .approvals
            .open_for_event(user.id, SecurityEvent::PasswordReset, &correlation_id)
            .await
            .map_err(|e| AdminError::Internal(e.to_string()))?;

        let memberships_affected = self.store.memberships_for_user(user.id).await?.len() as u64;

        self.audit
            .record(
                &correlation_id,
                "admin_password_reset",
                json!({
                    "user_id": user.id,
                    "token_version": token_version_after,
                    "memberships_affected": memberships_affected,
                }),
            )
            .await?;

        info!(user_id = user.id, "Admin reset password for {username}");

        Ok(ResetOutcome {
            temp_password,
            previous_state: user.state,
            token_version_before: user.token_version,
            token_version_after,
            memberships_affected,
            approvals_opened: approvals.len(),
        })
    }

    async fn approve(&self, username: &str) -> Result<ApproveOutcome, AdminError> {
        let user = self.must_get(username).await?;
        let correlation_id = AuditTrail::correlation_id();

        self.store
            .set_user_state(user.id, AccountState::Active)
            .await?;
        let memberships_affected = self
            .store
            .set_memberships_for_user(user.id, MembershipStatus::Active)
            .await?;
        let resolved = self
            .store
            .resolve_all_pending_for_user(user.id, ApprovalStatus::Approved)
            .await?;

        self.audit
            .record(
                &correlation_id,
                "admin_approve",
                json!({
                    "user_id": user.id,
                    "memberships_affected": memberships_affected,
                    "approvals_resolved": resolved.len(),
                }),
            )
            .await?;

        info!(user_id = user.id, "Admin approved {username}, bypassing quorum");

        Ok(ApproveOutcome {
            previous_state: user.state,
            memberships_affected,
            approvals_resolved: resolved.len(),
        })
    }

    async fn revoke(&self, username: &str) -> Result<RevokeOutcome, AdminError> {
        let user = self.must_get(username).await?;
        let correlation_id = AuditTrail::correlation_id();

        self.store
            .set_user_state(user.id, AccountState::Revoked)
            .await?;
        let token_version_after = self.store.bump_token_version(user.id).await?;

        self.audit
            .record(
                &correlation_id,
                "admin_revoke",
                json!({
                    "user_id": user.id,
                    "token_version": token_version_after,
                }),
            )
            .await?;

        info!(user_id = user.id, "Admin revoked {username}");

        Ok(RevokeOutcome {
            previous_state: user.state,
            token_version_before: user.token_version,
            token_version_after,
        })
    }
}
