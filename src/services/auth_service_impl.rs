//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::domain::{AccountState, UserAccessState};
use crate::services::SecurityEvent;
use crate::services::approval_service::ApprovalService;
use crate::services::audit::AuditTrail;
use crate::services::auth_service::{AuthError, AuthService, Credential, LoginResult};

pub struct SeaOrmAuthService {
    store: Store,
    approvals: Arc<dyn ApprovalService>,
    audit: AuditTrail,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, approvals: Arc<dyn ApprovalService>, security: SecurityConfig) -> Self {
        let audit = AuditTrail::new(store.clone());
        Self {
            store,
            approvals,
            audit,
            security,
        }
    }

    async fn access_state_of(&self, user_id: i32, state: AccountState) -> Result<UserAccessState, AuthError> {
        Ok(match state {
            AccountState::Active => UserAccessState::Active,
            AccountState::Revoked => UserAccessState::Revoked,
            AccountState::PendingApproval => {
                let approvals = self
                    .store
                    .pending_approvals_for_user(user_id)
                    .await?
                    .into_iter()
                    .map(|a| (a.id, a.project_id))
                    .collect();
                UserAccessState::PendingApproval { approvals }
            }
        })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Revoked accounts fail identically for right and wrong
        // passwords; there is nothing to learn from trying.
        if user.state == AccountState::Revoked {
            return Err(AuthError::AccountRevoked);
        }

        let is_valid = self.store.verify_user_password(username, password).await?;

        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let access_state = self.access_state_of(user.id, user.state).await?;

        Ok(LoginResult {
            credential: Credential {
                user_id: user.id,
                username: user.username,
                token_version: user.token_version,
            },
            access_state,
            must_change_password: user.must_change_password,
        })
    }

    async fn validate(&self, credential: &Credential) -> Result<crate::db::User, AuthError> {
        // Always re-read the authoritative version. No cache means no
        // separate invalidation problem: a bumped version fails here on
        // the very next use of any older credential.
        let user = self
            .store
            .get_user_by_id(credential.user_id)
            .await?
            .ok_or(AuthError::TokenInvalidated)?;

        if user.state == AccountState::Revoked {
            return Err(AuthError::AccountRevoked);
        }

        if user.token_version != credential.token_version {
            return Err(AuthError::TokenInvalidated);
        }

        Ok(user)
    }

    async fn access_state(&self, user_id: i32) -> Result<UserAccessState, AuthError> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        self.access_state_of(user.id, user.state).await
    }

    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < 8 {
            return Err(AuthError::Validation(
                "New password must be at least 8 characters".to_string(),
            ));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let is_valid = self
            .store
            .verify_user_password(&user.username, current_password)
            .await?;

        if !is_valid {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.store
            .set_user_password(user_id, new_password, Some(&self.security))
            .await?;

        // Security event: every outstanding session dies on next use and
        // each project membership goes back through approval.
        let correlation_id = AuditTrail::correlation_id();
        let new_version = self.store.bump_token_version(user_id).await?;

        self.audit
            .record(
                &correlation_id,
                "password_changed",
                json!({
                    "user_id": user_id,
                    "token_version": new_version,
                }),
            )
            .await?;

        self.approvals
            .open_for_event(user_id, SecurityEvent::PasswordChange, &correlation_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        info!(user_id, "Password changed; sessions invalidated and approvals reopened");

        Ok(())
    }
}
