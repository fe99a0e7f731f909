use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::hashchain::ChainEntry;
use crate::domain::{AccountState, ApprovalStatus, MembershipStatus, RecoveryStatus, Role, VoteKind};

pub mod migrator;
pub mod repositories;

pub use repositories::approval::{Approval, Vote, VoteUpsert};
pub use repositories::membership::Membership;
pub use repositories::recovery::Intent;
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn membership_repo(&self) -> repositories::membership::MembershipRepository {
        repositories::membership::MembershipRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn approval_repo(&self) -> repositories::approval::ApprovalRepository {
        repositories::approval::ApprovalRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn recovery_repo(&self) -> repositories::recovery::RecoveryRepository {
        repositories::recovery::RecoveryRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn audit_repo(&self) -> repositories::audit::AuditRepository {
        repositories::audit::AuditRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Result<User> {
        self.user_repo().create(username, password).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn set_user_password(
        &self,
        user_id: i32,
        new_password: &str,
        config: Option<&crate::config::SecurityConfig>,
    ) -> Result<()> {
        self.user_repo()
            .set_password(user_id, new_password, config)
            .await
    }

    pub async fn bump_token_version(&self, user_id: i32) -> Result<i64> {
        self.user_repo().bump_token_version(user_id).await
    }

    pub async fn set_user_state(&self, user_id: i32, state: AccountState) -> Result<()> {
        self.user_repo().set_state(user_id, state).await
    }

    pub async fn set_user_state_if(
        &self,
        user_id: i32,
        from: AccountState,
        to: AccountState,
    ) -> Result<bool> {
        self.user_repo().set_state_if(user_id, from, to).await
    }

    pub async fn require_password_change(&self, user_id: i32) -> Result<()> {
        self.user_repo().require_password_change(user_id).await
    }

    // ========== Projects & memberships ==========

    pub async fn create_project(&self, name: &str) -> Result<crate::entities::projects::Model> {
        self.membership_repo().create_project(name).await
    }

    pub async fn get_project(&self, id: i32) -> Result<Option<crate::entities::projects::Model>> {
        self.membership_repo().get_project(id).await
    }

    pub async fn add_project_member(
        &self,
        project_id: i32,
        user_id: i32,
        role: Role,
    ) -> Result<Membership> {
        self.membership_repo()
            .add_member(project_id, user_id, role)
            .await
    }

    pub async fn get_membership(&self, project_id: i32, user_id: i32) -> Result<Option<Membership>> {
        self.membership_repo().get(project_id, user_id).await
    }

    pub async fn memberships_for_user(&self, user_id: i32) -> Result<Vec<Membership>> {
        self.membership_repo().for_user(user_id).await
    }

    pub async fn role_of(&self, project_id: i32, user_id: i32) -> Result<Option<Role>> {
        self.membership_repo().role_of(project_id, user_id).await
    }

    pub async fn member_count(&self, project_id: i32) -> Result<u64> {
        self.membership_repo().member_count(project_id).await
    }

    pub async fn active_voter_count(&self, project_id: i32, affected_user: i32) -> Result<u64> {
        self.membership_repo()
            .active_voter_count(project_id, affected_user)
            .await
    }

    pub async fn set_membership_status(
        &self,
        project_id: i32,
        user_id: i32,
        status: MembershipStatus,
    ) -> Result<()> {
        self.membership_repo()
            .set_status(project_id, user_id, status)
            .await
    }

    pub async fn set_memberships_for_user(
        &self,
        user_id: i32,
        status: MembershipStatus,
    ) -> Result<u64> {
        self.membership_repo()
            .set_status_for_user(user_id, status)
            .await
    }

    pub async fn pending_members_for_admin(&self, admin_id: i32) -> Result<Vec<Membership>> {
        self.membership_repo()
            .pending_members_for_admin(admin_id)
            .await
    }

    pub async fn administered_project_ids(&self, user_id: i32) -> Result<Vec<i32>> {
        self.membership_repo()
            .administered_project_ids(user_id)
            .await
    }

    pub async fn active_project_ids(&self, user_id: i32) -> Result<Vec<i32>> {
        self.membership_repo().active_project_ids(user_id).await
    }

    pub async fn voter_pool(&self, project_ids: &[i32], affected_user: i32) -> Result<Vec<i32>> {
        self.membership_repo()
            .voter_pool(project_ids, affected_user)
            .await
    }

    // ========== Approvals ==========

    pub async fn open_approval(
        &self,
        user_id: i32,
        project_id: i32,
        event_type: &str,
    ) -> Result<(Approval, bool)> {
        self.approval_repo()
            .open(user_id, project_id, event_type)
            .await
    }

    pub async fn get_approval(&self, id: i32) -> Result<Option<Approval>> {
        self.approval_repo().get(id).await
    }

    pub async fn pending_approvals_for_user(&self, user_id: i32) -> Result<Vec<Approval>> {
        self.approval_repo().pending_for_user(user_id).await
    }

    pub async fn pending_approvals_in_projects(
        &self,
        project_ids: &[i32],
        exclude_user: i32,
    ) -> Result<Vec<Approval>> {
        self.approval_repo()
            .pending_in_projects(project_ids, exclude_user)
            .await
    }

    pub async fn upsert_approval_vote(
        &self,
        approval_id: i32,
        voter_id: i32,
        vote: VoteKind,
        reason: Option<&str>,
    ) -> Result<VoteUpsert> {
        self.approval_repo()
            .upsert_vote(approval_id, voter_id, vote, reason)
            .await
    }

    pub async fn approval_approve_count(&self, approval_id: i32) -> Result<u64> {
        self.approval_repo().approve_count(approval_id).await
    }

    pub async fn approval_votes(&self, approval_id: i32) -> Result<Vec<Vote>> {
        self.approval_repo().votes_for(approval_id).await
    }

    pub async fn resolve_approval_if_pending(
        &self,
        approval_id: i32,
        to: ApprovalStatus,
    ) -> Result<bool> {
        self.approval_repo()
            .resolve_if_pending(approval_id, to)
            .await
    }

    pub async fn resolve_all_pending_for_user(
        &self,
        user_id: i32,
        to: ApprovalStatus,
    ) -> Result<Vec<i32>> {
        self.approval_repo()
            .resolve_all_pending_for_user(user_id, to)
            .await
    }

    // ========== Recovery ==========

    pub async fn create_recovery_intent(
        &self,
        username: &str,
        user_id: Option<i32>,
        required_approvals: i32,
        ttl_hours: i64,
    ) -> Result<Intent> {
        self.recovery_repo()
            .create(username, user_id, required_approvals, ttl_hours)
            .await
    }

    pub async fn get_recovery_intent(&self, token: &str) -> Result<Option<Intent>> {
        self.recovery_repo().get_by_token(token).await
    }

    pub async fn upsert_recovery_vote(
        &self,
        intent_id: i32,
        voter_id: i32,
        vote: VoteKind,
        reason: Option<&str>,
    ) -> Result<VoteUpsert> {
        self.recovery_repo()
            .upsert_vote(intent_id, voter_id, vote, reason)
            .await
    }

    pub async fn recovery_approve_count(&self, intent_id: i32) -> Result<u64> {
        self.recovery_repo().approve_count(intent_id).await
    }

    pub async fn set_recovery_approvals_count(&self, intent_id: i32, count: i32) -> Result<()> {
        self.recovery_repo()
            .set_approvals_count(intent_id, count)
            .await
    }

    pub async fn resolve_recovery_if_pending(
        &self,
        intent_id: i32,
        to: RecoveryStatus,
    ) -> Result<bool> {
        self.recovery_repo().resolve_if_pending(intent_id, to).await
    }

    pub async fn consume_recovery_if_approved(&self, intent_id: i32) -> Result<bool> {
        self.recovery_repo().consume_if_approved(intent_id).await
    }

    // ========== Audit ==========

    pub async fn append_audit(&self, correlation_id: &str, payload: String) -> Result<String> {
        self.audit_repo().append(correlation_id, payload).await
    }

    pub async fn audit_chain(&self) -> Result<Vec<ChainEntry>> {
        self.audit_repo().chain().await
    }
}
