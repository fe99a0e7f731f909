//! `SeaORM` implementation of the `ApprovalService` trait.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::db::{Approval, Membership, Store, VoteUpsert};
use crate::domain::quorum::{QuorumMode, quorum_mode};
use crate::domain::{AccountState, ApprovalStatus, MembershipStatus, VoteKind};
use crate::services::approval_service::{ApprovalError, ApprovalService};
use crate::services::audit::AuditTrail;
use crate::services::SecurityEvent;

pub struct SeaOrmApprovalService {
    store: Store,
    audit: AuditTrail,
}

impl SeaOrmApprovalService {
    #[must_use]
    pub fn new(store: Store) -> Self {
        let audit = AuditTrail::new(store.clone());
        Self { store, audit }
    }

    /// Applies an `approved` resolution's side effects exactly once. The
    /// conditional update on the approval row decides the winner; the
    /// loser of a resolution race sees `false` and must not re-apply.
    async fn finalize_approved(&self, approval: &Approval, correlation_id: &str) -> Result<bool, ApprovalError> {
        let won = self
            .store
            .resolve_approval_if_pending(approval.id, ApprovalStatus::Approved)
            .await?;

        if !won {
            return Ok(false);
        }

        self.store
            .set_membership_status(approval.project_id, approval.user_id, MembershipStatus::Active)
            .await?;

        // First approved project re-activates the account; the other
        // projects stay individually gated by their membership status.
        self.store
            .set_user_state_if(
                approval.user_id,
                AccountState::PendingApproval,
                AccountState::Active,
            )
            .await?;

        self.audit
            .record(
                correlation_id,
                "approval_resolved",
                json!({
                    "approval_id": approval.id,
                    "project_id": approval.project_id,
                    "user_id": approval.user_id,
                    "resolution": "approved",
                }),
            )
            .await?;

        info!(
            approval_id = approval.id,
            project_id = approval.project_id,
            user_id = approval.user_id,
            "Approval resolved: approved"
        );

        Ok(true)
    }

    async fn finalize_rejected(&self, approval: &Approval, correlation_id: &str) -> Result<bool, ApprovalError> {
        let won = self
            .store
            .resolve_approval_if_pending(approval.id, ApprovalStatus::Rejected)
            .await?;

        if !won {
            return Ok(false);
        }

        // Membership stays pending; the user remains blocked for this
        // project until the admin override intervenes.
        self.audit
            .record(
                correlation_id,
                "approval_resolved",
                json!({
                    "approval_id": approval.id,
                    "project_id": approval.project_id,
                    "user_id": approval.user_id,
                    "resolution": "rejected",
                }),
            )
            .await?;

        warn!(
            approval_id = approval.id,
            project_id = approval.project_id,
            user_id = approval.user_id,
            "Approval resolved: rejected by project admin"
        );

        Ok(true)
    }
}

#[async_trait]
impl ApprovalService for SeaOrmApprovalService {
    async fn open_for_event(
        &self,
        user_id: i32,
        event: SecurityEvent,
        correlation_id: &str,
    ) -> Result<Vec<Approval>, ApprovalError> {
        let memberships = self.store.memberships_for_user(user_id).await?;

        // No memberships means no gating projects: the event still bumps
        // the token version upstream, but there is nothing to approve and
        // suspending the account would strand it (the bootstrap admin).
        if memberships.is_empty() {
            info!(user_id, event = event.as_str(), "Security event with no memberships; nothing to approve");
            return Ok(Vec::new());
        }

        self.store
            .set_user_state(user_id, AccountState::PendingApproval)
            .await?;

        let mut approvals = Vec::with_capacity(memberships.len());

        for membership in &memberships {
            self.store
                .set_membership_status(membership.project_id, user_id, MembershipStatus::Pending)
                .await?;

            let (approval, created) = self
                .store
                .open_approval(user_id, membership.project_id, event.as_str())
                .await?;

            if created {
                self.audit
                    .record(
                        correlation_id,
                        "approval_opened",
                        json!({
                            "approval_id": approval.id,
                            "project_id": membership.project_id,
                            "user_id": user_id,
                            "event_type": event.as_str(),
                        }),
                    )
                    .await?;
            }

            approvals.push(approval);
        }

        info!(
            user_id,
            event = event.as_str(),
            count = approvals.len(),
            "Opened per-project approvals for security event"
        );

        Ok(approvals)
    }

    async fn cast_vote(
        &self,
        approval_id: i32,
        voter_id: i32,
        vote: VoteKind,
        reason: Option<&str>,
    ) -> Result<Approval, ApprovalError> {
        let approval = self
            .store
            .get_approval(approval_id)
            .await?
            .ok_or(ApprovalError::NotFound)?;

        if approval.status != ApprovalStatus::Pending {
            return Err(ApprovalError::ApprovalNotPending);
        }

        let total_members = self.store.member_count(approval.project_id).await?;

        if voter_id == approval.user_id {
            // The sole member of a solo project gets the dedicated error:
            // there is no in-project path at all, only the admin override.
            if total_members <= 1 {
                return Err(ApprovalError::SoloProjectNoSelfApprove);
            }
            return Err(ApprovalError::NotEligibleVoter);
        }

        // Fresh lookup per request; stale cached roles would let demoted
        // admins keep their instant-resolve power.
        let membership = self
            .store
            .get_membership(approval.project_id, voter_id)
            .await?;

        let Some(membership) = membership else {
            return Err(ApprovalError::NotEligibleVoter);
        };

        if membership.status != MembershipStatus::Active {
            return Err(ApprovalError::NotEligibleVoter);
        }

        let correlation_id = AuditTrail::correlation_id();

        match self
            .store
            .upsert_approval_vote(approval_id, voter_id, vote, reason)
            .await?
        {
            VoteUpsert::LostRace => return Err(ApprovalError::AlreadyVoted),
            VoteUpsert::Inserted | VoteUpsert::Replaced => {}
        }

        self.audit
            .record(
                &correlation_id,
                "vote_cast",
                json!({
                    "approval_id": approval_id,
                    "voter_id": voter_id,
                    "vote": vote.as_str(),
                }),
            )
            .await?;

        // Resolution. Admin votes resolve instantly in either direction;
        // regular-member rejects never auto-resolve, they only withhold
        // that member's approve contribution.
        if membership.role.is_admin() {
            match vote {
                VoteKind::Approve => {
                    self.finalize_approved(&approval, &correlation_id).await?;
                }
                VoteKind::Reject => {
                    self.finalize_rejected(&approval, &correlation_id).await?;
                }
            }
        } else if vote == VoteKind::Approve {
            let active_voters = self
                .store
                .active_voter_count(approval.project_id, approval.user_id)
                .await?;

            #[allow(clippy::cast_possible_truncation)]
            let mode = quorum_mode(total_members as u32, active_voters as u32);

            if let QuorumMode::Quorum(required) = mode {
                let approvals = self.store.approval_approve_count(approval_id).await?;
                if approvals >= u64::from(required) {
                    self.finalize_approved(&approval, &correlation_id).await?;
                }
            }
        }

        self.store
            .get_approval(approval_id)
            .await?
            .ok_or(ApprovalError::NotFound)
    }

    async fn my_pending(&self, user_id: i32) -> Result<Vec<Approval>, ApprovalError> {
        Ok(self.store.pending_approvals_for_user(user_id).await?)
    }

    async fn actionable(&self, voter_id: i32) -> Result<Vec<Approval>, ApprovalError> {
        let project_ids = self.store.active_project_ids(voter_id).await?;
        Ok(self
            .store
            .pending_approvals_in_projects(&project_ids, voter_id)
            .await?)
    }

    async fn pending_members(&self, admin_id: i32) -> Result<Vec<Membership>, ApprovalError> {
        Ok(self.store.pending_members_for_admin(admin_id).await?)
    }
}
