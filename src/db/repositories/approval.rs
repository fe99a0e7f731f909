use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};

use crate::domain::{ApprovalStatus, VoteKind};
use crate::entities::{approval_votes, project_approvals};

#[derive(Debug, Clone)]
pub struct Approval {
    pub id: i32,
    pub user_id: i32,
    pub project_id: i32,
    pub event_type: String,
    pub status: ApprovalStatus,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl TryFrom<project_approvals::Model> for Approval {
    type Error = anyhow::Error;

    fn try_from(model: project_approvals::Model) -> Result<Self> {
        let status = model
            .status
            .parse::<ApprovalStatus>()
            .map_err(|e| anyhow::anyhow!("Corrupt approval row {}: {e}", model.id))?;

        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            project_id: model.project_id,
            event_type: model.event_type,
            status,
            created_at: model.created_at,
            resolved_at: model.resolved_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Vote {
    pub approval_id: i32,
    pub voter_id: i32,
    pub vote: VoteKind,
    pub reason: Option<String>,
    pub voted_at: String,
}

impl TryFrom<approval_votes::Model> for Vote {
    type Error = anyhow::Error;

    fn try_from(model: approval_votes::Model) -> Result<Self> {
        let vote = model
            .vote
            .parse::<VoteKind>()
            .map_err(|e| anyhow::anyhow!("Corrupt vote row {}: {e}", model.id))?;

        Ok(Self {
            approval_id: model.approval_id,
            voter_id: model.voter_id,
            vote,
            reason: model.reason,
            voted_at: model.voted_at,
        })
    }
}

/// Outcome of a vote upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteUpsert {
    Inserted,
    Replaced,
    /// The unique `(approval_id, voter_id)` index rejected a concurrent
    /// duplicate insert; the earlier vote stands.
    LostRace,
}

pub struct ApprovalRepository {
    conn: DatabaseConnection,
}

impl ApprovalRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Idempotent open: an existing pending approval for this
    /// `(user, project)` is returned unchanged, otherwise a fresh pending
    /// row is inserted. Returns `(approval, created)`.
    pub async fn open(
        &self,
        user_id: i32,
        project_id: i32,
        event_type: &str,
    ) -> Result<(Approval, bool)> {
        let existing = project_approvals::Entity::find()
            .filter(project_approvals::Column::UserId.eq(user_id))
            .filter(project_approvals::Column::ProjectId.eq(project_id))
            .filter(project_approvals::Column::Status.eq(ApprovalStatus::Pending.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query existing approval")?;

        if let Some(row) = existing {
            return Ok((Approval::try_from(row)?, false));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let model = project_approvals::ActiveModel {
            user_id: Set(user_id),
            project_id: Set(project_id),
            event_type: Set(event_type.to_string()),
            status: Set(ApprovalStatus::Pending.as_str().to_string()),
            created_at: Set(now),
            resolved_at: Set(None),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to open approval")?;

        Ok((Approval::try_from(inserted)?, true))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Approval>> {
        let row = project_approvals::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query approval")?;

        row.map(Approval::try_from).transpose()
    }

    pub async fn pending_for_user(&self, user_id: i32) -> Result<Vec<Approval>> {
        let rows = project_approvals::Entity::find()
            .filter(project_approvals::Column::UserId.eq(user_id))
            .filter(project_approvals::Column::Status.eq(ApprovalStatus::Pending.as_str()))
            .order_by_asc(project_approvals::Column::ProjectId)
            .all(&self.conn)
            .await
            .context("Failed to list pending approvals")?;

        rows.into_iter().map(Approval::try_from).collect()
    }

    /// Pending approvals in any of the given projects, excluding the
    /// voter's own (no self-approval).
    pub async fn pending_in_projects(
        &self,
        project_ids: &[i32],
        exclude_user: i32,
    ) -> Result<Vec<Approval>> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = project_approvals::Entity::find()
            .filter(project_approvals::Column::ProjectId.is_in(project_ids.to_vec()))
            .filter(project_approvals::Column::Status.eq(ApprovalStatus::Pending.as_str()))
            .filter(project_approvals::Column::UserId.ne(exclude_user))
            .order_by_asc(project_approvals::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list actionable approvals")?;

        rows.into_iter().map(Approval::try_from).collect()
    }

    /// Upsert the voter's row. A re-vote replaces the previous vote; a
    /// concurrent duplicate insert loses to the unique index instead of
    /// silently overwriting.
    pub async fn upsert_vote(
        &self,
        approval_id: i32,
        voter_id: i32,
        vote: VoteKind,
        reason: Option<&str>,
    ) -> Result<VoteUpsert> {
        let now = chrono::Utc::now().to_rfc3339();

        let existing = approval_votes::Entity::find()
            .filter(approval_votes::Column::ApprovalId.eq(approval_id))
            .filter(approval_votes::Column::VoterId.eq(voter_id))
            .one(&self.conn)
            .await
            .context("Failed to query existing vote")?;

        if let Some(row) = existing {
            let mut active: approval_votes::ActiveModel = row.into();
            active.vote = Set(vote.as_str().to_string());
            active.reason = Set(reason.map(str::to_string));
            active.voted_at = Set(now);
            active.update(&self.conn).await?;
            return Ok(VoteUpsert::Replaced);
        }

        let model = approval_votes::ActiveModel {
            approval_id: Set(approval_id),
            voter_id: Set(voter_id),
            vote: Set(vote.as_str().to_string()),
            reason: Set(reason.map(str::to_string)),
            voted_at: Set(now),
            ..Default::default()
        };

        match model.insert(&self.conn).await {
            Ok(_) => Ok(VoteUpsert::Inserted),
            Err(err) => {
                if matches!(err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
                    Ok(VoteUpsert::LostRace)
                } else {
                    Err(err).context("Failed to insert vote")
                }
            }
        }
    }

    /// Distinct approving voters. The unique index guarantees one row per
    /// voter, so a plain count is already distinct.
    pub async fn approve_count(&self, approval_id: i32) -> Result<u64> {
        approval_votes::Entity::find()
            .filter(approval_votes::Column::ApprovalId.eq(approval_id))
            .filter(approval_votes::Column::Vote.eq(VoteKind::Approve.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to count approving votes")
    }

    pub async fn votes_for(&self, approval_id: i32) -> Result<Vec<Vote>> {
        let rows = approval_votes::Entity::find()
            .filter(approval_votes::Column::ApprovalId.eq(approval_id))
            .order_by_asc(approval_votes::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list votes")?;

        rows.into_iter().map(Vote::try_from).collect()
    }

    /// Exactly-once resolution: a conditional update guarded on
    /// `status = 'pending'`. Two racers that both observe a crossed
    /// threshold serialize here; the loser sees zero rows affected and
    /// must not re-apply resolution side effects.
    pub async fn resolve_if_pending(&self, approval_id: i32, to: ApprovalStatus) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = project_approvals::Entity::update_many()
            .col_expr(project_approvals::Column::Status, Expr::value(to.as_str()))
            .col_expr(project_approvals::Column::ResolvedAt, Expr::value(now))
            .filter(project_approvals::Column::Id.eq(approval_id))
            .filter(project_approvals::Column::Status.eq(ApprovalStatus::Pending.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed conditional approval resolution")?;

        Ok(result.rows_affected == 1)
    }

    /// Admin-override bulk resolution; returns the ids that actually
    /// transitioned (each via the same conditional guard).
    pub async fn resolve_all_pending_for_user(
        &self,
        user_id: i32,
        to: ApprovalStatus,
    ) -> Result<Vec<i32>> {
        let pending = self.pending_for_user(user_id).await?;
        let mut resolved = Vec::with_capacity(pending.len());

        for approval in pending {
            if self.resolve_if_pending(approval.id, to).await? {
                resolved.push(approval.id);
            }
        }

        Ok(resolved)
    }
}
