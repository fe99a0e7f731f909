use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, sea_query::Expr,
};

use crate::domain::{RecoveryStatus, VoteKind};
use crate::entities::{recovery_intents, recovery_votes};

use super::approval::VoteUpsert;

#[derive(Debug, Clone)]
pub struct Intent {
    pub id: i32,
    pub token: String,
    pub username: String,
    pub user_id: Option<i32>,
    pub status: RecoveryStatus,
    pub approvals_count: i32,
    pub required_approvals: i32,
    pub created_at: String,
    pub expires_at: String,
}

impl Intent {
    #[must_use]
    pub fn is_expired_at(&self, now: &chrono::DateTime<chrono::Utc>) -> bool {
        chrono::DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|expires| now > &expires)
            .unwrap_or(true)
    }
}

impl TryFrom<recovery_intents::Model> for Intent {
    type Error = anyhow::Error;

    fn try_from(model: recovery_intents::Model) -> Result<Self> {
        let status = model
            .status
            .parse::<RecoveryStatus>()
            .map_err(|e| anyhow::anyhow!("Corrupt recovery intent {}: {e}", model.id))?;

        Ok(Self {
            id: model.id,
            token: model.token,
            username: model.username,
            user_id: model.user_id,
            status,
            approvals_count: model.approvals_count,
            required_approvals: model.required_approvals,
            created_at: model.created_at,
            expires_at: model.expires_at,
        })
    }
}

pub struct RecoveryRepository {
    conn: DatabaseConnection,
}

impl RecoveryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        username: &str,
        user_id: Option<i32>,
        required_approvals: i32,
        ttl_hours: i64,
    ) -> Result<Intent> {
        let now = chrono::Utc::now();
        let token = uuid::Uuid::new_v4().to_string();

        let model = recovery_intents::ActiveModel {
            token: Set(token),
            username: Set(username.to_string()),
            user_id: Set(user_id),
            status: Set(RecoveryStatus::Pending.as_str().to_string()),
            approvals_count: Set(0),
            required_approvals: Set(required_approvals),
            created_at: Set(now.to_rfc3339()),
            expires_at: Set((now + chrono::Duration::hours(ttl_hours)).to_rfc3339()),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to create recovery intent")?;

        Intent::try_from(inserted)
    }

    /// Token lookup with lazy expiry: a pending or approved intent past
    /// its `expires_at` transitions to `expired` on this read. An
    /// approved token that was never consumed dies the same way a
    /// pending one does. There is no background sweep; this is the only
    /// place expiry happens.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Intent>> {
        let row = recovery_intents::Entity::find()
            .filter(recovery_intents::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query recovery intent")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut intent = Intent::try_from(row)?;

        if matches!(
            intent.status,
            RecoveryStatus::Pending | RecoveryStatus::Approved
        ) && intent.is_expired_at(&chrono::Utc::now())
        {
            // Conditional so a concurrent reader cannot double-transition.
            if self.expire_from(intent.id, intent.status).await? {
                intent.status = RecoveryStatus::Expired;
            } else if let Some(reread) = recovery_intents::Entity::find_by_id(intent.id)
                .one(&self.conn)
                .await?
            {
                intent = Intent::try_from(reread)?;
            }
        }

        Ok(Some(intent))
    }

    pub async fn upsert_vote(
        &self,
        intent_id: i32,
        voter_id: i32,
        vote: VoteKind,
        reason: Option<&str>,
    ) -> Result<VoteUpsert> {
        let now = chrono::Utc::now().to_rfc3339();

        let existing = recovery_votes::Entity::find()
            .filter(recovery_votes::Column::IntentId.eq(intent_id))
            .filter(recovery_votes::Column::VoterId.eq(voter_id))
            .one(&self.conn)
            .await
            .context("Failed to query existing recovery vote")?;

        if let Some(row) = existing {
            let mut active: recovery_votes::ActiveModel = row.into();
            active.vote = Set(vote.as_str().to_string());
            active.reason = Set(reason.map(str::to_string));
            active.voted_at = Set(now);
            active.update(&self.conn).await?;
            return Ok(VoteUpsert::Replaced);
        }

        let model = recovery_votes::ActiveModel {
            intent_id: Set(intent_id),
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
                    Err(err).context("Failed to insert recovery vote")
                }
            }
        }
    }

    /// Distinct approving voters, counting each voter's latest vote only
    /// (the upsert keeps one row per voter).
    pub async fn approve_count(&self, intent_id: i32) -> Result<u64> {
        recovery_votes::Entity::find()
            .filter(recovery_votes::Column::IntentId.eq(intent_id))
            .filter(recovery_votes::Column::Vote.eq(VoteKind::Approve.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to count recovery approvals")
    }

    /// Keep the denormalized counter on the intent in step with the tally.
    pub async fn set_approvals_count(&self, intent_id: i32, count: i32) -> Result<()> {
        recovery_intents::Entity::update_many()
            .col_expr(
                recovery_intents::Column::ApprovalsCount,
                Expr::value(count),
            )
            .filter(recovery_intents::Column::Id.eq(intent_id))
            .exec(&self.conn)
            .await
            .context("Failed to update approvals count")?;

        Ok(())
    }

    /// Conditional `from -> expired` transition; exactly-once. Loses to
    /// a concurrent consume, which is the intended precedence.
    async fn expire_from(&self, intent_id: i32, from: RecoveryStatus) -> Result<bool> {
        let result = recovery_intents::Entity::update_many()
            .col_expr(
                recovery_intents::Column::Status,
                Expr::value(RecoveryStatus::Expired.as_str()),
            )
            .filter(recovery_intents::Column::Id.eq(intent_id))
            .filter(recovery_intents::Column::Status.eq(from.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed conditional intent expiry")?;

        Ok(result.rows_affected == 1)
    }

    /// Conditional `pending -> to` transition; exactly-once.
    pub async fn resolve_if_pending(&self, intent_id: i32, to: RecoveryStatus) -> Result<bool> {
        let result = recovery_intents::Entity::update_many()
            .col_expr(recovery_intents::Column::Status, Expr::value(to.as_str()))
            .filter(recovery_intents::Column::Id.eq(intent_id))
            .filter(recovery_intents::Column::Status.eq(RecoveryStatus::Pending.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed conditional intent resolution")?;

        Ok(result.rows_affected == 1)
    }

    /// One-time consumption of an approved token: `approved -> done`.
    /// The conditional guard makes a double reset impossible.
    pub async fn consume_if_approved(&self, intent_id: i32) -> Result<bool> {
        let result = recovery_intents::Entity::update_many()
            .col_expr(
                recovery_intents::Column::Status,
                Expr::value(RecoveryStatus::Done.as_str()),
            )
            .filter(recovery_intents::Column::Id.eq(intent_id))
            .filter(recovery_intents::Column::Status.eq(RecoveryStatus::Approved.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to consume recovery token")?;

        Ok(result.rows_affected == 1)
    }
}
