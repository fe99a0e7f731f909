use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};

use crate::domain::{MembershipStatus, Role};
use crate::entities::{project_memberships, projects};

#[derive(Debug, Clone)]
pub struct Membership {
    pub id: i32,
    pub project_id: i32,
    pub user_id: i32,
    pub role: Role,
    pub status: MembershipStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<project_memberships::Model> for Membership {
    type Error = anyhow::Error;

    fn try_from(model: project_memberships::Model) -> Result<Self> {
        let role = model
            .role
            .parse::<Role>()
            .map_err(|e| anyhow::anyhow!("Corrupt membership row {}: {e}", model.id))?;
        let status = model
            .status
            .parse::<MembershipStatus>()
            .map_err(|e| anyhow::anyhow!("Corrupt membership row {}: {e}", model.id))?;

        Ok(Self {
            id: model.id,
            project_id: model.project_id,
            user_id: model.user_id,
            role,
            status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub struct MembershipRepository {
    conn: DatabaseConnection,
}

impl MembershipRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create_project(&self, name: &str) -> Result<projects::Model> {
        let now = chrono::Utc::now().to_rfc3339();
        let model = projects::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now),
            ..Default::default()
        };

        model
            .insert(&self.conn)
            .await
            .with_context(|| format!("Failed to create project {name}"))
    }

    pub async fn get_project(&self, id: i32) -> Result<Option<projects::Model>> {
        projects::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query project")
    }

    pub async fn add_member(
        &self,
        project_id: i32,
        user_id: i32,
        role: Role,
    ) -> Result<Membership> {
        let now = chrono::Utc::now().to_rfc3339();
        let model = project_memberships::ActiveModel {
            project_id: Set(project_id),
            user_id: Set(user_id),
            role: Set(role.as_str().to_string()),
            status: Set(MembershipStatus::Active.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to add project member")?;

        Membership::try_from(inserted)
    }

    pub async fn get(&self, project_id: i32, user_id: i32) -> Result<Option<Membership>> {
        let row = project_memberships::Entity::find()
            .filter(project_memberships::Column::ProjectId.eq(project_id))
            .filter(project_memberships::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query membership")?;

        row.map(Membership::try_from).transpose()
    }

    pub async fn for_user(&self, user_id: i32) -> Result<Vec<Membership>> {
        let rows = project_memberships::Entity::find()
            .filter(project_memberships::Column::UserId.eq(user_id))
            .order_by_asc(project_memberships::Column::ProjectId)
            .all(&self.conn)
            .await
            .context("Failed to list memberships for user")?;

        rows.into_iter().map(Membership::try_from).collect()
    }

    /// Role lookup for eligibility checks. Deliberately a fresh query per
    /// request; caching this would let a demoted admin keep resolving
    /// approvals with a stale role.
    pub async fn role_of(&self, project_id: i32, user_id: i32) -> Result<Option<Role>> {
        Ok(self.get(project_id, user_id).await?.map(|m| m.role))
    }

    /// Total roster size of a project, regardless of status. A count of 1
    /// marks a solo project, which has no in-project approval path.
    pub async fn member_count(&self, project_id: i32) -> Result<u64> {
        project_memberships::Entity::find()
            .filter(project_memberships::Column::ProjectId.eq(project_id))
            .count(&self.conn)
            .await
            .context("Failed to count project members")
    }

    /// Count of members eligible to vote on `affected_user`'s approval:
    /// active memberships only (pending members cannot vote, so counting
    /// them would deadlock the quorum), excluding the affected user.
    pub async fn active_voter_count(&self, project_id: i32, affected_user: i32) -> Result<u64> {
        project_memberships::Entity::find()
            .filter(project_memberships::Column::ProjectId.eq(project_id))
            .filter(project_memberships::Column::Status.eq(MembershipStatus::Active.as_str()))
            .filter(project_memberships::Column::UserId.ne(affected_user))
            .count(&self.conn)
            .await
            .context("Failed to count active voters")
    }

    pub async fn set_status(
        &self,
        project_id: i32,
        user_id: i32,
        status: MembershipStatus,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        project_memberships::Entity::update_many()
            .col_expr(
                project_memberships::Column::Status,
                Expr::value(status.as_str()),
            )
            .col_expr(project_memberships::Column::UpdatedAt, Expr::value(now))
            .filter(project_memberships::Column::ProjectId.eq(project_id))
            .filter(project_memberships::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to set membership status")?;

        Ok(())
    }

    /// Flip every membership of a user at once (admin override path).
    /// Returns the number of memberships affected.
    pub async fn set_status_for_user(
        &self,
        user_id: i32,
        status: MembershipStatus,
    ) -> Result<u64> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = project_memberships::Entity::update_many()
            .col_expr(
                project_memberships::Column::Status,
                Expr::value(status.as_str()),
            )
            .col_expr(project_memberships::Column::UpdatedAt, Expr::value(now))
            .filter(project_memberships::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to update memberships for user")?;

        Ok(result.rows_affected)
    }

    /// Pending memberships in projects where `admin_id` holds an active
    /// admin role, i.e. the rows that admin could unblock.
    pub async fn pending_members_for_admin(&self, admin_id: i32) -> Result<Vec<Membership>> {
        let admin_projects = self.administered_project_ids(admin_id).await?;
        if admin_projects.is_empty() {
            return Ok(Vec::new());
        }

        let rows = project_memberships::Entity::find()
            .filter(project_memberships::Column::ProjectId.is_in(admin_projects))
            .filter(project_memberships::Column::Status.eq(MembershipStatus::Pending.as_str()))
            .order_by_asc(project_memberships::Column::ProjectId)
            .all(&self.conn)
            .await
            .context("Failed to list pending memberships")?;

        rows.into_iter().map(Membership::try_from).collect()
    }

    /// Projects where the user currently holds an active admin membership.
    pub async fn administered_project_ids(&self, user_id: i32) -> Result<Vec<i32>> {
        let rows = project_memberships::Entity::find()
            .filter(project_memberships::Column::UserId.eq(user_id))
            .filter(project_memberships::Column::Role.eq(Role::Admin.as_str()))
            .filter(project_memberships::Column::Status.eq(MembershipStatus::Active.as_str()))
            .all(&self.conn)
            .await
            .context("Failed to list administered projects")?;

        Ok(rows.into_iter().map(|m| m.project_id).collect())
    }

    /// Projects where the user currently holds an active membership of
    /// any role (used for actionable-approval queries).
    pub async fn active_project_ids(&self, user_id: i32) -> Result<Vec<i32>> {
        let rows = project_memberships::Entity::find()
            .filter(project_memberships::Column::UserId.eq(user_id))
            .filter(project_memberships::Column::Status.eq(MembershipStatus::Active.as_str()))
            .all(&self.conn)
            .await
            .context("Failed to list active projects")?;

        Ok(rows.into_iter().map(|m| m.project_id).collect())
    }

    /// Distinct user ids holding an active membership in any of the given
    /// projects, excluding `affected_user`. This is the recovery trusted
    /// voter pool.
    pub async fn voter_pool(&self, project_ids: &[i32], affected_user: i32) -> Result<Vec<i32>> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = project_memberships::Entity::find()
            .filter(project_memberships::Column::ProjectId.is_in(project_ids.to_vec()))
            .filter(project_memberships::Column::Status.eq(MembershipStatus::Active.as_str()))
            .filter(project_memberships::Column::UserId.ne(affected_user))
            .all(&self.conn)
            .await
            .context("Failed to build voter pool")?;

        let mut ids: Vec<i32> = rows.into_iter().map(|m| m.user_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}
