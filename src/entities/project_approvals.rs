use sea_orm::entity::prelude::*;

/// A per-project approval opened by a security event. At most one
/// `pending` row per `(user, project)`; re-opening returns the existing
/// row unchanged.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "project_approvals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub project_id: i32,

    /// `password_change`, `password_reset` or `recovery`
    pub event_type: String,

    /// `pending`, `approved` or `rejected`
    pub status: String,

    pub created_at: String,

    pub resolved_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
