use sea_orm::entity::prelude::*;

/// One row per `(project, user)` pair; uniqueness enforced by index in the
/// initial migration. `status` is written only by approval resolution or
/// the privileged admin override.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "project_memberships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub project_id: i32,

    pub user_id: i32,

    /// `admin`, `editor` or `reader`
    pub role: String,

    /// `active` or `pending`
    pub status: String,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
