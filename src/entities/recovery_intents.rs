use sea_orm::entity::prelude::*;

/// Pre-authentication recovery capability. The opaque `token` is the only
/// handle both the requester and the voters hold. Expiry is evaluated
/// lazily on read; there is no background sweep.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "recovery_intents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub token: String,

    /// Username as entered by the requester. May not resolve to a user;
    /// such intents look valid but have no eligible voters.
    pub username: String,

    /// Resolved user id, absent for unknown usernames.
    pub user_id: Option<i32>,

    /// `pending`, `approved`, `rejected`, `expired` or `done`
    pub status: String,

    pub approvals_count: i32,

    pub required_approvals: i32,

    pub created_at: String,

    pub expires_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
