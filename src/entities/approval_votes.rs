use sea_orm::entity::prelude::*;

/// One vote per `(approval, voter)`, enforced by a unique index. A
/// re-vote replaces the row (upsert), so a voter is tallied at most once.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "approval_votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub approval_id: i32,

    pub voter_id: i32,

    /// `approve` or `reject`
    pub vote: String,

    pub reason: Option<String>,

    pub voted_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
