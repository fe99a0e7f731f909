use sea_orm::entity::prelude::*;

/// One vote per `(intent, voter)`; the latest re-vote is what counts.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "recovery_votes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub intent_id: i32,

    pub voter_id: i32,

    /// `approve` or `reject`
    pub vote: String,

    pub reason: Option<String>,

    pub voted_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
