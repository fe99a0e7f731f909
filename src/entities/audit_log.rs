use sea_orm::entity::prelude::*;

/// Append-only, hash-chained audit record. `hash` covers `prev_hash`
/// plus the canonical payload; see `domain::hashchain`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Groups the entries of one logical operation.
    pub correlation_id: String,

    /// Canonical JSON payload, hashed exactly as stored.
    pub payload: String,

    pub prev_hash: String,

    pub hash: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
