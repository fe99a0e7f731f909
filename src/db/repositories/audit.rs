use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait,
};

use crate::domain::hashchain::{ChainEntry, GENESIS_HASH, chain_hash};
use crate::entities::audit_log;

pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Append one entry on top of the current chain head. Runs in a
    /// transaction so the head read and the insert are a single unit;
    /// concurrent appends serialize through the row lock instead of
    /// forking the chain.
    pub async fn append(&self, correlation_id: &str, payload: String) -> Result<String> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to begin audit transaction")?;

        let head = audit_log::Entity::find()
            .order_by_desc(audit_log::Column::Id)
            .one(&txn)
            .await
            .context("Failed to read audit chain head")?;

        let prev_hash = head.map_or_else(|| GENESIS_HASH.to_string(), |h| h.hash);
        let hash = chain_hash(&prev_hash, &payload);

        let model = audit_log::ActiveModel {
            correlation_id: Set(correlation_id.to_string()),
            payload: Set(payload),
            prev_hash: Set(prev_hash),
            hash: Set(hash.clone()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        model
            .insert(&txn)
            .await
            .context("Failed to append audit entry")?;

        txn.commit()
            .await
            .context("Failed to commit audit entry")?;

        Ok(hash)
    }

    /// The whole chain in append order, ready for
    /// `domain::hashchain::verify_chain`.
    pub async fn chain(&self) -> Result<Vec<ChainEntry>> {
        let rows = audit_log::Entity::find()
            .order_by_asc(audit_log::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to read audit chain")?;

        Ok(rows
            .into_iter()
            .map(|row| ChainEntry {
                correlation_id: row.correlation_id,
                payload: row.payload,
                prev_hash: row.prev_hash,
                hash: row.hash,
            })
            .collect())
    }
}
