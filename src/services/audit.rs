//! Append-only audit trail over the hash-chained log.
//!
//! Every security-relevant mutation records exactly one entry before the
//! operation reports success. Payloads are serialized once and hashed as
//! stored; see `domain::hashchain` for the chain rules.

use anyhow::Result;
use serde_json::json;

use crate::db::Store;

#[derive(Clone)]
pub struct AuditTrail {
    store: Store,
}

impl AuditTrail {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Record one event under a correlation id. `fields` must be a JSON
    /// object; the event name and timestamp are merged in.
    pub async fn record(
        &self,
        correlation_id: &str,
        event: &str,
        fields: serde_json::Value,
    ) -> Result<()> {
        let mut payload = json!({
            "event": event,
            "at": chrono::Utc::now().to_rfc3339(),
        });

        if let (Some(target), Some(extra)) = (payload.as_object_mut(), fields.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }

        self.store
            .append_audit(correlation_id, payload.to_string())
            .await?;

        Ok(())
    }

    /// Fresh correlation id for one logical operation.
    #[must_use]
    pub fn correlation_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
