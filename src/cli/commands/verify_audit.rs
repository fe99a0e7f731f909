//! Audit chain verification command handler

use crate::config::Config;
use crate::db::Store;
use crate::domain::hashchain::verify_chain;

pub async fn cmd_verify_audit(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let entries = store.audit_chain().await?;

    if entries.is_empty() {
        println!("Audit log is empty.");
        return Ok(());
    }

    match verify_chain(&entries) {
        Ok(()) => {
            println!("Audit chain OK ({} entries)", entries.len());
            Ok(())
        }
        Err(index) => {
            println!(
                "Audit chain BROKEN at entry {} of {}",
                index,
                entries.len()
            );
            anyhow::bail!("Audit chain verification failed at entry {index}")
        }
    }
}
