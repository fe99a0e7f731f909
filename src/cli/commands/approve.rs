//! Admin approve command handler

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_approve(config: &Config, username: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let outcome = state.admin_service.approve(username).await?;

    println!("Approved '{username}'");
    println!("{:-<70}", "");
    println!(
        "  Account state:      {} -> active",
        outcome.previous_state.as_str()
    );
    println!(
        "  Memberships:        {} set to active",
        outcome.memberships_affected
    );
    println!(
        "  Approvals resolved: {} (quorum bypassed)",
        outcome.approvals_resolved
    );

    Ok(())
}
