//! Admin password reset command handler

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_reset_password(config: &Config, username: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let outcome = state.admin_service.reset_password(username).await?;

    println!("Password reset for '{username}'");
    println!("{:-<70}", "");
    println!("  Temporary password: {}", outcome.temp_password);
    if outcome.approvals_opened > 0 {
        println!(
            "  Account state:      {} -> pending_approval",
            outcome.previous_state.as_str()
        );
    } else {
        println!(
            "  Account state:      {} (no memberships, unchanged)",
            outcome.previous_state.as_str()
        );
    }
    println!(
        "  Token version:      {} -> {} (all sessions invalidated)",
        outcome.token_version_before, outcome.token_version_after
    );
    println!(
        "  Memberships:        {} set to pending",
        outcome.memberships_affected
    );
    println!(
        "  Approvals opened:   {} (one per project)",
        outcome.approvals_opened
    );
    println!();
    println!("The user must change this password on first login.");

    Ok(())
}
