//! Admin revoke command handler

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_revoke(config: &Config, username: &str) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let outcome = state.admin_service.revoke(username).await?;

    println!("Revoked '{username}'");
    println!("{:-<70}", "");
    println!(
        "  Account state:      {} -> revoked",
        outcome.previous_state.as_str()
    );
    println!(
        "  Token version:      {} -> {} (all sessions invalidated)",
        outcome.token_version_before, outcome.token_version_after
    );
    println!();
    println!("Logins now fail regardless of password until a reset/approve cycle.");

    Ok(())
}
