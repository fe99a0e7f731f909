//! List users command handler

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_list_users(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let users = state.admin_service.list_users().await?;

    if users.is_empty() {
        println!("No users.");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for overview in users {
        let user = &overview.user;
        let flags = if user.must_change_password {
            " [must change password]"
        } else {
            ""
        };

        println!("{} [{}]{}", user.username, user.state.as_str(), flags);
        println!(
            "  ID: {} | Token version: {} | Memberships: {}/{} active",
            user.id, user.token_version, overview.active_memberships, overview.memberships
        );
    }

    Ok(())
}
