mod approve;
mod list_users;
mod reset_password;
mod revoke;
mod verify_audit;

pub use approve::cmd_approve;
pub use list_users::cmd_list_users;
pub use reset_password::cmd_reset_password;
pub use revoke::cmd_revoke;
pub use verify_audit::cmd_verify_audit;
