pub mod prelude;

pub mod approval_votes;
pub mod audit_log;
pub mod project_approvals;
pub mod project_memberships;
pub mod projects;
pub mod recovery_intents;
pub mod recovery_votes;
pub mod users;
