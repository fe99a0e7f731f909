pub use super::approval_votes::Entity as ApprovalVotes;
pub use super::audit_log::Entity as AuditLog;
pub use super::project_approvals::Entity as ProjectApprovals;
pub use super::project_memberships::Entity as ProjectMemberships;
pub use super::projects::Entity as Projects;
pub use super::recovery_intents::Entity as RecoveryIntents;
pub use super::recovery_votes::Entity as RecoveryVotes;
pub use super::users::Entity as Users;
