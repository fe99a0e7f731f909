//! Domain services (trait + `SeaORM` implementation pairs).

pub mod admin_service;
pub mod admin_service_impl;
pub mod approval_service;
pub mod approval_service_impl;
pub mod audit;
pub mod auth_service;
pub mod auth_service_impl;
pub mod recovery_service;
pub mod recovery_service_impl;

pub use admin_service::{AdminError, AdminService, ApproveOutcome, ResetOutcome, RevokeOutcome, UserOverview};
pub use admin_service_impl::SeaOrmAdminService;
pub use approval_service::{ApprovalError, ApprovalService};
pub use approval_service_impl::SeaOrmApprovalService;
pub use audit::AuditTrail;
pub use auth_service::{AuthError, AuthService, Credential, LoginResult};
pub use auth_service_impl::SeaOrmAuthService;
pub use recovery_service::{RecoveryError, RecoveryService};
pub use recovery_service_impl::SeaOrmRecoveryService;

/// Security events that invalidate sessions and (re)open per-project
/// approvals. The string form is what lands in approval rows and audit
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    PasswordChange,
    PasswordReset,
    Recovery,
}

impl SecurityEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PasswordChange => "password_change",
            Self::PasswordReset => "password_reset",
            Self::Recovery => "recovery",
        }
    }
}
