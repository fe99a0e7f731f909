//! Account, membership, approval and recovery state machines.
//!
//! States are stored as strings in sqlite and parsed back through these
//! enums so that invalid values surface as errors instead of silently
//! falling through `match` arms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stored account state. Mutated only by security events and the admin
/// override, never by ordinary request handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    Active,
    PendingApproval,
    Revoked,
}

impl AccountState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PendingApproval => "pending_approval",
            Self::Revoked => "revoked",
        }
    }
}

impl FromStr for AccountState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "pending_approval" => Ok(Self::PendingApproval),
            "revoked" => Ok(Self::Revoked),
            other => Err(format!("unknown account state: {other}")),
        }
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access state returned to the boundary layer. The engine decides, the
/// UI/CLI renders; no redirect logic lives in here.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UserAccessState {
    Active,
    PendingApproval {
        /// Project approvals still gating this account, as `(approval_id, project_id)`.
        approvals: Vec<(i32, i32)>,
    },
    Revoked,
}

/// Membership role within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Editor,
    Reader,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Reader => "reader",
        }
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "reader" => Ok(Self::Reader),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Membership status, driven exclusively by approval resolution or the
/// privileged admin override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Pending,
}

impl MembershipStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            other => Err(format!("unknown membership status: {other}")),
        }
    }
}

/// Lifecycle of a per-project approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown approval status: {other}")),
        }
    }
}

/// A cast vote. Rejections from regular members do not auto-resolve; they
/// only withhold that member's approve contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Approve,
    Reject,
}

impl VoteKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown vote: {other}")),
        }
    }
}

/// Recovery intent lifecycle. `Expired` is entered lazily on read, never
/// by a background sweep. `Done` means the one-time token was consumed by
/// a successful password reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Done,
}

impl RecoveryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Done => "done",
        }
    }
}

impl FromStr for RecoveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown recovery status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_strings_round_trip() {
        for state in [
            AccountState::Active,
            AccountState::PendingApproval,
            AccountState::Revoked,
        ] {
            assert_eq!(state.as_str().parse::<AccountState>().unwrap(), state);
        }

        for status in [
            RecoveryStatus::Pending,
            RecoveryStatus::Approved,
            RecoveryStatus::Rejected,
            RecoveryStatus::Expired,
            RecoveryStatus::Done,
        ] {
            assert_eq!(status.as_str().parse::<RecoveryStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_state_is_an_error() {
        assert!("deleted".parse::<AccountState>().is_err());
        assert!("maybe".parse::<VoteKind>().is_err());
    }

    #[test]
    fn access_state_serializes_tagged() {
        let state = UserAccessState::PendingApproval {
            approvals: vec![(1, 7)],
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "pending_approval");
        assert_eq!(json["approvals"][0][1], 7);
    }
}
