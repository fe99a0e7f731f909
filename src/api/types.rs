use serde::Serialize;

use crate::db::{Approval, Intent, Membership, User, Vote};
use crate::domain::UserAccessState;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: Some(code),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub state: String,
    pub must_change_password: bool,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            state: user.state.as_str().to_string(),
            must_change_password: user.must_change_password,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeDto {
    pub user: UserDto,
    pub access_state: UserAccessState,
}

#[derive(Debug, Serialize)]
pub struct ApprovalDto {
    pub id: i32,
    pub user_id: i32,
    pub project_id: i32,
    pub event_type: String,
    pub status: String,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<Approval> for ApprovalDto {
    fn from(approval: Approval) -> Self {
        Self {
            id: approval.id,
            user_id: approval.user_id,
            project_id: approval.project_id,
            event_type: approval.event_type,
            status: approval.status.as_str().to_string(),
            created_at: approval.created_at,
            resolved_at: approval.resolved_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoteDto {
    pub approval_id: i32,
    pub voter_id: i32,
    pub vote: String,
    pub reason: Option<String>,
    pub voted_at: String,
}

impl From<Vote> for VoteDto {
    fn from(vote: Vote) -> Self {
        Self {
            approval_id: vote.approval_id,
            voter_id: vote.voter_id,
            vote: vote.vote.as_str().to_string(),
            reason: vote.reason,
            voted_at: vote.voted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MembershipDto {
    pub id: i32,
    pub project_id: i32,
    pub user_id: i32,
    pub role: String,
    pub status: String,
}

impl From<Membership> for MembershipDto {
    fn from(membership: Membership) -> Self {
        Self {
            id: membership.id,
            project_id: membership.project_id,
            user_id: membership.user_id,
            role: membership.role.as_str().to_string(),
            status: membership.status.as_str().to_string(),
        }
    }
}

/// Public view of a recovery intent. The affected user id never leaves
/// the server; unknown usernames produce the same shape as known ones.
#[derive(Debug, Serialize)]
pub struct IntentDto {
    pub token: String,
    pub username: String,
    pub status: String,
    pub approvals_count: i32,
    pub required_approvals: i32,
    pub expires_at: String,
}

impl From<Intent> for IntentDto {
    fn from(intent: Intent) -> Self {
        Self {
            token: intent.token,
            username: intent.username,
            status: intent.status.as_str().to_string(),
            approvals_count: intent.approvals_count,
            required_approvals: intent.required_approvals,
            expires_at: intent.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
