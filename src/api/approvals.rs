use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ApprovalDto, MembershipDto, VoteDto};
use crate::db::User;
use crate::domain::{MembershipStatus, VoteKind};

#[derive(Deserialize)]
pub struct CastVoteRequest {
    pub vote: VoteKind,
    pub reason: Option<String>,
}

/// GET /approvals/mine
///
/// Approvals still gating the caller's own access. Available to pending
/// accounts so they can see what they are waiting on.
pub async fn my_pending(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Vec<ApprovalDto>>>, ApiError> {
    let approvals = state.approvals().my_pending(user.id).await?;

    Ok(Json(ApiResponse::success(
        approvals.into_iter().map(ApprovalDto::from).collect(),
    )))
}

/// GET /approvals/actionable
pub async fn actionable(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Vec<ApprovalDto>>>, ApiError> {
    let approvals = state.approvals().actionable(user.id).await?;

    Ok(Json(ApiResponse::success(
        approvals.into_iter().map(ApprovalDto::from).collect(),
    )))
}

/// POST /approvals/{id}/votes
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(approval_id): Path<i32>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<Json<ApiResponse<ApprovalDto>>, ApiError> {
    let approval = state
        .approvals()
        .cast_vote(approval_id, user.id, payload.vote, payload.reason.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(ApprovalDto::from(approval))))
}

/// GET /approvals/{id}/votes
///
/// Visible to the approval's affected user and to active members of
/// its project; votes carry voter ids and free-text reasons, so they
/// never leak across project boundaries.
pub async fn list_votes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(approval_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<VoteDto>>>, ApiError> {
    let approval = state
        .store()
        .get_approval(approval_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Approval {approval_id} not found")))?;

    let is_project_member = state
        .store()
        .get_membership(approval.project_id, user.id)
        .await?
        .is_some_and(|m| m.status == MembershipStatus::Active);

    if approval.user_id != user.id && !is_project_member {
        return Err(ApiError::forbidden(
            "NOT_ELIGIBLE_VOTER",
            "Votes are visible to the project's members only",
        ));
    }

    let votes = state.store().approval_votes(approval_id).await?;

    Ok(Json(ApiResponse::success(
        votes.into_iter().map(VoteDto::from).collect(),
    )))
}

/// GET /members/pending
///
/// Pending memberships in projects the caller administers.
pub async fn pending_members(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Vec<MembershipDto>>>, ApiError> {
    let memberships = state.approvals().pending_members(user.id).await?;

    Ok(Json(ApiResponse::success(
        memberships.into_iter().map(MembershipDto::from).collect(),
    )))
}
