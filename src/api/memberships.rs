use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MembershipDto};
use crate::db::User;
use crate::domain::Role;

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub username: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct ProjectDto {
    pub id: i32,
    pub name: String,
    pub created_at: String,
}

/// POST /projects
///
/// Creates a project with the caller as its admin member.
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<ApiResponse<ProjectDto>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Project name is required"));
    }

    let project = state.store().create_project(payload.name.trim()).await?;
    state
        .store()
        .add_project_member(project.id, user.id, Role::Admin)
        .await?;

    tracing::info!(project_id = project.id, "Project created by {}", user.username);

    Ok(Json(ApiResponse::success(ProjectDto {
        id: project.id,
        name: project.name,
        created_at: project.created_at,
    })))
}

/// POST /projects/{id}/members
///
/// Admin-only within the project.
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<i32>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<Json<ApiResponse<MembershipDto>>, ApiError> {
    state
        .store()
        .get_project(project_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Project {project_id} not found")))?;

    let caller_role = state.store().role_of(project_id, user.id).await?;
    if !caller_role.is_some_and(Role::is_admin) {
        return Err(ApiError::forbidden(
            "NOT_ELIGIBLE_VOTER",
            "Only a project admin can add members",
        ));
    }

    let member = state
        .store()
        .get_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User '{}' not found", payload.username)))?;

    if state
        .store()
        .get_membership(project_id, member.id)
        .await?
        .is_some()
    {
        return Err(ApiError::new(
            axum::http::StatusCode::CONFLICT,
            "CONFLICT",
            "User is already a member of this project",
        ));
    }

    let membership = state
        .store()
        .add_project_member(project_id, member.id, payload.role)
        .await?;

    tracing::info!(
        project_id,
        user_id = member.id,
        "Member added as {}",
        payload.role.as_str()
    );

    Ok(Json(ApiResponse::success(MembershipDto::from(membership))))
}
