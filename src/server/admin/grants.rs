use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireAdmin;
use crate::robot::ProjectResolver;
use crate::server::AppState;
use crate::server::dto::{ProjectGrantRequest, ProjectGrantResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::{Permission, ProjectGrant};

use super::find_user;

// Path parameter names match the route: /users/{id}/project-grants/{project}

#[derive(serde::Deserialize)]
pub struct ProjectGrantPath {
    id: String,
    project: String,
}

fn parse_permissions(perms: &[String]) -> Result<Permission, ApiError> {
    let strs: Vec<&str> = perms.iter().map(String::as_str).collect();
    Permission::parse_many(&strs).ok_or_else(|| {
        ApiError::bad_request(format!("Invalid permission in: {}", perms.join(", ")))
    })
}

fn to_response(grant: ProjectGrant) -> ProjectGrantResponse {
    ProjectGrantResponse {
        project_id: grant.project_id,
        allow: grant.allow_bits.to_strings(),
        deny: grant.deny_bits.to_strings(),
    }
}

pub async fn upsert_project_grant(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<ProjectGrantRequest>,
) -> impl IntoResponse {
    let user = find_user(&state, &user_id)?;
    let scope = state.projects.resolve(&req.project).map_err(ApiError::from)?;

    let allow_bits = parse_permissions(&req.allow)?;
    let deny_bits = parse_permissions(&req.deny)?;

    let now = Utc::now();
    let grant = ProjectGrant {
        user_id: user.id.clone(),
        project_id: scope.project_id,
        allow_bits,
        deny_bits,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .upsert_project_grant(&grant)
        .api_err("Failed to create grant")?;

    tracing::info!(
        "Granted [{}] on project {} to user {}",
        allow_bits.to_strings().join(", "),
        scope.project_name,
        user.name
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(to_response(grant))))
}

pub async fn list_project_grants(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let user = find_user(&state, &user_id)?;

    let grants: Vec<ProjectGrantResponse> = state
        .store
        .list_user_project_grants(&user.id)
        .api_err("Failed to list grants")?
        .into_iter()
        .map(to_response)
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(grants)))
}

pub async fn get_project_grant(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(path): Path<ProjectGrantPath>,
) -> impl IntoResponse {
    let user = find_user(&state, &path.id)?;
    let scope = state.projects.resolve(&path.project).map_err(ApiError::from)?;

    let grant = state
        .store
        .get_project_grant(&user.id, scope.project_id)
        .api_err("Failed to get grant")?
        .or_not_found("Grant not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(to_response(grant))))
}

pub async fn delete_project_grant(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(path): Path<ProjectGrantPath>,
) -> impl IntoResponse {
    let user = find_user(&state, &path.id)?;
    let scope = state.projects.resolve(&path.project).map_err(ApiError::from)?;

    let deleted = state
        .store
        .delete_project_grant(&user.id, scope.project_id)
        .api_err("Failed to delete grant")?;

    if !deleted {
        return Err(ApiError::not_found("Grant not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
