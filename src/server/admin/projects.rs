use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::error::Error;
use crate::robot::ProjectResolver;
use crate::server::AppState;
use crate::server::dto::CreateProjectRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::validation::validate_project_name;

pub async fn create_project(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    validate_project_name(&req.name).map_err(ApiError::bad_request)?;

    let project = state.store.create_project(&req.name).map_err(|e| match e {
        Error::AlreadyExists => ApiError::conflict("Project already exists"),
        e => ApiError::from(e),
    })?;

    tracing::info!("Created project {} ({})", project.name, project.id);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn list_projects(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let projects = state
        .store
        .list_projects()
        .api_err("Failed to list projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn get_project(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
) -> impl IntoResponse {
    let scope = state.projects.resolve(&project).map_err(ApiError::from)?;
    let project = state
        .store
        .get_project(scope.project_id)
        .api_err("Failed to get project")?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(project)))
}

/// Deletes a project together with its robots and grants.
pub async fn delete_project(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
) -> impl IntoResponse {
    let scope = state.projects.resolve(&project).map_err(ApiError::from)?;

    state
        .store
        .delete_project(scope.project_id)
        .api_err("Failed to delete project")?;

    tracing::info!("Deleted project {}", scope.project_name);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
