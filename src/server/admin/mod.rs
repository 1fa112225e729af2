mod grants;
mod projects;
mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{delete, get, post},
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::CatalogResponse;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::User;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Project routes
        .route("/projects", post(projects::create_project))
        .route("/projects", get(projects::list_projects))
        .route("/projects/{project}", get(projects::get_project))
        .route("/projects/{project}", delete(projects::delete_project))
        // User routes
        .route("/users", post(users::create_user))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/tokens", get(users::list_user_tokens))
        .route("/users/{id}/tokens", post(users::create_user_token))
        // Project grant routes
        .route(
            "/users/{id}/project-grants",
            post(grants::upsert_project_grant),
        )
        .route(
            "/users/{id}/project-grants",
            get(grants::list_project_grants),
        )
        .route(
            "/users/{id}/project-grants/{project}",
            get(grants::get_project_grant),
        )
        .route(
            "/users/{id}/project-grants/{project}",
            delete(grants::delete_project_grant),
        )
        .route("/catalog", get(get_catalog))
}

/// Resolves the `{id}` path segment of the user routes, by id first and
/// then by name.
fn find_user(state: &AppState, id_or_name: &str) -> Result<User, ApiError> {
    if let Some(user) = state.store.get_user(id_or_name).api_err("Failed to get user")? {
        return Ok(user);
    }
    state
        .store
        .get_user_by_name(id_or_name)
        .api_err("Failed to get user")?
        .or_not_found("User not found")
}

async fn get_catalog(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let policies = state.catalog.policies().to_vec();
    Ok::<_, ApiError>(Json(ApiResponse::success(CatalogResponse { policies })))
}
