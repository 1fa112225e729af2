use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{RequireAdmin, expiry_after, store_new_token};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, PaginationParams, TokenResponse,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};
use crate::types::User;
use crate::validation::validate_user_name;

use super::find_user;

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    validate_user_name(&req.name).map_err(ApiError::bad_request)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        created_at: now,
        updated_at: now,
    };

    state.store.create_user(&user).map_err(|e| match e {
        Error::AlreadyExists => ApiError::conflict("User already exists"),
        e => ApiError::from(e),
    })?;
    tracing::info!("Created user {} ({})", user.name, user.id);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let users = state
        .store
        .list_users(params.cursor.as_deref().unwrap_or(""), DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let user = find_user(&state, &user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

/// Removes the user together with their tokens and project grants.
pub async fn delete_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let user = find_user(&state, &user)?;

    if state
        .store
        .delete_user(&user.id)
        .api_err("Failed to delete user")?
    {
        tracing::info!("Deleted user {} ({})", user.name, user.id);
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_user_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> impl IntoResponse {
    let user = find_user(&state, &user)?;

    let tokens = state
        .store
        .list_user_tokens(&user.id)
        .api_err("Failed to list user tokens")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(
        tokens
            .into_iter()
            .map(TokenResponse::from)
            .collect::<Vec<_>>(),
    )))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let user = find_user(&state, &user)?;

    let expires_at = match req.expires_in_seconds {
        None => None,
        Some(seconds) if seconds <= 0 => {
            return Err(ApiError::bad_request(
                "expires_in_seconds must be positive",
            ));
        }
        Some(seconds) => Some(
            expiry_after(Utc::now(), seconds)
                .ok_or_else(|| ApiError::bad_request("expires_in_seconds is out of range"))?,
        ),
    };

    let (token, raw_token) =
        store_new_token(state.store.as_ref(), Some(&user.id), expires_at).map_err(|e| match e {
            Error::TokenLookupCollision => ApiError::internal("Failed to allocate a token"),
            e => ApiError::from(e),
        })?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: TokenResponse::from(token),
        })),
    ))
}
