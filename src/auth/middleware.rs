use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use super::Caller;
use super::helpers::{
    TokenValidationError, ValidatedToken, extract_token_from_header, validate_token,
};
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::Token;

const CHALLENGE: &str = "Bearer realm=\"robokey\"";

/// Any authenticated caller, admin or user.
pub struct RequireAuth(pub Caller);

/// Holder of an admin token.
pub struct RequireAdmin(pub Token);

/// Why a request was turned away before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    MissingCredentials,
    Rejected(TokenValidationError),
    AdminRequired,
}

impl AuthError {
    fn api_error(self) -> ApiError {
        match self {
            AuthError::MissingCredentials => ApiError::unauthorized("Authentication required"),
            AuthError::Rejected(TokenValidationError::InvalidScheme) => {
                ApiError::unauthorized("Unsupported authorization scheme")
            }
            AuthError::Rejected(
                TokenValidationError::InvalidToken | TokenValidationError::OrphanedToken,
            ) => ApiError::unauthorized("Invalid token"),
            AuthError::Rejected(TokenValidationError::TokenExpired) => {
                ApiError::unauthorized("Token expired")
            }
            AuthError::Rejected(TokenValidationError::InternalError) => {
                ApiError::internal("Internal server error")
            }
            AuthError::AdminRequired => ApiError::forbidden("Admin access required"),
        }
    }
}

impl From<TokenValidationError> for AuthError {
    fn from(e: TokenValidationError) -> Self {
        AuthError::Rejected(e)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let error = self.api_error();
        let challenge = error.status == StatusCode::UNAUTHORIZED;

        let mut response = error.into_response();
        if challenge {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(CHALLENGE),
            );
        }
        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = authenticate(parts, state)?;
        validated
            .caller()
            .map(RequireAuth)
            .ok_or(AuthError::Rejected(TokenValidationError::OrphanedToken))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = authenticate(parts, state)?;
        if !validated.token.is_admin {
            return Err(AuthError::AdminRequired);
        }
        Ok(RequireAdmin(validated.token))
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<ValidatedToken, AuthError> {
    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let raw = extract_token_from_header(authorization)?.ok_or(AuthError::MissingCredentials)?;
    Ok(validate_token(state.store.as_ref(), &raw)?)
}
