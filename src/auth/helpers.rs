use chrono::Utc;

use super::Caller;
use super::credential::{token_lookup, verify};
use crate::store::Store;
use crate::types::{Token, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    OrphanedToken,
    InternalError,
}

pub struct ValidatedToken {
    pub token: Token,
    pub user: Option<User>,
}

impl ValidatedToken {
    #[must_use]
    pub fn caller(&self) -> Option<Caller> {
        Caller::from_token(&self.token)
    }
}

/// Extracts a token string from a Basic auth header.
/// Expects format: Basic base64(x-token:actual_token)
pub fn extract_basic_auth_token(header: &str) -> Option<String> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    let (username, password) = credentials.split_once(':')?;

    if username != "x-token" {
        return None;
    }

    Some(password.to_string())
}

/// Validates a raw token string against the store.
/// Returns the validated token and its user; non-admin tokens whose user is
/// gone are rejected.
pub fn validate_token(
    store: &dyn Store,
    raw_token: &str,
) -> Result<ValidatedToken, TokenValidationError> {
    let lookup = token_lookup(raw_token).map_err(|_| TokenValidationError::InvalidToken)?;

    let token = store
        .get_token_by_lookup(lookup)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    if !verify(raw_token, &token.token_hash).map_err(|_| TokenValidationError::InternalError)? {
        return Err(TokenValidationError::InvalidToken);
    }

    if let Some(expires_at) = &token.expires_at {
        if expires_at < &Utc::now() {
            return Err(TokenValidationError::TokenExpired);
        }
    }

    let user = match &token.user_id {
        Some(user_id) => Some(
            store
                .get_user(user_id)
                .map_err(|_| TokenValidationError::InternalError)?
                .ok_or(TokenValidationError::OrphanedToken)?,
        ),
        None if token.is_admin => None,
        None => return Err(TokenValidationError::OrphanedToken),
    };

    if let Err(e) = store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(ValidatedToken { token, user })
}

/// Extracts token from Authorization header (Bearer or Basic).
/// Returns None if no auth header is present.
/// Returns Some(token_string) if auth header is present and valid format.
/// Returns Err if the auth scheme is unsupported.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> Result<Option<String>, TokenValidationError> {
    match auth_header {
        Some(header) => {
            if let Some(token) = header.strip_prefix("Bearer ") {
                Ok(Some(token.to_string()))
            } else if header.starts_with("Basic ") {
                extract_basic_auth_token(header)
                    .ok_or(TokenValidationError::InvalidToken)
                    .map(Some)
            } else {
                Err(TokenValidationError::InvalidScheme)
            }
        }
        None => Ok(None),
    }
}
