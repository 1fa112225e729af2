mod caller;
pub mod credential;
mod helpers;
mod middleware;

pub use caller::Caller;
pub use credential::{TOKEN_PREFIX, expiry_after, store_new_token};
pub use helpers::{TokenValidationError, ValidatedToken, extract_token_from_header, validate_token};
pub use middleware::{AuthError, RequireAdmin, RequireAuth};
