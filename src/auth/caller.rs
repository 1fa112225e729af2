use crate::types::Token;

/// The authenticated party behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// Holder of an admin token; passes every project gate.
    Admin { token_id: String },
    User { user_id: String, token_id: String },
}

impl Caller {
    /// Builds a caller from a validated token. Returns `None` for a non-admin
    /// token without a user binding.
    #[must_use]
    pub fn from_token(token: &Token) -> Option<Self> {
        if token.is_admin {
            return Some(Caller::Admin {
                token_id: token.id.clone(),
            });
        }
        token.user_id.as_ref().map(|user_id| Caller::User {
            user_id: user_id.clone(),
            token_id: token.id.clone(),
        })
    }

    #[must_use]
    pub fn token_id(&self) -> &str {
        match self {
            Caller::Admin { token_id } | Caller::User { token_id, .. } => token_id,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin { .. })
    }
}
