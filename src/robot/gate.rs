use std::sync::Arc;

use super::AccessGate;
use crate::auth::Caller;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{ProjectScope, RobotAction};

/// Access gate backed by per-user project grants in the store.
/// Admin callers pass unconditionally.
pub struct GrantGate {
    store: Arc<dyn Store>,
}

impl GrantGate {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

impl AccessGate for GrantGate {
    fn require_access(
        &self,
        caller: &Caller,
        scope: &ProjectScope,
        action: RobotAction,
    ) -> Result<()> {
        let user_id = match caller {
            Caller::Admin { .. } => return Ok(()),
            Caller::User { user_id, .. } => user_id,
        };

        let allowed = self
            .store
            .get_project_grant(user_id, scope.project_id)?
            .is_some_and(|g| g.effective().has(action.required_permission()));

        if !allowed {
            tracing::warn!(
                "Denied {} on robots of project {} for user {}",
                action,
                scope.project_name,
                user_id
            );
            return Err(Error::Forbidden);
        }
        Ok(())
    }
}
