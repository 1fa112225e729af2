//! Project-scoped robot accounts: grant validation and lifecycle.
//!
//! [`RobotManager`] owns the create/get/list/update/delete flow. Everything it
//! talks to is injected through the traits below, so storage, the policy
//! catalog and the access gate can each be swapped independently.

pub mod catalog;
mod context;
pub mod gate;
mod manager;
pub mod query;
pub mod resource;
pub mod validator;

#[cfg(test)]
mod tests;

pub use catalog::StaticCatalog;
pub use context::RequestContext;
pub use gate::GrantGate;
pub use manager::{CreateRobot, CreatedRobot, RobotList, RobotManager, UpdateRobot};
pub use query::{ListQuery, NameMatch, Page, RobotFilter};

use crate::auth::Caller;
use crate::error::Result;
use crate::types::{NewRobot, Policy, ProjectScope, Robot, RobotAction, RobotChanges};

/// Resolves a project id or name to its scope.
pub trait ProjectResolver: Send + Sync {
    /// An all-digit string is treated as an id, anything else as a name.
    /// Fails with `ProjectNotFound` when nothing matches.
    fn resolve(&self, id_or_name: &str) -> Result<ProjectScope>;
}

/// Parses a project reference as a numeric id. Project names are never
/// all-digit, so anything this rejects is a name.
#[must_use]
pub fn parse_project_id(id_or_name: &str) -> Option<i64> {
    if id_or_name.is_empty() || !id_or_name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id_or_name.parse().ok()
}

/// Source of the policies a project's robots may be granted.
pub trait PolicyCatalog: Send + Sync {
    fn allowed_policies(&self, project_id: i64) -> Result<Vec<Policy>>;
}

/// Persistence for robot records, keyed by `(project_id, id)`.
pub trait RobotStore: Send + Sync {
    fn list_robots(&self, filter: &RobotFilter, page: Option<&Page>) -> Result<Vec<Robot>>;
    fn count_robots(&self, filter: &RobotFilter) -> Result<i64>;
    fn create_robot(&self, robot: &NewRobot) -> Result<Robot>;
    /// Writes only the fields set in `changes`. Fails with `NotFound` when no
    /// row matches.
    fn update_robot(&self, project_id: i64, id: i64, changes: &RobotChanges) -> Result<()>;
    /// Fails with `NotFound` when no row matches.
    fn delete_robot(&self, project_id: i64, id: i64) -> Result<()>;
    /// Whether a robot with this id exists in any project.
    fn robot_exists(&self, id: i64) -> Result<bool>;
}

/// Authorization check run before every robot operation.
pub trait AccessGate: Send + Sync {
    fn require_access(&self, caller: &Caller, scope: &ProjectScope, action: RobotAction)
    -> Result<()>;
}
