mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface for everything outside the robot
/// records themselves (see [`crate::robot::RobotStore`]).
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Project operations
    fn create_project(&self, name: &str) -> Result<Project>;
    fn get_project(&self, id: i64) -> Result<Option<Project>>;
    fn get_project_by_name(&self, name: &str) -> Result<Option<Project>>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn delete_project(&self, id: i64) -> Result<bool>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Project grant operations
    fn upsert_project_grant(&self, grant: &ProjectGrant) -> Result<()>;
    fn get_project_grant(&self, user_id: &str, project_id: i64) -> Result<Option<ProjectGrant>>;
    fn list_user_project_grants(&self, user_id: &str) -> Result<Vec<ProjectGrant>>;
    fn delete_project_grant(&self, user_id: &str, project_id: i64) -> Result<bool>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;
}
