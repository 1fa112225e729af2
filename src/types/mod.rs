mod models;
mod permission;
mod policy;

pub use models::*;
pub use permission::{Permission, RobotAction};
pub use policy::{AccessRequest, Effect, PERMISSION_KIND_PROJECT, Policy, RobotPermission, policy_key};
