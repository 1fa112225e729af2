use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::robot::CreatedRobot;
use crate::types::{AccessRequest, Policy, Robot, RobotLevel, RobotPermission, Token};

// Robot endpoints

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRobotRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Absent means the robot never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access: Vec<AccessRequest>,
}

/// Full replacement of the mutable robot fields. Omitted fields reset to
/// their zero values.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateRobotRequest {
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRobotsParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedRobotResponse {
    pub id: i64,
    pub name: String,
    /// Only ever returned here; the server keeps a hash.
    pub secret: String,
    pub creation_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreatedRobot> for CreatedRobotResponse {
    fn from(created: CreatedRobot) -> Self {
        Self {
            id: created.robot.id,
            name: created.robot.name,
            secret: created.secret,
            creation_time: created.robot.creation_time,
            expires_at: created.robot.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RobotResponse {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub disable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub level: RobotLevel,
    pub permissions: Vec<RobotPermission>,
    pub creation_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl From<Robot> for RobotResponse {
    fn from(robot: Robot) -> Self {
        Self {
            id: robot.id,
            project_id: robot.project_id,
            name: robot.name,
            description: robot.description,
            disable: robot.disabled,
            expires_at: robot.expires_at,
            level: robot.level,
            permissions: robot.permissions,
            creation_time: robot.creation_time,
            update_time: robot.update_time,
        }
    }
}

// Admin endpoints

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectGrantRequest {
    /// Project id or name.
    pub project: String,
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectGrantResponse {
    pub project_id: i64,
    pub allow: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub policies: Vec<Policy>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}
