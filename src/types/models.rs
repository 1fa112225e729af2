use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Permission, RobotPermission};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The `(project_id, project_name)` pair every robot lookup is qualified by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectScope {
    pub project_id: i64,
    pub project_name: String,
}

impl From<&Project> for ProjectScope {
    fn from(project: &Project) -> Self {
        Self {
            project_id: project.id,
            project_name: project.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Robot-management permissions a user holds within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectGrant {
    pub user_id: String,
    pub project_id: i64,
    pub allow_bits: Permission,
    pub deny_bits: Permission,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectGrant {
    #[must_use]
    pub fn effective(&self) -> Permission {
        self.allow_bits.expand_implied().difference(self.deny_bits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotLevel {
    Project,
    System,
}

impl RobotLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RobotLevel::Project => "project",
            RobotLevel::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<RobotLevel> {
        match s {
            "project" => Some(RobotLevel::Project),
            "system" => Some(RobotLevel::System),
            _ => None,
        }
    }
}

impl fmt::Display for RobotLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub secret_hash: String,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub level: RobotLevel,
    pub permissions: Vec<RobotPermission>,
    pub creation_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// Everything needed to persist a new robot; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRobot {
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub secret_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub level: RobotLevel,
    pub permissions: Vec<RobotPermission>,
    pub creation_time: DateTime<Utc>,
}

/// Field-level change set for a robot. `None` means leave the column alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotChanges {
    pub disabled: Option<bool>,
    pub description: Option<String>,
}

impl RobotChanges {
    /// Diffs the mutable fields of `current` against the requested values.
    #[must_use]
    pub fn diff(current: &Robot, disabled: bool, description: &str) -> Self {
        Self {
            disabled: (current.disabled != disabled).then_some(disabled),
            description: (current.description != description).then(|| description.to_string()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.disabled.is_none() && self.description.is_none()
    }
}
