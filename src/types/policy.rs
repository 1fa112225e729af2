use std::fmt;

use serde::{Deserialize, Serialize};

pub const PERMISSION_KIND_PROJECT: &str = "project";

/// Whether a policy grants or withholds its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

impl Effect {
    /// Parses an effect string. An empty string means `allow`.
    pub fn parse(s: &str) -> Option<Effect> {
        match s {
            "" | "allow" => Some(Effect::Allow),
            "deny" => Some(Effect::Deny),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical capability grant: `resource` is the short resource name
/// (e.g. `repository`), never the full `/project/<id>/...` path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub effect: Effect,
}

impl Policy {
    pub fn new(resource: impl Into<String>, action: impl Into<String>, effect: Effect) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            effect,
        }
    }

    pub fn allow(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(resource, action, Effect::Allow)
    }

    /// Stable membership key for this policy.
    #[must_use]
    pub fn key(&self) -> String {
        policy_key(&self.resource, &self.action, self.effect)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Builds the `<resource>:<action>:<effect>` key two policies are compared by.
#[must_use]
pub fn policy_key(resource: &str, action: &str, effect: Effect) -> String {
    format!("{resource}:{action}:{effect}")
}

/// A grant as sent by API clients, with the resource still in path form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub action: String,
    pub resource: String,
    #[serde(default)]
    pub effect: String,
}

impl AccessRequest {
    pub fn new(
        action: impl Into<String>,
        resource: impl Into<String>,
        effect: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            effect: effect.into(),
        }
    }
}

/// The permission block attached to a robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotPermission {
    pub kind: String,
    pub namespace: String,
    pub access: Vec<Policy>,
}

impl RobotPermission {
    #[must_use]
    pub fn project(namespace: impl Into<String>, access: Vec<Policy>) -> Self {
        Self {
            kind: PERMISSION_KIND_PROJECT.to_string(),
            namespace: namespace.into(),
            access,
        }
    }
}
