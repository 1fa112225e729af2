use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PolicyCatalog;
use super::resource::is_resource_name;
use crate::error::{Error, Result};
use crate::types::{Effect, Policy};

pub const RESOURCE_LOG: &str = "log";
pub const RESOURCE_PROJECT: &str = "project";
pub const RESOURCE_METADATA: &str = "metadata";
pub const RESOURCE_REPOSITORY: &str = "repository";
pub const RESOURCE_HELM_CHART: &str = "helm-chart";
pub const RESOURCE_HELM_CHART_VERSION: &str = "helm-chart-version";
pub const RESOURCE_TAG: &str = "tag";
pub const RESOURCE_ARTIFACT: &str = "artifact";
pub const RESOURCE_ARTIFACT_ADDITION: &str = "artifact-addition";
pub const RESOURCE_ARTIFACT_LABEL: &str = "artifact-label";
pub const RESOURCE_SCAN: &str = "scan";

pub const ACTION_PULL: &str = "pull";
pub const ACTION_PUSH: &str = "push";
pub const ACTION_CREATE: &str = "create";
pub const ACTION_READ: &str = "read";
pub const ACTION_LIST: &str = "list";
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_STOP: &str = "stop";

/// Resource/action pairs a project robot may be granted by default.
const BUILTIN_PROJECT_POLICIES: &[(&str, &str)] = &[
    (RESOURCE_LOG, ACTION_LIST),
    (RESOURCE_PROJECT, ACTION_READ),
    (RESOURCE_METADATA, ACTION_LIST),
    (RESOURCE_REPOSITORY, ACTION_LIST),
    (RESOURCE_REPOSITORY, ACTION_PULL),
    (RESOURCE_REPOSITORY, ACTION_PUSH),
    (RESOURCE_REPOSITORY, ACTION_DELETE),
    (RESOURCE_HELM_CHART, ACTION_READ),
    (RESOURCE_HELM_CHART, ACTION_CREATE),
    (RESOURCE_HELM_CHART, ACTION_DELETE),
    (RESOURCE_HELM_CHART_VERSION, ACTION_READ),
    (RESOURCE_HELM_CHART_VERSION, ACTION_CREATE),
    (RESOURCE_HELM_CHART_VERSION, ACTION_DELETE),
    (RESOURCE_HELM_CHART_VERSION, ACTION_LIST),
    (RESOURCE_TAG, ACTION_CREATE),
    (RESOURCE_TAG, ACTION_DELETE),
    (RESOURCE_TAG, ACTION_LIST),
    (RESOURCE_ARTIFACT, ACTION_READ),
    (RESOURCE_ARTIFACT, ACTION_LIST),
    (RESOURCE_ARTIFACT, ACTION_DELETE),
    (RESOURCE_ARTIFACT_ADDITION, ACTION_READ),
    (RESOURCE_ARTIFACT_LABEL, ACTION_CREATE),
    (RESOURCE_ARTIFACT_LABEL, ACTION_DELETE),
    (RESOURCE_SCAN, ACTION_CREATE),
    (RESOURCE_SCAN, ACTION_STOP),
    (RESOURCE_SCAN, ACTION_READ),
];

/// A catalog that allows the same policy set in every project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCatalog {
    policies: Vec<Policy>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "policy")]
    policies: Vec<Policy>,
}

impl StaticCatalog {
    pub fn new(policies: Vec<Policy>) -> Result<Self> {
        for policy in &policies {
            if !is_resource_name(&policy.resource) {
                return Err(Error::Config(format!(
                    "invalid resource name in policy catalog: {:?}",
                    policy.resource
                )));
            }
            if policy.action.is_empty() || policy.action.contains(':') {
                return Err(Error::Config(format!(
                    "invalid action in policy catalog: {:?}",
                    policy.action
                )));
            }
        }
        Ok(Self { policies })
    }

    /// The built-in project catalog.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            policies: BUILTIN_PROJECT_POLICIES
                .iter()
                .map(|(resource, action)| Policy::new(*resource, *action, Effect::Allow))
                .collect(),
        }
    }

    /// Parses a TOML catalog made of `[[policy]]` tables.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse policy catalog: {e}")))?;
        if file.policies.is_empty() {
            return Err(Error::Config("policy catalog is empty".to_string()));
        }
        Self::new(file.policies)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_toml(&content)?;
        tracing::info!(
            "Loaded {} policies from {}",
            catalog.policies.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    #[must_use]
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PolicyCatalog for StaticCatalog {
    fn allowed_policies(&self, _project_id: i64) -> Result<Vec<Policy>> {
        Ok(self.policies.clone())
    }
}
