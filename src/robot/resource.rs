use crate::error::{Error, Result};

const PROJECT_PREFIX: &str = "/project/";

/// Resolves a project-scoped resource path to its canonical resource name.
///
/// `/project/1/repository` resolves to `repository`. The project segment must
/// be all digits and the name must be non-empty lowercase ASCII letters and
/// hyphens; anything else is rejected with the offending input echoed back.
pub fn resolve(path: &str) -> Result<&str> {
    let invalid = || Error::InvalidResource(path.to_string());

    let rest = path.strip_prefix(PROJECT_PREFIX).ok_or_else(invalid)?;
    let (project_id, name) = rest.split_once('/').ok_or_else(invalid)?;

    if project_id.is_empty() || !project_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if !is_resource_name(name) {
        return Err(invalid());
    }

    Ok(name)
}

/// Returns true if `name` is a valid canonical resource name.
#[must_use]
pub fn is_resource_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_lowercase() || b == b'-')
}

/// Builds the path form of a resource within a project.
#[must_use]
pub fn resource_path(project_id: i64, name: &str) -> String {
    format!("{PROJECT_PREFIX}{project_id}/{name}")
}
