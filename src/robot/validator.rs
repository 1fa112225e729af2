use std::collections::HashSet;

use super::PolicyCatalog;
use super::resource::resolve;
use crate::error::{Error, Result};
use crate::types::{AccessRequest, Effect, Policy, ProjectScope, policy_key};

/// Checks every requested grant against the policies the project allows and
/// returns them in canonical form, in request order.
///
/// Fails on the first grant that is malformed or not allowed; no partial list
/// is ever returned.
pub fn validate(
    scope: &ProjectScope,
    grants: &[AccessRequest],
    catalog: &dyn PolicyCatalog,
) -> Result<Vec<Policy>> {
    if grants.is_empty() {
        return Err(Error::EmptyGrantSet);
    }

    let allowed: HashSet<String> = catalog
        .allowed_policies(scope.project_id)?
        .iter()
        .map(Policy::key)
        .collect();

    let mut policies = Vec::with_capacity(grants.len());
    for grant in grants {
        let resource = resolve(&grant.resource)?;

        let not_allowed = || Error::GrantNotAllowed {
            action: grant.action.clone(),
            resource: grant.resource.clone(),
            project: scope.project_name.clone(),
        };

        let effect = Effect::parse(&grant.effect).ok_or_else(not_allowed)?;
        if !allowed.contains(&policy_key(resource, &grant.action, effect)) {
            return Err(not_allowed());
        }

        policies.push(Policy::new(resource, grant.action.as_str(), effect));
    }

    Ok(policies)
}
