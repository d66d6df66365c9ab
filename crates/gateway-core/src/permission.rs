use crate::config::RepoConfig;
use crate::error::{GatewayError, Result};
use crate::role::{AgentRole, Permission};

/// Check that `role` may perform an action needing `required` on `repo`.
///
/// A role absent from the repo's table has no access at all; a `read` grant
/// covers reads only; a `write` grant covers both.
pub fn assert_permission(role: AgentRole, repo: &RepoConfig, required: Permission) -> Result<()> {
    match repo.permission_for(role) {
        None => Err(GatewayError::NoPermission {
            role,
            repo: repo.repo.to_string(),
        }),
        Some(granted) if !granted.satisfies(required) => Err(GatewayError::WriteRequired {
            role,
            repo: repo.repo.to_string(),
        }),
        Some(_) => Ok(()),
    }
}
