use crate::github::GitHubApp;
use futures::future::BoxFuture;
use gateway_core::config::{GatewayConfig, RepoConfig};
use gateway_core::permission::assert_permission;
use gateway_core::repo::RepoName;
use gateway_core::role::{AgentRole, Permission};
use gateway_core::{GatewayError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub mod create_pull_request;
pub mod get_file;
pub mod list_files;

/// Per-call inputs every method receives besides its params.
pub struct CallContext {
    /// Resolved by the auth middleware, never taken from params.
    pub role: AgentRole,
    pub config_path: PathBuf,
    pub github: Arc<GitHubApp>,
}

pub trait GatewayMethod: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Access level the call needs on its target repository.
    fn required(&self) -> Permission;
    fn call<'a>(&'a self, ctx: &'a CallContext, params: Value) -> BoxFuture<'a, Result<Value>>;
}

pub fn all_methods() -> Vec<Box<dyn GatewayMethod>> {
    vec![
        Box::new(list_files::ListFiles),
        Box::new(get_file::GetFile),
        Box::new(create_pull_request::CreatePullRequest),
    ]
}

pub(crate) fn default_ref() -> String {
    "main".to_string()
}

/// Strict param decoding. Absent params are treated as `{}` so that missing
/// required fields are reported by name.
pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| GatewayError::InvalidParams(e.to_string()))
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidParams(format!("'{field}' must not be empty")));
    }
    Ok(())
}

/// Load the config fresh, find the repo and check the caller's grant.
pub(crate) async fn authorize(
    ctx: &CallContext,
    repo: &RepoName,
    required: Permission,
) -> Result<RepoConfig> {
    let path = ctx.config_path.clone();
    let config = tokio::task::spawn_blocking(move || GatewayConfig::load(&path))
        .await
        .map_err(|e| GatewayError::Internal(format!("task join error: {e}")))??;
    let entry = config.find_repo(repo.as_str())?.clone();
    assert_permission(ctx.role, &entry, required)?;
    Ok(entry)
}
