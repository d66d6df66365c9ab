use crate::error::{GatewayError, Result};
use crate::repo::RepoName;
use crate::role::{AgentRole, Permission};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Where the repo table lives when neither `--config` nor `GATEWAY_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/repos.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// RepoConfig
// ---------------------------------------------------------------------------

/// One managed repository. A role missing from `permissions` has no access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfig {
    pub repo: RepoName,
    pub installation_id: u64,
    pub permissions: BTreeMap<AgentRole, Permission>,
}

impl RepoConfig {
    pub fn permission_for(&self, role: AgentRole) -> Option<Permission> {
        self.permissions.get(&role).copied()
    }
}

// ---------------------------------------------------------------------------
// GatewayConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub repos: Vec<RepoConfig>,
}

impl GatewayConfig {
    /// Read and validate the YAML file at `path`. Every failure, I/O or
    /// schema, comes back as a single `ConfigLoad` naming the file.
    pub fn load(path: &Path) -> Result<Self> {
        let wrap = |reason: String| GatewayError::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read_to_string(path).map_err(|e| wrap(e.to_string()))?;
        Self::from_yaml(&data).map_err(|e| wrap(e.to_string()))
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: GatewayConfig = serde_yaml::from_str(data)?;
        Ok(cfg)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Exact match on the `repo` field; the first matching entry wins.
    pub fn find_repo(&self, name: &str) -> Result<&RepoConfig> {
        self.repos
            .iter()
            .find(|r| r.repo.as_str() == name)
            .ok_or_else(|| GatewayError::RepoNotFound(name.to_string()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Non-fatal checks on a config that already passed schema validation.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.repos.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no repos configured; every call will fail with repo not found"
                    .to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.repos {
            if !seen.insert(entry.repo.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "repo '{}' is listed more than once; only the first entry is used",
                        entry.repo
                    ),
                });
            }

            if entry.permissions.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("repo '{}' grants no agent any permission", entry.repo),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
