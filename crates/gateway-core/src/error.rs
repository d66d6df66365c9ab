use crate::role::AgentRole;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to load config from {}: {reason}", .path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: no permission for this agent ({role} on {repo})")]
    NoPermission { role: AgentRole, repo: String },

    #[error("forbidden: write permission required ({role} has read on {repo})")]
    WriteRequired { role: AgentRole, repo: String },

    #[error("repo not found in config: {0}")]
    RepoNotFound(String),

    #[error("invalid repo '{0}': expected 'owner/name'")]
    InvalidRepoName(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    UnknownMethod(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("upstream error: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("roles '{first}' and '{second}' are configured with the same bearer token")]
    DuplicateToken { first: AgentRole, second: AgentRole },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
