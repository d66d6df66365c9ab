use crate::audit::AuditLog;
use crate::error::StatusMode;
use crate::github::GitHubApp;
use crate::methods::{self, GatewayMethod};
use gateway_core::tokens::TokenTable;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
///
/// Everything here is immutable after startup; the repo config is not held
/// in memory and is re-read from `config_path` on every call.
#[derive(Clone)]
pub struct AppState {
    pub config_path: PathBuf,
    pub tokens: Arc<TokenTable>,
    pub github: Arc<GitHubApp>,
    pub methods: Arc<Vec<Box<dyn GatewayMethod>>>,
    pub audit: AuditLog,
    pub status_mode: StatusMode,
}

impl AppState {
    pub fn new(
        config_path: PathBuf,
        tokens: TokenTable,
        github: GitHubApp,
        audit: AuditLog,
        status_mode: StatusMode,
    ) -> Self {
        Self {
            config_path,
            tokens: Arc::new(tokens),
            github: Arc::new(github),
            methods: Arc::new(methods::all_methods()),
            audit,
            status_mode,
        }
    }

    pub fn find_method(&self, name: &str) -> Option<&dyn GatewayMethod> {
        self.methods
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }
}
