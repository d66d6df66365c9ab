//! Append-only audit trail of dispatched calls.
//!
//! Every record goes to `tracing` on the `audit` target. When a file is
//! configured the record is also appended there as one JSON line. A failed
//! append is logged and otherwise ignored; it never changes the response.

use chrono::{DateTime, Utc};
use gateway_core::role::AgentRole;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub call_id: Uuid,
    pub role: AgentRole,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    file: Option<Arc<AuditFile>>,
}

#[derive(Debug)]
struct AuditFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    /// Records go to `tracing` only.
    pub fn tracing_only() -> Self {
        Self { file: None }
    }

    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(Arc::new(AuditFile {
                path: path.into(),
                lock: Mutex::new(()),
            })),
        }
    }

    pub fn record(&self, rec: &AuditRecord) {
        match rec.outcome {
            Outcome::Ok => tracing::info!(
                target: "audit",
                call_id = %rec.call_id,
                role = %rec.role,
                method = %rec.method,
                repo = rec.repo.as_deref().unwrap_or("-"),
                elapsed_ms = rec.elapsed_ms,
                "call succeeded"
            ),
            Outcome::Error => tracing::warn!(
                target: "audit",
                call_id = %rec.call_id,
                role = %rec.role,
                method = %rec.method,
                repo = rec.repo.as_deref().unwrap_or("-"),
                code = rec.error_code.unwrap_or_default(),
                error = rec.error.as_deref().unwrap_or(""),
                elapsed_ms = rec.elapsed_ms,
                "call failed"
            ),
        }

        if let Some(file) = &self.file {
            if let Err(e) = file.append(rec) {
                tracing::warn!(path = %file.path.display(), "audit append failed: {e}");
            }
        }
    }
}

impl AuditFile {
    fn append(&self, rec: &AuditRecord) -> gateway_core::Result<()> {
        let line = serde_json::to_string(rec)?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        gateway_core::io::append_line(&self.path, &line)
    }
}
