use crate::error::GatewayError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AgentRole
// ---------------------------------------------------------------------------

/// The fixed set of caller identities. Each role is bound to exactly one
/// bearer token, read from its environment variable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Codex,
    Cursor,
    Gemini,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [AgentRole::Codex, AgentRole::Cursor, AgentRole::Gemini];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Codex => "codex",
            AgentRole::Cursor => "cursor",
            AgentRole::Gemini => "gemini",
        }
    }

    /// Environment variable holding this role's bearer token.
    pub fn token_env_var(self) -> &'static str {
        match self {
            AgentRole::Codex => "CODEX_TOKEN",
            AgentRole::Cursor => "CURSOR_TOKEN",
            AgentRole::Gemini => "GEMINI_TOKEN",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = GatewayError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| GatewayError::InvalidParams(format!("unknown agent role '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Permission
// ---------------------------------------------------------------------------

/// Two-level access lattice. Variant order is significant: `Read < Write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    /// Whether a grant of `self` covers an action that needs `required`.
    pub fn satisfies(self, required: Permission) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
