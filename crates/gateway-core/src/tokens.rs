//! Bearer-token → role resolution.
//!
//! The table is built once at startup from `CODEX_TOKEN`, `CURSOR_TOKEN` and
//! `GEMINI_TOKEN`. Tokens are stored as SHA-256 digests so lookups never
//! compare raw secret bytes.

use crate::error::{GatewayError, Result};
use crate::role::AgentRole;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

type TokenDigest = [u8; 32];

#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    by_digest: HashMap<TokenDigest, AgentRole>,
}

fn digest(token: &str) -> TokenDigest {
    Sha256::digest(token.as_bytes()).into()
}

impl TokenTable {
    /// Read every role's token variable from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or blank values leave
    /// that role without a token.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pairs = AgentRole::ALL
            .into_iter()
            .filter_map(|role| lookup(role.token_env_var()).map(|t| (role, t)));
        Self::from_pairs(pairs)
    }

    /// Two roles sharing a token is a configuration error, never a silent
    /// last-writer-wins.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (AgentRole, String)>) -> Result<Self> {
        let mut by_digest = HashMap::new();
        for (role, token) in pairs {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if let Some(first) = by_digest.insert(digest(token), role) {
                return Err(GatewayError::DuplicateToken {
                    first,
                    second: role,
                });
            }
        }
        Ok(Self { by_digest })
    }

    pub fn resolve(&self, token: &str) -> Option<AgentRole> {
        if token.is_empty() {
            return None;
        }
        self.by_digest.get(&digest(token)).copied()
    }

    /// Roles that have a token configured, in declaration order.
    pub fn roles(&self) -> Vec<AgentRole> {
        let mut roles: Vec<AgentRole> = self.by_digest.values().copied().collect();
        roles.sort();
        roles
    }

    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }
}
