use crate::error::{GatewayError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static REPO_NAME: LazyLock<Regex> = LazyLock::new(|| {
    // One slash, two non-empty segments.
    Regex::new(r"^[^/]+/[^/]+$").expect("static regex compiles")
});

/// A repository identifier in `owner/name` form.
///
/// Every boundary that accepts a repository string (config file, method
/// params, the file-read primitive) goes through [`RepoName::parse`], so a
/// value of this type always has exactly one `/` and two non-empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName {
    full: String,
    slash: usize,
}

impl RepoName {
    pub fn parse(s: &str) -> Result<Self> {
        if !REPO_NAME.is_match(s) {
            return Err(GatewayError::InvalidRepoName(s.to_string()));
        }
        let slash = s
            .find('/')
            .ok_or_else(|| GatewayError::InvalidRepoName(s.to_string()))?;
        Ok(Self {
            full: s.to_string(),
            slash,
        })
    }

    pub fn owner(&self) -> &str {
        &self.full[..self.slash]
    }

    pub fn name(&self) -> &str {
        &self.full[self.slash + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl std::fmt::Display for RepoName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

impl std::str::FromStr for RepoName {
    type Err = GatewayError;
    fn from_str(s: &str) -> Result<Self> {
        RepoName::parse(s)
    }
}

impl TryFrom<String> for RepoName {
    type Error = GatewayError;
    fn try_from(s: String) -> Result<Self> {
        RepoName::parse(&s)
    }
}

impl From<RepoName> for String {
    fn from(r: RepoName) -> Self {
        r.full
    }
}
