use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gateway_core::repo::RepoName;
use gateway_core::{GatewayError, Result};
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Url};
use serde::{Deserialize, Serialize};

pub(crate) const GITHUB_ACCEPT: &str = "application/vnd.github+json";
pub(crate) const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
pub(crate) const API_VERSION: &str = "2022-11-28";
pub(crate) const USER_AGENT: &str = concat!("repo-gateway/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One row of a directory listing as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct NewPull {
    pub title: String,
    pub head: String,
    /// `None` targets the repository's default branch.
    pub base: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    pub title: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl From<ContentItem> for ContentEntry {
    fn from(item: ContentItem) -> Self {
        ContentEntry {
            path: item.path,
            kind: item.kind,
        }
    }
}

/// The contents endpoint answers with an array for directories and a single
/// object for everything else.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Single(ContentItem),
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub(crate) fn transport_error(e: reqwest::Error) -> GatewayError {
    GatewayError::upstream(e.status().map(|s| s.as_u16()), e.to_string())
}

/// Pass 2xx responses through; turn anything else into `Upstream`, keeping
/// GitHub's `message` field verbatim when there is one.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let provider_message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty());
    let message = match provider_message {
        Some(m) => m,
        None if body.trim().is_empty() => status.to_string(),
        None => body,
    };
    Err(GatewayError::upstream(Some(status.as_u16()), message))
}

// ---------------------------------------------------------------------------
// InstallationClient
// ---------------------------------------------------------------------------

/// REST client authenticated with one installation's access token.
#[derive(Clone)]
pub struct InstallationClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl InstallationClient {
    pub fn new(http: reqwest::Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            token: token.into(),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_url).map_err(|e| {
            GatewayError::Internal(format!("invalid GitHub API URL '{}': {e}", self.api_url))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                GatewayError::Internal(format!("GitHub API URL cannot be a base: {}", self.api_url))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn contents_url(&self, repo: &RepoName, path: &str) -> Result<Url> {
        let mut segments = vec!["repos", repo.owner(), repo.name(), "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.url(&segments)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(API_VERSION_HEADER, API_VERSION)
    }

    async fn fetch_contents(
        &self,
        repo: &RepoName,
        path: &str,
        git_ref: &str,
    ) -> Result<ContentsResponse> {
        let url = self.contents_url(repo, path)?;
        tracing::debug!(%repo, path, git_ref, "fetching contents");
        let resp = self
            .authed(self.http.get(url))
            .query(&[("ref", git_ref)])
            .send()
            .await
            .map_err(transport_error)?;
        let resp = check_status(resp).await?;
        resp.json().await.map_err(transport_error)
    }

    /// Fetch a single file as text.
    ///
    /// `repo` is a raw caller string and is validated here, before any
    /// request goes out. Directory listings, symlinks and submodules are
    /// rejected with `NotAFile`, as are binary files whose bytes are not
    /// UTF-8. Content is decoded with whatever encoding GitHub reports for it.
    pub async fn read_file(&self, repo: &str, path: &str, git_ref: &str) -> Result<String> {
        let repo = RepoName::parse(repo)?;
        match self.fetch_contents(&repo, path, git_ref).await? {
            ContentsResponse::Single(item) if item.kind == "file" => decode_content(&item),
            _ => Err(GatewayError::NotAFile(path.to_string())),
        }
    }

    /// List a directory. A path that names a single file yields a
    /// one-element list.
    pub async fn list_contents(
        &self,
        repo: &RepoName,
        path: &str,
        git_ref: &str,
    ) -> Result<Vec<ContentEntry>> {
        let entries = match self.fetch_contents(repo, path, git_ref).await? {
            ContentsResponse::Listing(items) => items.into_iter().map(ContentEntry::from).collect(),
            ContentsResponse::Single(item) => vec![ContentEntry::from(item)],
        };
        Ok(entries)
    }

    pub async fn default_branch(&self, repo: &RepoName) -> Result<String> {
        let url = self.url(&["repos", repo.owner(), repo.name()])?;
        let resp = self
            .authed(self.http.get(url))
            .send()
            .await
            .map_err(transport_error)?;
        let info: RepoInfo = check_status(resp)
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Ok(info.default_branch)
    }

    pub async fn create_pull(&self, repo: &RepoName, pull: &NewPull) -> Result<PullRequest> {
        let base = match &pull.base {
            Some(base) => base.clone(),
            None => self.default_branch(repo).await?,
        };
        let mut payload = serde_json::json!({
            "title": pull.title,
            "head": pull.head,
            "base": base,
        });
        if let Some(body) = &pull.body {
            payload["body"] = serde_json::Value::String(body.clone());
        }

        let url = self.url(&["repos", repo.owner(), repo.name(), "pulls"])?;
        tracing::debug!(%repo, head = %pull.head, %base, "creating pull request");
        let resp = self
            .authed(self.http.post(url))
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(resp)
            .await?
            .json()
            .await
            .map_err(transport_error)
    }
}

fn decode_content(item: &ContentItem) -> Result<String> {
    let raw = item.content.as_deref().unwrap_or("");
    match item.encoding.as_deref().unwrap_or("") {
        "base64" => {
            // GitHub wraps base64 payloads at 60 columns.
            let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = BASE64.decode(compact).map_err(|e| {
                GatewayError::upstream(None, format!("invalid base64 content for {}: {e}", item.path))
            })?;
            String::from_utf8(bytes).map_err(|_| {
                GatewayError::NotAFile(format!("{} (not valid UTF-8 text)", item.path))
            })
        }
        "utf-8" | "utf8" => Ok(raw.to_string()),
        "" if raw.is_empty() => Ok(String::new()),
        other => Err(GatewayError::upstream(
            None,
            format!("unsupported content encoding '{other}' for {}", item.path),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
