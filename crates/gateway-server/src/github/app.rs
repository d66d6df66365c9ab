use super::cache::TokenCache;
use super::client::{
    check_status, transport_error, InstallationClient, API_VERSION, API_VERSION_HEADER,
    GITHUB_ACCEPT, USER_AGENT,
};
use chrono::{DateTime, Utc};
use gateway_core::{GatewayError, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub rejects app JWTs that live longer than ten minutes.
const JWT_LIFETIME_SECS: i64 = 9 * 60;
/// Backdate `iat` to tolerate clock drift between us and GitHub.
const JWT_BACKDATE_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AppClaims {
    pub(crate) iat: i64,
    pub(crate) exp: i64,
    pub(crate) iss: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// AppCredentials
// ---------------------------------------------------------------------------

/// App id plus RSA signing key.
pub struct AppCredentials {
    app_id: u64,
    key: EncodingKey,
}

impl AppCredentials {
    /// Accepts PKCS#1 or PKCS#8 PEM. Literal `\n` sequences are expanded so
    /// the key can be passed through a single-line environment variable.
    pub fn from_pem(app_id: u64, pem: &str) -> Result<Self> {
        let pem = pem.trim().replace("\\n", "\n");
        let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            GatewayError::Internal(format!("invalid GitHub App private key: {e}"))
        })?;
        Ok(Self { app_id, key })
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    pub fn jwt(&self, now: DateTime<Utc>) -> Result<String> {
        let now = now.timestamp();
        let claims = AppClaims {
            iat: now - JWT_BACKDATE_SECS,
            exp: now + JWT_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| GatewayError::Internal(format!("failed to sign app JWT: {e}")))
    }
}

// ---------------------------------------------------------------------------
// GitHubApp
// ---------------------------------------------------------------------------

/// Entry point for everything that talks to GitHub on behalf of the app.
pub struct GitHubApp {
    credentials: AppCredentials,
    http: reqwest::Client,
    api_url: String,
    cache: TokenCache,
}

impl GitHubApp {
    pub fn new(
        credentials: AppCredentials,
        api_url: impl Into<String>,
        timeout: std::time::Duration,
        cache: TokenCache,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            credentials,
            http,
            api_url,
            cache,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Exchange the app credential for a client scoped to one installation.
    pub async fn installation(&self, installation_id: u64) -> Result<InstallationClient> {
        let now = Utc::now();
        if let Some(token) = self.cache.get(installation_id, now) {
            tracing::debug!(installation_id, "reusing cached installation token");
            return Ok(self.scoped(token));
        }

        let jwt = self.credentials.jwt(now)?;
        let url = format!(
            "{}/app/installations/{installation_id}/access_tokens",
            self.api_url
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(jwt)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()
            .await
            .map_err(transport_error)?;
        let body: AccessTokenResponse = check_status(resp)
            .await?
            .json()
            .await
            .map_err(transport_error)?;

        tracing::debug!(
            installation_id,
            app_id = self.credentials.app_id(),
            expires_at = ?body.expires_at,
            "acquired installation token"
        );
        self.cache
            .put(installation_id, &body.token, body.expires_at, now);
        Ok(self.scoped(body.token))
    }

    fn scoped(&self, token: String) -> InstallationClient {
        InstallationClient::new(self.http.clone(), self.api_url.clone(), token)
    }
}
