pub mod audit;
pub mod auth;
pub mod error;
pub mod github;
pub mod methods;
pub mod routes;
pub mod rpc;
pub mod state;

use anyhow::Context;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use gateway_core::config::{GatewayConfig, WarnLevel};
use gateway_core::tokens::TokenTable;
use std::path::PathBuf;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::audit::AuditLog;
use crate::error::StatusMode;
use crate::github::{AppCredentials, GitHubApp, TokenCache};
use crate::state::AppState;

/// Process-level settings for one gateway instance. Built by the CLI from
/// flags and environment variables.
#[derive(Clone)]
pub struct GatewayOptions {
    pub config_path: PathBuf,
    pub app_id: u64,
    /// PEM text, not a path.
    pub private_key_pem: String,
    pub api_url: String,
    pub http_timeout: Duration,
    /// Zero disables the installation token cache.
    pub token_cache_secs: u64,
    pub audit_log: Option<PathBuf>,
    pub status_mode: StatusMode,
}

impl GatewayOptions {
    pub fn new(config_path: PathBuf, app_id: u64, private_key_pem: String) -> Self {
        Self {
            config_path,
            app_id,
            private_key_pem,
            api_url: github::DEFAULT_API_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            token_cache_secs: 0,
            audit_log: None,
            status_mode: StatusMode::default(),
        }
    }
}

/// Assemble the shared state. Performs the one startup load of the repo
/// config so a broken file stops the process before it binds a port.
pub fn build_state(options: &GatewayOptions, tokens: TokenTable) -> anyhow::Result<AppState> {
    let config = GatewayConfig::load(&options.config_path)?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Error => tracing::error!("config: {}", w.message),
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
        }
    }
    tracing::info!(
        path = %options.config_path.display(),
        repos = config.repos.len(),
        "loaded repo config"
    );

    if tokens.is_empty() {
        tracing::warn!("no agent tokens configured; every call will be rejected with 401");
    } else {
        let roles: Vec<_> = tokens.roles().iter().map(|r| r.as_str()).collect();
        tracing::info!(roles = %roles.join(","), "agent tokens loaded");
    }

    let credentials = AppCredentials::from_pem(options.app_id, &options.private_key_pem)
        .context("loading GitHub App private key")?;
    let cache = if options.token_cache_secs == 0 {
        TokenCache::disabled()
    } else {
        TokenCache::with_ttl_secs(options.token_cache_secs)
    };
    let github = GitHubApp::new(
        credentials,
        options.api_url.as_str(),
        options.http_timeout,
        cache,
    )?;

    let audit = match &options.audit_log {
        Some(path) => AuditLog::with_file(path),
        None => AuditLog::tracing_only(),
    };

    Ok(AppState::new(
        options.config_path.clone(),
        tokens,
        github,
        audit,
        options.status_mode,
    ))
}

/// Build the axum Router with the gateway endpoint and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let authed = Router::new()
        .route("/mcp", post(routes::mcp::dispatch))
        .route_layer(middleware::from_fn_with_state(
            app_state.tokens.clone(),
            auth::require_agent,
        ));

    Router::new()
        .merge(authed)
        .route("/healthz", get(routes::health::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Start the gateway on `0.0.0.0:{port}`. Role tokens are read from the
/// environment here, once.
pub async fn serve(options: GatewayOptions, port: u16) -> anyhow::Result<()> {
    let tokens = TokenTable::from_env().context("reading agent tokens")?;
    let state = build_state(&options, tokens)?;

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    serve_on(listener, state).await
}

/// Serve on a pre-bound listener.
///
/// Lets the caller read the actual port before starting (useful when
/// `port = 0` and the OS picks a free port).
pub async fn serve_on(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(state);

    tracing::info!("repo gateway listening on http://localhost:{actual_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
