use anyhow::Context;
use clap::Args;
use gateway_server::error::StatusMode;
use gateway_server::github::DEFAULT_API_URL;
use gateway_server::GatewayOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (0 = OS-assigned)
    #[arg(long, env = "PORT", default_value_t = 4040)]
    port: u16,

    /// GitHub App id
    #[arg(long, env = "GITHUB_APP_ID")]
    app_id: u64,

    /// GitHub App private key as PEM text; literal `\n` sequences are expanded
    #[arg(long, env = "GITHUB_APP_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// File holding the GitHub App private key
    #[arg(long, env = "GITHUB_APP_PRIVATE_KEY_PATH")]
    private_key_path: Option<PathBuf>,

    /// GitHub REST API base URL (GitHub Enterprise: https://HOST/api/v3)
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Append one JSON line per call to this file
    #[arg(long, env = "GATEWAY_AUDIT_LOG")]
    audit_log: Option<PathBuf>,

    /// Reuse installation tokens for up to this many seconds (0 = never)
    #[arg(long, default_value_t = 0)]
    token_cache_secs: u64,

    /// Timeout for each GitHub request
    #[arg(long, default_value_t = 30)]
    http_timeout_secs: u64,

    /// Give each handler error its own HTTP status (403, 404, 422, 502, 500)
    /// instead of 400
    #[arg(long)]
    typed_status: bool,
}

pub fn run(config_path: PathBuf, args: ServeArgs) -> anyhow::Result<()> {
    let private_key_pem = resolve_private_key(args.private_key, args.private_key_path.as_deref())?;

    let mut options = GatewayOptions::new(config_path, args.app_id, private_key_pem);
    options.api_url = args.api_url;
    options.http_timeout = Duration::from_secs(args.http_timeout_secs);
    options.token_cache_secs = args.token_cache_secs;
    options.audit_log = args.audit_log;
    if args.typed_status {
        options.status_mode = StatusMode::Typed;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(gateway_server::serve(options, args.port))
}

/// Inline PEM takes precedence over a key file.
fn resolve_private_key(inline: Option<String>, path: Option<&Path>) -> anyhow::Result<String> {
    if let Some(pem) = inline.filter(|p| !p.trim().is_empty()) {
        return Ok(pem);
    }
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading private key from {}", path.display())),
        None => anyhow::bail!(
            "no GitHub App private key: set GITHUB_APP_PRIVATE_KEY or GITHUB_APP_PRIVATE_KEY_PATH"
        ),
    }
}
