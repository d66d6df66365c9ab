mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, serve::ServeArgs, token::TokenSubcommand};
use gateway_core::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "repo-gateway",
    about = "GitHub App gateway that lets coding agents read repositories and open pull requests",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository permission table
    #[arg(long, global = true, env = "GATEWAY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve(ServeArgs),

    /// Inspect the repository permission table
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Check the agent bearer tokens in the environment
    Token {
        #[command(subcommand)]
        subcommand: TokenSubcommand,
    },
}

/// `LOG_LEVEL` wins over `RUST_LOG`; both fall back to `default`.
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default))
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve(_) => "info",
        _ => "warn",
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => cmd::serve::run(cli.config, args),
        Commands::Config { subcommand } => cmd::config::run(&cli.config, subcommand, cli.json),
        Commands::Token { subcommand } => cmd::token::run(subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
