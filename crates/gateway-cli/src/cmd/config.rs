use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use gateway_core::config::{GatewayConfig, WarnLevel};
use gateway_core::role::AgentRole;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the repo table for common mistakes
    Validate,

    /// Print the repo table
    Show,
}

pub fn run(path: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate => validate(path, json),
        ConfigSubcommand::Show => show(path, json),
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = GatewayConfig::load(path).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "repos": config.repos.len(),
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. {} repo(s), no warnings.", config.repos.len());
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = GatewayConfig::load(path).context("failed to load config")?;

    if json {
        return print_json(&config);
    }
    if config.repos.is_empty() {
        println!("No repos configured.");
        return Ok(());
    }

    let mut headers = vec!["REPO".to_string(), "INSTALLATION".to_string()];
    headers.extend(AgentRole::ALL.iter().map(|r| r.as_str().to_uppercase()));
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    let rows = config
        .repos
        .iter()
        .map(|entry| {
            let mut row = vec![entry.repo.to_string(), entry.installation_id.to_string()];
            row.extend(AgentRole::ALL.iter().map(|&role| {
                entry
                    .permission_for(role)
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string())
            }));
            row
        })
        .collect();
    print_table(&headers, rows);
    Ok(())
}
