use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use gateway_core::role::AgentRole;
use gateway_core::tokens::TokenTable;

#[derive(Subcommand)]
pub enum TokenSubcommand {
    /// Report which roles have a token and reject duplicate tokens
    Check,
}

pub fn run(subcmd: TokenSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TokenSubcommand::Check => check(json),
    }
}

fn check(json: bool) -> anyhow::Result<()> {
    let table = TokenTable::from_env().context("reading agent tokens")?;
    let configured = table.roles();
    let missing: Vec<AgentRole> = AgentRole::ALL
        .into_iter()
        .filter(|r| !configured.contains(r))
        .collect();

    if json {
        print_json(&serde_json::json!({
            "configured": configured,
            "missing": missing,
        }))?;
    } else {
        for role in &configured {
            println!("{:<8} ok ({})", role.as_str(), role.token_env_var());
        }
        for role in &missing {
            println!("{:<8} missing ({} is unset or empty)", role.as_str(), role.token_env_var());
        }
    }

    if configured.is_empty() {
        anyhow::bail!("no agent tokens configured; the gateway would reject every call");
    }
    Ok(())
}
