use super::{authorize, parse_params, require_non_empty, CallContext, GatewayMethod};
use crate::github::NewPull;
use futures::future::BoxFuture;
use gateway_core::repo::RepoName;
use gateway_core::role::Permission;
use gateway_core::Result;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    repo: RepoName,
    title: String,
    head: String,
    /// Falls back to the repository's default branch.
    #[serde(default)]
    base: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

pub struct CreatePullRequest;

impl GatewayMethod for CreatePullRequest {
    fn name(&self) -> &'static str {
        "repo.createPullRequest"
    }

    fn description(&self) -> &'static str {
        "Open a pull request from head into base (default: the repository's default branch)"
    }

    fn required(&self) -> Permission {
        Permission::Write
    }

    fn call<'a>(&'a self, ctx: &'a CallContext, params: Value) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let p: Params = parse_params(params)?;
            require_non_empty("title", &p.title)?;
            require_non_empty("head", &p.head)?;
            let entry = authorize(ctx, &p.repo, self.required()).await?;
            let client = ctx.github.installation(entry.installation_id).await?;
            let pull = NewPull {
                title: p.title,
                head: p.head,
                base: p.base.filter(|b| !b.trim().is_empty()),
                body: p.body,
            };
            let created = client.create_pull(&p.repo, &pull).await?;
            tracing::info!(repo = %p.repo, number = created.number, role = %ctx.role, "pull request opened");
            Ok(json!({
                "number": created.number,
                "url": created.html_url,
                "title": created.title,
                "state": created.state,
            }))
        })
    }
}
