use super::{authorize, default_ref, parse_params, CallContext, GatewayMethod};
use futures::future::BoxFuture;
use gateway_core::repo::RepoName;
use gateway_core::role::Permission;
use gateway_core::Result;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Params {
    repo: RepoName,
    #[serde(default)]
    path: String,
    #[serde(default = "default_ref", rename = "ref")]
    git_ref: String,
}

pub struct ListFiles;

impl GatewayMethod for ListFiles {
    fn name(&self) -> &'static str {
        "repo.listFiles"
    }

    fn description(&self) -> &'static str {
        "List the entries of a directory at a ref (defaults: repository root, main)"
    }

    fn required(&self) -> Permission {
        Permission::Read
    }

    fn call<'a>(&'a self, ctx: &'a CallContext, params: Value) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let p: Params = parse_params(params)?;
            let entry = authorize(ctx, &p.repo, self.required()).await?;
            let client = ctx.github.installation(entry.installation_id).await?;
            let entries = client.list_contents(&p.repo, &p.path, &p.git_ref).await?;
            Ok(serde_json::to_value(entries)?)
        })
    }
}
