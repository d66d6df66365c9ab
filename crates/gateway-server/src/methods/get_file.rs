use super::{authorize, default_ref, parse_params, require_non_empty, CallContext, GatewayMethod};
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
    path: String,
    #[serde(default = "default_ref", rename = "ref")]
    git_ref: String,
}

pub struct GetFile;

impl GatewayMethod for GetFile {
    fn name(&self) -> &'static str {
        "repo.getFile"
    }

    fn description(&self) -> &'static str {
        "Return the decoded text of one file at a ref (default: main)"
    }

    fn required(&self) -> Permission {
        Permission::Read
    }

    fn call<'a>(&'a self, ctx: &'a CallContext, params: Value) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let p: Params = parse_params(params)?;
            require_non_empty("path", &p.path)?;
            let entry = authorize(ctx, &p.repo, self.required()).await?;
            let client = ctx.github.installation(entry.installation_id).await?;
            let content = client
                .read_file(p.repo.as_str(), &p.path, &p.git_ref)
                .await?;
            Ok(json!({
                "content": content,
                "path": p.path,
                "ref": p.git_ref,
            }))
        })
    }
}
