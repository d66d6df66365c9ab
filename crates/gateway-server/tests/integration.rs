use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use gateway_core::role::AgentRole;
use gateway_core::tokens::TokenTable;
use gateway_server::error::StatusMode;
use gateway_server::{build_router, build_state, GatewayOptions};
use http_body_util::BodyExt;
use mockito::{Matcher, ServerGuard};
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

const PRIVATE_KEY: &str = include_str!("fixtures/app-key.pem");

const CONFIG: &str = r#"
repos:
  - repo: acme/widgets
    installationId: 42
    permissions:
      codex: write
      cursor: read
"#;

const CODEX: &str = "codex-token";
const CURSOR: &str = "cursor-token";
const GEMINI: &str = "gemini-token";

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    _dir: TempDir,
    config_path: PathBuf,
    audit_path: PathBuf,
    github: ServerGuard,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config/repos.yaml");
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, CONFIG).unwrap();
        let audit_path = dir.path().join("audit.jsonl");
        Self {
            _dir: dir,
            config_path,
            audit_path,
            github: mockito::Server::new_async().await,
        }
    }

    /// Options as the CLI builds them when no status flag is given.
    fn default_options(&self) -> GatewayOptions {
        let mut options = GatewayOptions::new(self.config_path.clone(), 1, PRIVATE_KEY.to_string());
        options.api_url = self.github.url();
        options.audit_log = Some(self.audit_path.clone());
        options
    }

    fn options(&self, mode: StatusMode) -> GatewayOptions {
        let mut options = self.default_options();
        options.status_mode = mode;
        options
    }

    fn build(&self, options: &GatewayOptions) -> Router {
        let tokens = TokenTable::from_pairs([
            (AgentRole::Codex, CODEX.to_string()),
            (AgentRole::Cursor, CURSOR.to_string()),
            (AgentRole::Gemini, GEMINI.to_string()),
        ])
        .unwrap();
        build_router(build_state(options, tokens).unwrap())
    }

    fn default_router(&self) -> Router {
        self.build(&self.default_options())
    }

    /// Router answering each error kind with its own status instead of 400.
    fn typed_router(&self) -> Router {
        self.build(&self.options(StatusMode::Typed))
    }

    async fn token_mock(&mut self, hits: usize) -> mockito::Mock {
        self.github
            .mock("POST", "/app/installations/42/access_tokens")
            .with_status(201)
            .with_body(r#"{"token":"ghs_installation","expires_at":"2099-01-01T00:00:00Z"}"#)
            .expect(hits)
            .create_async()
            .await
    }

    fn audit_lines(&self) -> Vec<Value> {
        std::fs::read_to_string(&self.audit_path)
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

async fn send(app: Router, token: Option<&str>, body: impl Into<Body>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let resp = app.oneshot(builder.body(body.into()).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn call(app: Router, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, Some(token), body.to_string()).await
}

fn create_pr(repo: &str) -> Value {
    json!({
        "id": 1,
        "method": "repo.createPullRequest",
        "params": {"repo": repo, "title": "Fix bug", "head": "fix-1", "base": "main"}
    })
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn codex_opens_pull_request() {
    let mut h = Harness::new().await;
    let token = h.token_mock(1).await;
    let pulls = h
        .github
        .mock("POST", "/repos/acme/widgets/pulls")
        .match_header("authorization", "Bearer ghs_installation")
        .match_body(Matcher::PartialJson(
            json!({"title": "Fix bug", "head": "fix-1", "base": "main"}),
        ))
        .with_status(201)
        .with_body(
            r#"{"number":17,"html_url":"https://github.com/acme/widgets/pull/17","title":"Fix bug","state":"open"}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let (status, body) = call(h.typed_router(), CODEX, create_pr("acme/widgets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "id": 1,
            "result": {
                "number": 17,
                "url": "https://github.com/acme/widgets/pull/17",
                "title": "Fix bug",
                "state": "open"
            }
        })
    );
    token.assert_async().await;
    pulls.assert_async().await;

    let audit = h.audit_lines();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0]["role"], "codex");
    assert_eq!(audit[0]["method"], "repo.createPullRequest");
    assert_eq!(audit[0]["repo"], "acme/widgets");
    assert_eq!(audit[0]["outcome"], "ok");
}

#[tokio::test]
async fn role_without_entry_is_rejected_with_400() {
    let mut h = Harness::new().await;
    let token = h.token_mock(0).await;

    let (status, body) = call(h.default_router(), GEMINI, create_pr("acme/widgets")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["id"], 1);
    assert_eq!(body["error"]["code"], 400);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("forbidden: no permission for this agent"), "{message}");
    assert!(body.get("result").is_none());
    token.assert_async().await;

    let audit = h.audit_lines();
    assert_eq!(audit[0]["outcome"], "error");
    assert_eq!(audit[0]["errorCode"], 400);
    assert_eq!(audit[0]["role"], "gemini");
}

#[tokio::test]
async fn default_mode_answers_400_for_every_handler_error() {
    let mut h = Harness::new().await;
    let token = h.token_mock(0).await;
    let requests = [
        create_pr("acme/unknown"),
        json!({"id": 2, "method": "repo.listFiles", "params": {"repo": "acme/widgets", "role": "codex"}}),
        json!({"id": 3, "method": "repo.getFile", "params": {"repo": "bad", "path": "a"}}),
    ];
    for req in requests {
        let (status, body) = call(h.default_router(), CURSOR, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["error"]["code"], 400);
    }
    token.assert_async().await;
}

#[tokio::test]
async fn typed_mode_answers_403_for_forbidden() {
    let mut h = Harness::new().await;
    let token = h.token_mock(0).await;

    let (status, body) = call(h.typed_router(), GEMINI, create_pr("acme/widgets")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], 403);
    assert!(body["error"]["message"].as_str().unwrap().contains("forbidden"));
    token.assert_async().await;
}

#[tokio::test]
async fn wrong_token_is_401_regardless_of_body() {
    let h = Harness::new().await;
    for body in [create_pr("acme/widgets"), json!({"garbage": true})] {
        let (status, resp) = call(h.typed_router(), "wrong-token", body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(resp["error"]["code"], 401);
        assert_eq!(resp["id"], Value::Null);
    }
    // Rejected before dispatch, so nothing is audited.
    assert!(h.audit_lines().is_empty());
}

#[tokio::test]
async fn missing_authorization_is_401_in_default_mode() {
    let h = Harness::new().await;
    let (status, _) = send(
        h.default_router(),
        None,
        create_pr("acme/widgets").to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_method_is_400() {
    let h = Harness::new().await;
    for params in [json!({}), json!({"repo": "acme/widgets"})] {
        let (status, body) = call(
            h.typed_router(),
            CODEX,
            json!({"id": "abc", "method": "repo.deleteEverything", "params": params}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["id"], "abc");
        assert_eq!(body["error"]["code"], 400);
        assert_eq!(body["error"]["message"], "method not found: repo.deleteEverything");
    }
}

#[tokio::test]
async fn invalid_json_is_400_with_null_id() {
    let h = Harness::new().await;
    let (status, body) = send(h.typed_router(), Some(CODEX), "{\"id\": 1,").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["id"], Value::Null);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("invalid request"));
}

#[tokio::test]
async fn missing_method_echoes_id() {
    let h = Harness::new().await;
    let (status, body) = call(h.typed_router(), CODEX, json!({"id": 9})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["id"], 9);
}

#[tokio::test]
async fn malformed_envelopes_are_audited() {
    let h = Harness::new().await;
    let app = h.default_router();

    let (status, _) = call(app.clone(), CODEX, json!({"id": 9})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = call(
        app,
        CODEX,
        json!({"id": 1, "method": "repo.getFile", "params": [1]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["id"], 1);

    let audit = h.audit_lines();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0]["method"], "-");
    assert_eq!(audit[1]["method"], "repo.getFile");
    for line in &audit {
        assert_eq!(line["role"], "codex");
        assert_eq!(line["outcome"], "error");
        assert_eq!(line["errorCode"], 400);
    }
}

#[tokio::test]
async fn healthz_needs_no_token() {
    let h = Harness::new().await;
    let resp = h
        .default_router()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_files_defaults_to_root_on_main() {
    let mut h = Harness::new().await;
    let _token = h.token_mock(1).await;
    let _mock = h.github
        .mock("GET", "/repos/acme/widgets/contents")
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_status(200)
        .with_body(r#"[{"type":"dir","path":"src","sha":"x"},{"type":"file","path":"README.md","sha":"y"}]"#)
        .create_async()
        .await;

    let (status, body) = call(
        h.typed_router(),
        CURSOR,
        json!({"id": 2, "method": "repo.listFiles", "params": {"repo": "acme/widgets"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["result"],
        json!([{"path": "src", "type": "dir"}, {"path": "README.md", "type": "file"}])
    );
}

#[tokio::test]
async fn list_files_on_a_file_yields_one_entry() {
    let mut h = Harness::new().await;
    let _token = h.token_mock(1).await;
    let _mock = h.github
        .mock("GET", "/repos/acme/widgets/contents/src/lib.rs")
        .match_query(Matcher::UrlEncoded("ref".into(), "dev".into()))
        .with_status(200)
        .with_body(r#"{"type":"file","path":"src/lib.rs","encoding":"base64","content":""}"#)
        .create_async()
        .await;

    let (status, body) = call(
        h.typed_router(),
        CURSOR,
        json!({"id": 3, "method": "repo.listFiles",
               "params": {"repo": "acme/widgets", "path": "src/lib.rs", "ref": "dev"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!([{"path": "src/lib.rs", "type": "file"}]));
}

#[tokio::test]
async fn get_file_returns_decoded_text() {
    let mut h = Harness::new().await;
    let _token = h.token_mock(1).await;
    let _mock = h.github
        .mock("GET", "/repos/acme/widgets/contents/README.md")
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_status(200)
        // "# Widgets\n" split across lines the way GitHub wraps base64.
        .with_body(r#"{"type":"file","path":"README.md","encoding":"base64","content":"IyBXaWRn\nZXRzCg==\n"}"#)
        .create_async()
        .await;

    let (status, body) = call(
        h.typed_router(),
        CURSOR,
        json!({"id": 4, "method": "repo.getFile",
               "params": {"repo": "acme/widgets", "path": "README.md"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["result"],
        json!({"content": "# Widgets\n", "path": "README.md", "ref": "main"})
    );
}

#[tokio::test]
async fn get_file_on_directory_is_422() {
    let mut h = Harness::new().await;
    let _token = h.token_mock(1).await;
    let _mock = h.github
        .mock("GET", "/repos/acme/widgets/contents/src")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"type":"file","path":"src/lib.rs"}]"#)
        .create_async()
        .await;

    let (status, body) = call(
        h.typed_router(),
        CODEX,
        json!({"id": 5, "method": "repo.getFile", "params": {"repo": "acme/widgets", "path": "src"}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "not a file: src");
}

#[tokio::test]
async fn read_role_cannot_open_pull_request() {
    let mut h = Harness::new().await;
    let token = h.token_mock(0).await;

    let (status, body) = call(h.typed_router(), CURSOR, create_pr("acme/widgets")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("forbidden: write permission required"));
    token.assert_async().await;
}

#[tokio::test]
async fn unconfigured_repo_is_404() {
    let mut h = Harness::new().await;
    let token = h.token_mock(0).await;

    let (status, body) = call(h.typed_router(), CODEX, create_pr("acme/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "repo not found in config: acme/unknown");
    token.assert_async().await;
}

#[tokio::test]
async fn malformed_repo_is_422_without_provider_calls() {
    let mut h = Harness::new().await;
    let token = h.token_mock(0).await;

    let (status, body) = call(
        h.typed_router(),
        CODEX,
        json!({"id": 6, "method": "repo.getFile", "params": {"repo": "acme/widgets/extra", "path": "a"}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("acme/widgets/extra"));
    token.assert_async().await;
}

#[tokio::test]
async fn role_param_is_rejected() {
    let h = Harness::new().await;
    let (status, body) = call(
        h.typed_router(),
        CURSOR,
        json!({"id": 7, "method": "repo.listFiles", "params": {"repo": "acme/widgets", "role": "codex"}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["message"].as_str().unwrap().contains("role"));
}

#[tokio::test]
async fn config_is_reloaded_per_call() {
    let mut h = Harness::new().await;
    let token = h.token_mock(0).await;
    let app = h.typed_router();

    // Revoke cursor after startup; the next call sees the change.
    std::fs::write(
        &h.config_path,
        "repos:\n  - repo: acme/widgets\n    installationId: 42\n    permissions:\n      codex: write\n",
    )
    .unwrap();
    let (status, _) = call(
        app,
        CURSOR,
        json!({"id": 8, "method": "repo.listFiles", "params": {"repo": "acme/widgets"}}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    token.assert_async().await;
}

#[tokio::test]
async fn broken_config_after_startup_is_500() {
    let h = Harness::new().await;
    let app = h.typed_router();
    std::fs::write(&h.config_path, "repos: [").unwrap();

    let (status, body) = call(
        app,
        CODEX,
        json!({"id": 9, "method": "repo.listFiles", "params": {"repo": "acme/widgets"}}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("repos.yaml"));
}

#[tokio::test]
async fn provider_failure_is_502_with_upstream_status() {
    let mut h = Harness::new().await;
    let _token = h.token_mock(1).await;
    let _mock = h.github
        .mock("POST", "/repos/acme/widgets/pulls")
        .with_status(422)
        .with_body(r#"{"message":"Validation Failed"}"#)
        .create_async()
        .await;

    let (status, body) = call(h.typed_router(), CODEX, create_pr("acme/widgets")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], 502);
    assert_eq!(body["error"]["data"]["upstreamStatus"], 422);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Validation Failed"));
}

#[tokio::test]
async fn cached_installation_token_is_reused() {
    let mut h = Harness::new().await;
    let token = h.token_mock(1).await;
    let _mock = h.github
        .mock("GET", "/repos/acme/widgets/contents")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .expect(2)
        .create_async()
        .await;

    let mut options = h.options(StatusMode::Typed);
    options.token_cache_secs = 300;
    let tokens = TokenTable::from_pairs([(AgentRole::Cursor, CURSOR.to_string())]).unwrap();
    let app = build_router(build_state(&options, tokens).unwrap());

    let req = json!({"id": 1, "method": "repo.listFiles", "params": {"repo": "acme/widgets"}});
    for _ in 0..2 {
        let (status, _) = call(app.clone(), CURSOR, req.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }
    token.assert_async().await;
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn startup_fails_on_missing_config() {
    let h = Harness::new().await;
    let mut options = h.options(StatusMode::Typed);
    options.config_path = h.config_path.with_file_name("absent.yaml");
    let err = build_state(&options, TokenTable::from_pairs(Vec::<(AgentRole, String)>::new()).unwrap())
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[tokio::test]
async fn startup_fails_on_bad_private_key() {
    let h = Harness::new().await;
    let mut options = h.options(StatusMode::Typed);
    options.private_key_pem = "not a key".into();
    let err = build_state(&options, TokenTable::from_pairs(Vec::<(AgentRole, String)>::new()).unwrap())
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("private key"));
}
