use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use gateway_core::role::AgentRole;
use gateway_core::{GatewayError, Result};
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

use crate::audit::{AuditRecord, Outcome};
use crate::error::error_envelope;
use crate::methods::CallContext;
use crate::rpc::{is_valid_id, salvage_id, McpRequest, McpResponse};
use crate::state::AppState;

/// POST /mcp: authenticate (done by middleware), parse the envelope,
/// dispatch to the named method and answer with the response envelope.
pub async fn dispatch(
    State(app): State<AppState>,
    Extension(role): Extension<AgentRole>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let req = match parse_envelope(&body) {
        Ok(req) => req,
        Err((id, err)) => {
            // Whatever can still be read from the body goes into the audit trail.
            let raw: Option<Value> = serde_json::from_slice(&body).ok();
            let method = raw
                .as_ref()
                .and_then(|r| r.get("method"))
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string();
            let repo = repo_param(raw.as_ref().and_then(|r| r.get("params")));
            let (status, envelope) = error_envelope(id, &err, app.status_mode);
            record(&app, role, method, repo, started, Some((status, &err)));
            return (status, Json(envelope)).into_response();
        }
    };

    let repo = repo_param(req.params.as_ref());
    let result = invoke(&app, role, &req.method, req.params.unwrap_or(Value::Null)).await;

    let (status, envelope) = match &result {
        Ok(value) => (StatusCode::OK, McpResponse::success(req.id, value.clone())),
        Err(err) => error_envelope(req.id, err, app.status_mode),
    };
    let failure = result.as_ref().err().map(|err| (status, err));
    record(&app, role, req.method, repo, started, failure);

    (status, Json(envelope)).into_response()
}

fn repo_param(params: Option<&Value>) -> Option<String> {
    params
        .and_then(|p| p.get("repo"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn record(
    app: &AppState,
    role: AgentRole,
    method: String,
    repo: Option<String>,
    started: Instant,
    failure: Option<(StatusCode, &GatewayError)>,
) {
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    app.audit.record(&AuditRecord {
        timestamp: Utc::now(),
        call_id: Uuid::new_v4(),
        role,
        method,
        repo,
        outcome: if failure.is_some() {
            Outcome::Error
        } else {
            Outcome::Ok
        },
        error_code: failure.map(|(status, _)| status.as_u16()),
        error: failure.map(|(_, err)| err.to_string()),
        elapsed_ms,
    });
}

fn parse_envelope(body: &[u8]) -> std::result::Result<McpRequest, (Value, GatewayError)> {
    let raw: Value = serde_json::from_slice(body).map_err(|e| {
        (
            Value::Null,
            GatewayError::InvalidRequest(format!("body is not valid JSON: {e}")),
        )
    })?;
    let id = salvage_id(&raw);
    let req: McpRequest = serde_json::from_value(raw)
        .map_err(|e| (id.clone(), GatewayError::InvalidRequest(e.to_string())))?;
    if !is_valid_id(&req.id) {
        return Err((
            Value::Null,
            GatewayError::InvalidRequest("'id' must be a string or a number".to_string()),
        ));
    }
    if req.params.as_ref().is_some_and(|p| !p.is_object() && !p.is_null()) {
        return Err((
            id,
            GatewayError::InvalidRequest("'params' must be an object".to_string()),
        ));
    }
    Ok(req)
}

async fn invoke(app: &AppState, role: AgentRole, method: &str, params: Value) -> Result<Value> {
    let handler = app
        .find_method(method)
        .ok_or_else(|| GatewayError::UnknownMethod(method.to_string()))?;
    let ctx = CallContext {
        role,
        config_path: app.config_path.clone(),
        github: app.github.clone(),
    };
    handler.call(&ctx, params).await
}
