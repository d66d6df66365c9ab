use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use gateway_core::tokens::TokenTable;
use gateway_core::GatewayError;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{error_response, StatusMode};

/// Pull the token out of `Authorization: Bearer <token>`. Any other scheme,
/// or an empty token, counts as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
}

/// Axum middleware that resolves the caller's role from its bearer token.
///
/// On success the `AgentRole` is inserted into the request extensions for
/// the handler. On failure the request never reaches the handler and gets a
/// 401 envelope that says nothing about which roles exist.
pub async fn require_agent(
    State(tokens): State<Arc<TokenTable>>,
    mut req: Request,
    next: Next,
) -> Response {
    let role = bearer_token(req.headers()).and_then(|t| tokens.resolve(t));
    let Some(role) = role else {
        tracing::warn!(path = %req.uri().path(), "rejected request with missing or unknown bearer token");
        return error_response(Value::Null, &GatewayError::Unauthorized, StatusMode::Typed);
    };
    tracing::debug!(%role, "authenticated");
    req.extensions_mut().insert(role);
    next.run(req).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
