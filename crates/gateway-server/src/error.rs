use crate::rpc::{McpError, McpResponse};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gateway_core::GatewayError;
use serde_json::Value;

// ---------------------------------------------------------------------------
// StatusMode
// ---------------------------------------------------------------------------

/// How handler errors map onto HTTP statuses.
///
/// `Collapsed` keeps 401 for authentication and answers 400 for everything
/// else; that is the wire contract clients are written against. `Typed`
/// gives each error kind its own status and is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusMode {
    Typed,
    #[default]
    Collapsed,
}

pub fn status_for(err: &GatewayError, mode: StatusMode) -> StatusCode {
    if matches!(err, GatewayError::Unauthorized) {
        return StatusCode::UNAUTHORIZED;
    }
    if mode == StatusMode::Collapsed {
        return StatusCode::BAD_REQUEST;
    }
    match err {
        GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
        GatewayError::InvalidRequest(_) | GatewayError::UnknownMethod(_) => {
            StatusCode::BAD_REQUEST
        }
        GatewayError::InvalidParams(_)
        | GatewayError::InvalidRepoName(_)
        | GatewayError::NotAFile(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GatewayError::NoPermission { .. } | GatewayError::WriteRequired { .. } => {
            StatusCode::FORBIDDEN
        }
        GatewayError::RepoNotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        GatewayError::ConfigLoad { .. }
        | GatewayError::DuplicateToken { .. }
        | GatewayError::Internal(_)
        | GatewayError::Io(_)
        | GatewayError::Yaml(_)
        | GatewayError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn data_for(err: &GatewayError) -> Option<Value> {
    match err {
        GatewayError::Upstream {
            status: Some(status),
            ..
        } => Some(serde_json::json!({ "upstreamStatus": status })),
        _ => None,
    }
}

/// Build the error envelope for `err`. The envelope `code` always equals the
/// HTTP status.
pub fn error_envelope(id: Value, err: &GatewayError, mode: StatusMode) -> (StatusCode, McpResponse) {
    let status = status_for(err, mode);
    let envelope = McpResponse::failure(
        id,
        McpError {
            code: status.as_u16(),
            message: err.to_string(),
            data: data_for(err),
        },
    );
    (status, envelope)
}

pub fn error_response(id: Value, err: &GatewayError, mode: StatusMode) -> Response {
    let (status, envelope) = error_envelope(id, err, mode);
    (status, axum::Json(envelope)).into_response()
}
