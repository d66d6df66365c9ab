use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

/// Inbound call. `id` is echoed back untouched; only strings and numbers
/// are accepted.
#[derive(Debug, Deserialize)]
pub struct McpRequest {
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Exactly one of `result` / `error` is present.
#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: McpError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Best-effort id recovery from a body that failed envelope validation.
pub fn salvage_id(raw: &Value) -> Value {
    match raw.get("id") {
        Some(id @ (Value::String(_) | Value::Number(_))) => id.clone(),
        _ => Value::Null,
    }
}

pub fn is_valid_id(id: &Value) -> bool {
    matches!(id, Value::String(_) | Value::Number(_))
}
