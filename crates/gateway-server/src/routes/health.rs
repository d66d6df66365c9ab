use axum::Json;
use serde_json::{json, Value};

/// GET /healthz: unauthenticated liveness probe.
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
