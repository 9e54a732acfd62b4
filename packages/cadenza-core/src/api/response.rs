//! JSON response helpers shared by the HTTP handlers.

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Wraps a payload as a JSON body.
pub fn api_success<T: Serialize>(data: T) -> Json<T> {
    Json(data)
}

/// Body for commands that have nothing to report.
pub fn api_ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
