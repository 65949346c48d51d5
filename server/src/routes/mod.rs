pub mod bookings;
pub mod chat;
pub mod flights;

use axum::Json;
use serde_json::{json, Value};

/// `{success: true, data}` envelope.
pub(crate) fn ok(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub(crate) fn ok_with_message(message: impl Into<String>, data: Value) -> Json<Value> {
    Json(json!({ "success": true, "message": message.into(), "data": data }))
}
