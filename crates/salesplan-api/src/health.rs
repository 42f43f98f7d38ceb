//! `GET /health`

use axum::Json;
use serde_json::{Value, json};

pub async fn handler() -> Json<Value> {
  Json(json!({ "status": "OK", "message": "Sales Planning API is running" }))
}
