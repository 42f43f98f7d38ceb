//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use salesplan_core::{Error as CoreError, FieldError};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// One entry per offending field, in submission order.
  #[error("validation failed")]
  Validation(Vec<FieldError>),

  /// An illegal row or workflow transition.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("precondition failed: {0}")]
  PreconditionFailed(String),

  /// The backing store failed; the request may be retried.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CoreError> for ApiError {
  fn from(e: CoreError) -> Self {
    match e {
      CoreError::PlanNotFound(_) => ApiError::NotFound("Sales plan not found".into()),
      CoreError::RowNotFound { .. } => ApiError::NotFound(e.to_string()),
      CoreError::Validation(fields) => ApiError::Validation(fields),
      CoreError::InvalidTransition { .. }
      | CoreError::InvalidWorkflowTransition { .. } => ApiError::Conflict(e.to_string()),
      CoreError::Stale(_) => ApiError::PreconditionFailed(e.to_string()),
      CoreError::Store(inner) => ApiError::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Validation(fields) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": self.to_string(), "fields": fields }),
      ),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::PreconditionFailed(m) => {
        (StatusCode::PRECONDITION_FAILED, json!({ "error": m }))
      }
      ApiError::Store(e) => {
        warn!(error = %e, "store call failed");
        (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": e.to_string() }))
      }
    };
    (status, Json(body)).into_response()
  }
}
