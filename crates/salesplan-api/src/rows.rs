//! Handlers for row review endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/row-statuses` | `{revision, statuses}` snapshot |
//! | `GET`  | `/sales-plans/:id/rows/:n/status` | Effective status |
//! | `POST` | `/sales-plans/:id/rows/:n/:action` | approve, deny, publish, reset, resubmit |
//! | `PUT`  | `/sales-plans/:id/rows/:n` | Revise values and resubmit |

use axum::{
  Json,
  extract::{Path, State},
  http::header,
  response::IntoResponse,
};
use salesplan_core::{
  etag::plan_etag,
  plan::RowInput,
  review::{ReviewAction, RowKey, RowStatus},
  store::{RowStatusStore, StatusSnapshot},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{ApiState, Backend, error::ApiError};

#[derive(Debug, Serialize)]
pub struct RowStatusBody {
  pub key:    RowKey,
  pub status: RowStatus,
}

/// `GET /row-statuses`
pub async fn snapshot<S: Backend>(
  State(state): State<ApiState<S>>,
) -> Result<Json<StatusSnapshot>, ApiError> {
  let snapshot = state
    .store
    .snapshot()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(snapshot))
}

/// `GET /sales-plans/:id/rows/:n/status`
pub async fn status<S: Backend>(
  State(state): State<ApiState<S>>,
  Path((id, n)): Path<(Uuid, usize)>,
) -> Result<Json<RowStatusBody>, ApiError> {
  let key = RowKey::new(id, n);
  let status = state.engine.status(key).await?;
  Ok(Json(RowStatusBody { key, status }))
}

/// `POST /sales-plans/:id/rows/:n/:action`
pub async fn transition<S: Backend>(
  State(state): State<ApiState<S>>,
  Path((id, n, action)): Path<(Uuid, usize, ReviewAction)>,
) -> Result<Json<RowStatusBody>, ApiError> {
  let key = RowKey::new(id, n);
  let status = state.engine.apply(key, action).await?;
  Ok(Json(RowStatusBody { key, status }))
}

/// `PUT /sales-plans/:id/rows/:n`, body: one row.
///
/// Replaces the row's values and returns it to pending. Responds with the
/// updated plan.
pub async fn revise<S: Backend>(
  State(state): State<ApiState<S>>,
  Path((id, n)): Path<(Uuid, usize)>,
  Json(input): Json<RowInput>,
) -> Result<impl IntoResponse, ApiError> {
  let plan = state.engine.revise_and_resubmit(RowKey::new(id, n), &input).await?;
  Ok(([(header::ETAG, plan_etag(&plan))], Json(plan)))
}
