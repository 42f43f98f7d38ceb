//! Handlers for `/sales-plans` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/sales-plans` | Newest-updated first |
//! | `POST`   | `/sales-plans` | Body: [`PlanInput`]; 201 |
//! | `DELETE` | `/sales-plans` | Clears every plan and row status |
//! | `GET`    | `/sales-plans/status/:status` | Filter by workflow status |
//! | `GET`    | `/sales-plans/:id` | Sets `ETag` |
//! | `PUT`    | `/sales-plans/:id` | Honours `If-Match`; 412 on mismatch |
//! | `DELETE` | `/sales-plans/:id` | 404 if not found |
//! | `POST`   | `/sales-plans/:id/workflow` | Body: `{"action":"submit"}` |

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use salesplan_core::{
  etag::plan_etag,
  plan::{Plan, PlanInput, WorkflowAction, WorkflowStatus},
  store::PlanStore,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{ApiState, Backend, error::ApiError};

/// The `If-Match` header, unless absent or `*`.
fn if_match(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
  match headers.get(header::IF_MATCH) {
    None => Ok(None),
    Some(v) => {
      let v = v
        .to_str()
        .map_err(|_| ApiError::BadRequest("If-Match is not valid ASCII".into()))?
        .trim();
      Ok((v != "*").then(|| v.to_owned()))
    }
  }
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /sales-plans`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Plan>>, ApiError> {
  let plans = state
    .store
    .list_plans()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(plans))
}

/// `GET /sales-plans/status/:status`
pub async fn list_by_status<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(status): Path<WorkflowStatus>,
) -> Result<Json<Vec<Plan>>, ApiError> {
  let plans = state
    .store
    .list_plans_by_status(status)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(plans))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /sales-plans/:id`
pub async fn get_one<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
  let plan = state
    .store
    .get_plan(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound("Sales plan not found".into()))?;
  let etag = plan_etag(&plan);
  Ok(([(header::ETAG, etag)], Json(plan)))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// `POST /sales-plans`
pub async fn create<S: Backend>(
  State(state): State<ApiState<S>>,
  Json(input): Json<PlanInput>,
) -> Result<impl IntoResponse, ApiError> {
  let plan = state.engine.create_plan(&input).await?;
  Ok((
    StatusCode::CREATED,
    [(header::ETAG, plan_etag(&plan))],
    Json(json!({ "id": plan.id, "message": "Sales plan created successfully" })),
  ))
}

/// `PUT /sales-plans/:id` replaces every field and the full row list.
pub async fn update<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
  Json(input): Json<PlanInput>,
) -> Result<impl IntoResponse, ApiError> {
  let expected = if_match(&headers)?;
  let plan = state.engine.update_plan(id, &input, expected).await?;
  Ok((
    [(header::ETAG, plan_etag(&plan))],
    Json(json!({ "message": "Sales plan updated successfully" })),
  ))
}

/// `DELETE /sales-plans/:id`
pub async fn delete_one<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
  state.engine.delete_plan(id).await?;
  Ok(Json(json!({ "message": "Sales plan deleted successfully" })))
}

/// `DELETE /sales-plans`: a reset utility for tests and demos.
pub async fn clear<S: Backend>(
  State(state): State<ApiState<S>>,
) -> Result<impl IntoResponse, ApiError> {
  let deleted = state.engine.clear_all().await?;
  Ok(Json(json!({
    "message": "All sales plans deleted successfully",
    "deleted": deleted,
  })))
}

// ─── Workflow ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WorkflowBody {
  pub action: WorkflowAction,
}

/// `POST /sales-plans/:id/workflow`, body: `{"action":"submit"}`
pub async fn workflow<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<WorkflowBody>,
) -> Result<impl IntoResponse, ApiError> {
  let plan = state.engine.transition_workflow(id, body.action).await?;
  Ok(([(header::ETAG, plan_etag(&plan))], Json(plan)))
}
