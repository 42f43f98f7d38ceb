//! Handlers for the derived views.
//!
//! Every view accepts the same optional filters: `year`, `country`, `hfb`
//! and `status`, where `All` or an empty value disables the filter.

use axum::{
  Json,
  extract::{Query, State},
};
use salesplan_core::views::{
  EditorView, PublishedReport, ReviewerQueue, StatusCounts, ViewFilter,
};
use serde::Deserialize;

use crate::{ApiState, Backend, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct EditorParams {
  pub user: String,
}

/// `GET /views/editor?user=<user>[&year=..&country=..&hfb=..&status=..]`
pub async fn editor<S: Backend>(
  State(state): State<ApiState<S>>,
  Query(params): Query<EditorParams>,
  Query(filter): Query<ViewFilter>,
) -> Result<Json<EditorView>, ApiError> {
  let user = params.user.trim();
  if user.is_empty() {
    return Err(ApiError::BadRequest("user is required".into()));
  }
  Ok(Json(state.views.editor_view(user, &filter).await?))
}

/// `GET /views/review`
pub async fn review<S: Backend>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<ViewFilter>,
) -> Result<Json<ReviewerQueue>, ApiError> {
  Ok(Json(state.views.reviewer_queue(&filter).await?))
}

/// `GET /views/published`
pub async fn published<S: Backend>(
  State(state): State<ApiState<S>>,
  Query(filter): Query<ViewFilter>,
) -> Result<Json<PublishedReport>, ApiError> {
  Ok(Json(state.views.published_report(&filter).await?))
}

/// `GET /views/counts`: counts over every row of every plan.
pub async fn counts<S: Backend>(
  State(state): State<ApiState<S>>,
) -> Result<Json<StatusCounts>, ApiError> {
  Ok(Json(state.views.counts().await?))
}
