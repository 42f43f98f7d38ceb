//! JSON REST API for the sales-planning workflow.
//!
//! Exposes an axum [`Router`] backed by any store implementing the three
//! `salesplan-core` store traits. Auth, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", salesplan_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod health;
pub mod plans;
pub mod roles;
pub mod rows;
pub mod views;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use salesplan_core::{
  AggregationService, ReviewEngine,
  store::{PlanStore, RoleStore, RowStatusStore},
};

pub use error::ApiError;

/// A single store implementing every trait the API needs.
pub trait Backend: PlanStore + RowStatusStore + RoleStore + 'static {}

impl<T> Backend for T where T: PlanStore + RowStatusStore + RoleStore + 'static {}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
///
/// There is exactly one [`ReviewEngine`] per router, so every write goes
/// through the same gate.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub engine: ReviewEngine<S, S>,
  pub views:  AggregationService<S, S>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      engine: self.engine.clone(),
      views:  self.views.clone(),
    }
  }
}

impl<S: Backend> ApiState<S> {
  pub fn new(store: Arc<S>) -> Self {
    let engine = ReviewEngine::new(Arc::clone(&store), Arc::clone(&store));
    let views = engine.aggregation();
    Self { store, engine, views }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: Backend>(store: Arc<S>) -> Router<()> {
  Router::new()
    .route("/health", get(health::handler))
    // Plans
    .route(
      "/sales-plans",
      get(plans::list::<S>).post(plans::create::<S>).delete(plans::clear::<S>),
    )
    .route("/sales-plans/status/{status}", get(plans::list_by_status::<S>))
    .route(
      "/sales-plans/{id}",
      get(plans::get_one::<S>).put(plans::update::<S>).delete(plans::delete_one::<S>),
    )
    .route("/sales-plans/{id}/workflow", post(plans::workflow::<S>))
    // Row review
    .route("/sales-plans/{id}/rows/{n}", put(rows::revise::<S>))
    .route("/sales-plans/{id}/rows/{n}/status", get(rows::status::<S>))
    .route("/sales-plans/{id}/rows/{n}/{action}", post(rows::transition::<S>))
    .route("/row-statuses", get(rows::snapshot::<S>))
    // Views
    .route("/views/editor", get(views::editor::<S>))
    .route("/views/review", get(views::review::<S>))
    .route("/views/published", get(views::published::<S>))
    .route("/views/counts", get(views::counts::<S>))
    // Roles
    .route("/roles", get(roles::list::<S>))
    .route("/roles/{user}", get(roles::get_one::<S>).put(roles::set::<S>))
    .route("/roles/{user}/tabs", get(roles::tabs::<S>))
    .with_state(ApiState::new(store))
}

#[cfg(test)]
mod tests;
