//! Error types for `salesplan-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  plan::{WorkflowAction, WorkflowStatus},
  review::{ReviewAction, RowStatus},
};

/// One failed check on a submitted plan, addressed by a JSON-style path such
/// as `country` or `rows[2].salesGoal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into() }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("sales plan not found: {0}")]
  PlanNotFound(Uuid),

  #[error("row {ordinal} not found in sales plan {plan_id}")]
  RowNotFound { plan_id: Uuid, ordinal: usize },

  #[error("validation failed on {} field(s)", .0.len())]
  Validation(Vec<FieldError>),

  #[error("cannot {action} a row that is {from}")]
  InvalidTransition { from: RowStatus, action: ReviewAction },

  #[error("cannot {action} a plan that is {from}")]
  InvalidWorkflowTransition {
    from:   WorkflowStatus,
    action: WorkflowAction,
  },

  /// The caller's ETag no longer matches the stored plan.
  #[error("sales plan {0} was modified concurrently")]
  Stale(Uuid),

  /// A storage backend call failed; the operation may be retried.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
