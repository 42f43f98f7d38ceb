//! Storage traits consumed by the review engine and the aggregation service.
//!
//! Three independent stores back the application:
//!
//! - [`PlanStore`] persists plans and their rows.
//! - [`RowStatusStore`] maps [`RowKey`]s to review statuses.
//! - [`RoleStore`] maps users to their [`RoleSet`].
//!
//! A single backend may implement all three (`salesplan-store-sqlite` does).
//! Higher layers depend on these abstractions only.

use std::{collections::BTreeMap, future::Future};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  plan::{Plan, PlanDraft, WorkflowStatus},
  review::{RowKey, RowStatus},
  roles::RoleSet,
};

// ─── Plans ───────────────────────────────────────────────────────────────────

/// Result of [`PlanStore::update_plan`].
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
  Updated(Plan),
  NotFound,
  /// The `if_match` ETag did not match; nothing was written.
  Stale { current_etag: String },
}

/// Persistence for plans and their nested rows.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait PlanStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All plans with their rows, most recently updated first.
  fn list_plans(
    &self,
  ) -> impl Future<Output = Result<Vec<Plan>, Self::Error>> + Send + '_;

  /// Plans whose workflow status is `status`, most recently updated first.
  fn list_plans_by_status(
    &self,
    status: WorkflowStatus,
  ) -> impl Future<Output = Result<Vec<Plan>, Self::Error>> + Send + '_;

  /// Retrieve a plan by id. Returns `None` if not found.
  fn get_plan(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Plan>, Self::Error>> + Send + '_;

  /// Persist a new plan. The id and both timestamps are assigned by the
  /// store.
  fn create_plan(
    &self,
    draft: PlanDraft,
  ) -> impl Future<Output = Result<Plan, Self::Error>> + Send + '_;

  /// Replace a plan's fields and its entire row list in one transaction.
  ///
  /// When `if_match` is set, the write only happens if it equals the stored
  /// plan's [`crate::etag::plan_etag`]; the comparison is part of the same
  /// transaction.
  fn update_plan(
    &self,
    id: Uuid,
    draft: PlanDraft,
    if_match: Option<String>,
  ) -> impl Future<Output = Result<UpdateOutcome, Self::Error>> + Send + '_;

  /// Delete a plan and its rows. Returns `false` if it did not exist.
  fn delete_plan(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete every plan and row. Returns the number of plans removed.
  fn clear_all(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── Row statuses ────────────────────────────────────────────────────────────

/// Handle returned by [`RowStatusStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A committed mutation of the row status store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusChange {
  Set {
    key:      RowKey,
    status:   RowStatus,
    revision: u64,
  },
  Removed { key: RowKey, revision: u64 },
  Cleared { revision: u64 },
}

impl StatusChange {
  pub fn revision(&self) -> u64 {
    match self {
      Self::Set { revision, .. }
      | Self::Removed { revision, .. }
      | Self::Cleared { revision } => *revision,
    }
  }
}

/// A point-in-time copy of every stored status.
///
/// `revision` increases with every mutation, so two snapshots with the same
/// revision hold the same statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
  pub revision: u64,
  pub statuses: BTreeMap<RowKey, RowStatus>,
}

impl StatusSnapshot {
  /// The effective status of `key`: the stored value, or pending.
  pub fn effective(&self, key: RowKey) -> RowStatus {
    self.statuses.get(&key).copied().unwrap_or_default()
  }
}

/// Durable, process-wide map from [`RowKey`] to [`RowStatus`].
///
/// The store does not check transition legality; that is the review
/// engine's job.
pub trait RowStatusStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The effective status of `key`; pending if absent.
  fn get_status(
    &self,
    key: RowKey,
  ) -> impl Future<Output = Result<RowStatus, Self::Error>> + Send + '_;

  /// Upsert the status of `key`.
  fn set_status(
    &self,
    key: RowKey,
    status: RowStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete `key`, reverting it to pending. Returns `false` if it was absent.
  fn remove_status(
    &self,
    key: RowKey,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<StatusSnapshot, Self::Error>> + Send + '_;

  /// Delete every stored status.
  fn clear_statuses(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Register `callback` to run after every committed mutation.
  fn subscribe(
    &self,
    callback: Box<dyn Fn(&StatusChange) + Send + Sync>,
  ) -> SubscriptionId;

  /// Returns `false` if `id` was not subscribed.
  fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

// ─── Roles ───────────────────────────────────────────────────────────────────

/// Persistence for user → role assignments.
pub trait RoleStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Roles held by `user`, or `None` if the user has no record.
  fn get_roles<'a>(
    &'a self,
    user: &'a str,
  ) -> impl Future<Output = Result<Option<RoleSet>, Self::Error>> + Send + 'a;

  /// Every user with a record, keyed by user.
  fn list_roles(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, RoleSet>, Self::Error>>
  + Send
  + '_;

  /// Upsert the roles held by `user`.
  fn set_roles<'a>(
    &'a self,
    user: &'a str,
    roles: RoleSet,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
