//! The review engine: the single writer for plans and row statuses.
//!
//! Every mutation holds the write side of a gate shared with
//! [`AggregationService`], whose view computations hold the read side. A
//! view therefore never observes a plan write without the status change
//! that belongs to it.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::AggregationService,
  etag::plan_etag,
  plan::{Plan, PlanDraft, PlanInput, RowInput, WorkflowAction},
  review::{ReviewAction, RowKey, RowStatus},
  store::{PlanStore, RowStatusStore, UpdateOutcome},
};

pub struct ReviewEngine<P, S> {
  plans:    Arc<P>,
  statuses: Arc<S>,
  gate:     Arc<RwLock<()>>,
}

impl<P, S> Clone for ReviewEngine<P, S> {
  fn clone(&self) -> Self {
    Self {
      plans:    Arc::clone(&self.plans),
      statuses: Arc::clone(&self.statuses),
      gate:     Arc::clone(&self.gate),
    }
  }
}

impl<P, S> ReviewEngine<P, S>
where
  P: PlanStore,
  S: RowStatusStore,
{
  pub fn new(plans: Arc<P>, statuses: Arc<S>) -> Self {
    Self { plans, statuses, gate: Arc::new(RwLock::new(())) }
  }

  /// An aggregation service reading through this engine's gate.
  pub fn aggregation(&self) -> AggregationService<P, S> {
    AggregationService::new(
      Arc::clone(&self.plans),
      Arc::clone(&self.statuses),
      Arc::clone(&self.gate),
    )
  }

  pub fn plan_store(&self) -> &P { &self.plans }

  pub fn status_store(&self) -> &S { &self.statuses }

  async fn require_plan(&self, id: Uuid) -> Result<Plan> {
    self
      .plans
      .get_plan(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::PlanNotFound(id))
  }

  async fn write_status(&self, key: RowKey, status: RowStatus) -> Result<()> {
    if status == RowStatus::Pending {
      self.statuses.remove_status(key).await.map_err(Error::store)?;
    } else {
      self.statuses.set_status(key, status).await.map_err(Error::store)?;
    }
    Ok(())
  }

  async fn store_update(
    &self,
    id: Uuid,
    draft: PlanDraft,
    if_match: Option<String>,
  ) -> Result<Plan> {
    match self.plans.update_plan(id, draft, if_match).await.map_err(Error::store)? {
      UpdateOutcome::Updated(plan) => Ok(plan),
      UpdateOutcome::NotFound => Err(Error::PlanNotFound(id)),
      UpdateOutcome::Stale { .. } => Err(Error::Stale(id)),
    }
  }

  /// Put `previous` back after a status write failed half-way through a
  /// combined operation.
  async fn restore(&self, previous: &Plan) {
    if let Err(e) = self.plans.update_plan(previous.id, previous.to_draft(), None).await {
      error!(plan_id = %previous.id, error = %e, "failed to restore plan after status write error");
    }
  }

  /// Write back statuses that were already cleared before a later write in
  /// the same operation failed.
  async fn reinstate(&self, cleared: &[(RowKey, RowStatus)]) {
    for &(key, status) in cleared {
      if let Err(e) = self.statuses.set_status(key, status).await {
        error!(%key, %status, error = %e, "failed to reinstate row status");
      }
    }
  }

  // ── Plan writes ───────────────────────────────────────────────────────────

  /// Validate `input` and persist it as a new plan.
  pub async fn create_plan(&self, input: &PlanInput) -> Result<Plan> {
    let draft = input.validate()?;
    let _gate = self.gate.write().await;
    let plan = self.plans.create_plan(draft).await.map_err(Error::store)?;
    info!(plan_id = %plan.id, country = %plan.country, year = %plan.year, rows = plan.rows.len(), "created plan");
    Ok(plan)
  }

  /// Replace a plan's content and full row list.
  ///
  /// Statuses are keyed by ordinal, so any ordinal whose content changed,
  /// including by a shift after a removal, loses its status and returns to
  /// pending in the same critical section. Published rows are
  /// read-only: a change at a published ordinal is rejected before anything
  /// is written.
  pub async fn update_plan(
    &self,
    id: Uuid,
    input: &PlanInput,
    if_match: Option<String>,
  ) -> Result<Plan> {
    let draft = input.validate()?;
    let _gate = self.gate.write().await;
    let previous = self.require_plan(id).await?;
    let snapshot = self.statuses.snapshot().await.map_err(Error::store)?;

    let mut cleared = Vec::new();
    for (ordinal, old) in previous.rows.iter().enumerate() {
      let key = RowKey::new(id, ordinal);
      let status = snapshot.effective(key);
      if status == RowStatus::Pending || draft.rows.get(ordinal) == Some(old) {
        continue;
      }
      if !status.is_revisable() {
        warn!(%key, %status, "rejected plan edit touching a published row");
        return Err(Error::InvalidTransition {
          from:   status,
          action: ReviewAction::Resubmit,
        });
      }
      cleared.push((key, status));
    }

    let updated = self.store_update(id, draft, if_match).await?;

    for (n, &(key, _)) in cleared.iter().enumerate() {
      if let Err(e) = self.statuses.remove_status(key).await {
        warn!(%key, error = %e, "status reset failed; restoring previous plan");
        self.reinstate(&cleared[..n]).await;
        self.restore(&previous).await;
        return Err(Error::store(e));
      }
      info!(%key, "row status reset after edit");
    }

    info!(plan_id = %id, rows = updated.rows.len(), "updated plan");
    Ok(updated)
  }

  pub async fn delete_plan(&self, id: Uuid) -> Result<()> {
    let _gate = self.gate.write().await;
    if !self.plans.delete_plan(id).await.map_err(Error::store)? {
      return Err(Error::PlanNotFound(id));
    }
    info!(plan_id = %id, "deleted plan");
    Ok(())
  }

  /// Remove every plan and every row status. Returns the number of plans
  /// deleted.
  pub async fn clear_all(&self) -> Result<usize> {
    let _gate = self.gate.write().await;
    let removed = self.plans.clear_all().await.map_err(Error::store)?;
    self.statuses.clear_statuses().await.map_err(Error::store)?;
    warn!(plans = removed, "cleared all plans and row statuses");
    Ok(removed)
  }

  /// Move a plan along its workflow graph.
  pub async fn transition_workflow(
    &self,
    id: Uuid,
    action: WorkflowAction,
  ) -> Result<Plan> {
    let _gate = self.gate.write().await;
    let plan = self.require_plan(id).await?;
    let to = plan.status.apply(action).inspect_err(|e| {
      warn!(plan_id = %id, error = %e, "rejected workflow transition");
    })?;
    let mut draft = plan.to_draft();
    draft.status = to;
    let updated = self.store_update(id, draft, Some(plan_etag(&plan))).await?;
    info!(plan_id = %id, from = %plan.status, %to, "workflow status changed");
    Ok(updated)
  }

  // ── Row review ────────────────────────────────────────────────────────────

  /// The effective status of an existing row.
  pub async fn status(&self, key: RowKey) -> Result<RowStatus> {
    let _gate = self.gate.read().await;
    self.require_plan(key.plan_id).await?.row(key.ordinal)?;
    self.statuses.get_status(key).await.map_err(Error::store)
  }

  /// Apply `action` to the row at `key`, returning its new status.
  ///
  /// Illegal moves fail with [`Error::InvalidTransition`] and leave the
  /// stored status untouched. A reset of a pending row is a no-op.
  pub async fn apply(&self, key: RowKey, action: ReviewAction) -> Result<RowStatus> {
    let _gate = self.gate.write().await;
    self.require_plan(key.plan_id).await?.row(key.ordinal)?;

    let from = self.statuses.get_status(key).await.map_err(Error::store)?;
    let to = from.apply(action).inspect_err(|e| {
      warn!(%key, error = %e, "rejected row transition");
    })?;

    if to != from {
      self.write_status(key, to).await?;
      info!(%key, %from, %to, "row status changed");
    }
    Ok(to)
  }

  pub async fn approve(&self, key: RowKey) -> Result<RowStatus> {
    self.apply(key, ReviewAction::Approve).await
  }

  pub async fn deny(&self, key: RowKey) -> Result<RowStatus> {
    self.apply(key, ReviewAction::Deny).await
  }

  pub async fn publish(&self, key: RowKey) -> Result<RowStatus> {
    self.apply(key, ReviewAction::Publish).await
  }

  pub async fn reset(&self, key: RowKey) -> Result<RowStatus> {
    self.apply(key, ReviewAction::Reset).await
  }

  /// Return a denied row to pending without changing its values.
  pub async fn resubmit(&self, key: RowKey) -> Result<RowStatus> {
    self.apply(key, ReviewAction::Resubmit).await
  }

  /// Replace one row's values and return it to pending as one operation.
  ///
  /// The full plan is rewritten (rows are only ever replaced wholesale) and
  /// the row's status is cleared while the gate is held. If clearing the
  /// status fails, the previous plan content is written back before the
  /// error is returned. Published rows cannot be revised.
  pub async fn revise_and_resubmit(&self, key: RowKey, input: &RowInput) -> Result<Plan> {
    let row = input.validate(&format!("rows[{}]", key.ordinal))?;

    let _gate = self.gate.write().await;
    let previous = self.require_plan(key.plan_id).await?;
    previous.row(key.ordinal)?;

    let status = self.statuses.get_status(key).await.map_err(Error::store)?;
    if !status.is_revisable() {
      warn!(%key, %status, "rejected revision of a published row");
      return Err(Error::InvalidTransition {
        from:   status,
        action: ReviewAction::Resubmit,
      });
    }

    let mut draft = previous.to_draft();
    draft.rows[key.ordinal] = row;
    let updated = self
      .store_update(key.plan_id, draft, Some(plan_etag(&previous)))
      .await?;

    if status != RowStatus::Pending
      && let Err(e) = self.statuses.remove_status(key).await
    {
      warn!(%key, error = %e, "status reset failed; restoring previous row values");
      self.restore(&previous).await;
      return Err(Error::store(e));
    }

    info!(%key, from = %status, "row revised and resubmitted");
    Ok(updated)
  }
}
