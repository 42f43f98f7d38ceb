//! [`AggregationService`]: loads plans and statuses, then derives views.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
  Error, Result,
  plan::Plan,
  store::{PlanStore, RowStatusStore, StatusSnapshot},
  views::{
    self, EditorView, PublishedReport, ReviewerQueue, StatusCounts, ViewFilter,
  },
};

/// Computes the editor, reviewer and published views on demand.
///
/// Obtained from [`crate::engine::ReviewEngine::aggregation`] so that reads
/// and the engine's writes are serialised by the same gate.
pub struct AggregationService<P, S> {
  plans:    Arc<P>,
  statuses: Arc<S>,
  gate:     Arc<RwLock<()>>,
}

impl<P, S> Clone for AggregationService<P, S> {
  fn clone(&self) -> Self {
    Self {
      plans:    Arc::clone(&self.plans),
      statuses: Arc::clone(&self.statuses),
      gate:     Arc::clone(&self.gate),
    }
  }
}

impl<P, S> AggregationService<P, S>
where
  P: PlanStore,
  S: RowStatusStore,
{
  pub(crate) fn new(plans: Arc<P>, statuses: Arc<S>, gate: Arc<RwLock<()>>) -> Self {
    Self { plans, statuses, gate }
  }

  /// A consistent pair of plan list and status snapshot.
  async fn load(&self) -> Result<(Vec<Plan>, StatusSnapshot)> {
    let _gate = self.gate.read().await;
    let plans = self.plans.list_plans().await.map_err(Error::store)?;
    let statuses = self.statuses.snapshot().await.map_err(Error::store)?;
    debug!(plans = plans.len(), revision = statuses.revision, "loaded view inputs");
    Ok((plans, statuses))
  }

  pub async fn editor_view(&self, user: &str, filter: &ViewFilter) -> Result<EditorView> {
    let (plans, statuses) = self.load().await?;
    Ok(views::editor_view(&plans, &statuses, user, filter))
  }

  pub async fn reviewer_queue(&self, filter: &ViewFilter) -> Result<ReviewerQueue> {
    let (plans, statuses) = self.load().await?;
    Ok(views::reviewer_queue(&plans, &statuses, filter))
  }

  pub async fn published_report(&self, filter: &ViewFilter) -> Result<PublishedReport> {
    let (plans, statuses) = self.load().await?;
    Ok(views::published_report(&plans, &statuses, filter))
  }

  /// Counts over the entire row population.
  pub async fn counts(&self) -> Result<StatusCounts> {
    let (plans, statuses) = self.load().await?;
    Ok(views::status_counts(&plans, &statuses))
  }
}
