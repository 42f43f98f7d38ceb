//! [`SqliteStore`]: the SQLite implementation of [`PlanStore`].

use std::{path::Path, sync::Arc};

use tracing::debug;
use uuid::Uuid;

use salesplan_core::{
  etag::{etags_match, plan_etag},
  notify::Observers,
  plan::{Plan, PlanDraft, PlanRow, WorkflowStatus},
  store::{PlanStore, UpdateOutcome},
};

use crate::{
  Error, Result,
  encode::{RawPlan, RawRow, assemble, encode_dt, encode_uuid, now},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A sales-plan store backed by a single SQLite file.
///
/// Implements [`PlanStore`], [`salesplan_core::store::RowStatusStore`] and
/// [`salesplan_core::store::RoleStore`]. Cloning is cheap: the connection
/// and the observer registry are reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:      tokio_rusqlite::Connection,
  pub(crate) observers: Arc<Observers>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, observers: Arc::new(Observers::new()) })
  }

  async fn select_plans(
    &self,
    status: Option<WorkflowStatus>,
    id: Option<Uuid>,
  ) -> Result<Vec<Plan>> {
    let status_str = status.map(|s| s.as_ref().to_owned());
    let id_str = id.map(encode_uuid);

    let (plans, rows) = self
      .conn
      .call(move |conn| {
        Ok(load_raw(conn, status_str.as_deref(), id_str.as_deref())?)
      })
      .await?;

    assemble(plans, rows)
  }
}

// ─── Helpers run on the connection thread ────────────────────────────────────

/// Read plans (optionally filtered by status or id) and the rows that belong
/// to them, newest first.
fn load_raw(
  conn: &rusqlite::Connection,
  status: Option<&str>,
  id: Option<&str>,
) -> rusqlite::Result<(Vec<RawPlan>, Vec<RawRow>)> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM sales_plans
     WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR id = ?2)
     ORDER BY updated_at DESC, id",
    RawPlan::COLUMNS
  ))?;
  let plans = stmt
    .query_map(rusqlite::params![status, id], RawPlan::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM sales_plan_rows
     WHERE (?1 IS NULL OR plan_id = ?1)
     ORDER BY plan_id, row_order",
    RawRow::COLUMNS
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![id], RawRow::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok((plans, rows))
}

fn insert_rows(
  tx: &rusqlite::Transaction<'_>,
  plan_id: &str,
  rows: &[PlanRow],
) -> rusqlite::Result<()> {
  let mut stmt = tx.prepare(
    "INSERT INTO sales_plan_rows
       (plan_id, row_order, planning_period, hfb, sales_goal, actual_sales, variance, qty)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
  )?;
  for (order, row) in rows.iter().enumerate() {
    stmt.execute(rusqlite::params![
      plan_id,
      order as i64,
      row.planning_period.as_ref(),
      row.hfb,
      row.sales_goal,
      row.actual_sales,
      row.variance,
      row.qty,
    ])?;
  }
  Ok(())
}

// ─── PlanStore impl ──────────────────────────────────────────────────────────

impl PlanStore for SqliteStore {
  type Error = Error;

  async fn list_plans(&self) -> Result<Vec<Plan>> {
    self.select_plans(None, None).await
  }

  async fn list_plans_by_status(&self, status: WorkflowStatus) -> Result<Vec<Plan>> {
    self.select_plans(Some(status), None).await
  }

  async fn get_plan(&self, id: Uuid) -> Result<Option<Plan>> {
    Ok(self.select_plans(None, Some(id)).await?.into_iter().next())
  }

  async fn create_plan(&self, draft: PlanDraft) -> Result<Plan> {
    let ts = now();
    let plan = Plan {
      id:         Uuid::new_v4(),
      country:    draft.country,
      year:       draft.year,
      status:     draft.status,
      user:       draft.user,
      rows:       draft.rows,
      created_at: ts,
      updated_at: ts,
    };

    let id_str = encode_uuid(plan.id);
    let ts_str = encode_dt(ts);
    let record = plan.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO sales_plans
             (id, country, year, status, user_email, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![
            id_str,
            record.country,
            record.year,
            record.status.as_ref(),
            record.user,
            ts_str,
          ],
        )?;
        insert_rows(&tx, &id_str, &record.rows)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    debug!(plan_id = %plan.id, rows = plan.rows.len(), "inserted plan");
    Ok(plan)
  }

  async fn update_plan(
    &self,
    id: Uuid,
    draft: PlanDraft,
    if_match: Option<String>,
  ) -> Result<UpdateOutcome> {
    let id_str = encode_uuid(id);
    let ts = now();
    let ts_str = encode_dt(ts);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let (mut plans, rows) = load_raw(&tx, None, Some(&id_str))?;
        let Some(raw) = plans.pop() else {
          return Ok(UpdateOutcome::NotFound);
        };
        let current = raw.into_plan(rows).map_err(Error::into_call_error)?;

        if let Some(expected) = if_match {
          let current_etag = plan_etag(&current);
          if !etags_match(&expected, &current_etag) {
            return Ok(UpdateOutcome::Stale { current_etag });
          }
        }

        tx.execute(
          "UPDATE sales_plans
           SET country = ?2, year = ?3, status = ?4, user_email = ?5, updated_at = ?6
           WHERE id = ?1",
          rusqlite::params![
            id_str,
            draft.country,
            draft.year,
            draft.status.as_ref(),
            draft.user,
            ts_str,
          ],
        )?;
        tx.execute(
          "DELETE FROM sales_plan_rows WHERE plan_id = ?1",
          rusqlite::params![id_str],
        )?;
        insert_rows(&tx, &id_str, &draft.rows)?;
        tx.commit()?;

        Ok(UpdateOutcome::Updated(Plan {
          id,
          country: draft.country,
          year: draft.year,
          status: draft.status,
          user: draft.user,
          rows: draft.rows,
          created_at: current.created_at,
          updated_at: ts,
        }))
      })
      .await
      .map_err(Error::from)
  }

  async fn delete_plan(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM sales_plan_rows WHERE plan_id = ?1",
          rusqlite::params![id_str],
        )?;
        let n = tx.execute(
          "DELETE FROM sales_plans WHERE id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;
    Ok(deleted)
  }

  async fn clear_all(&self) -> Result<usize> {
    let removed = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sales_plan_rows", [])?;
        let n = tx.execute("DELETE FROM sales_plans", [])?;
        tx.commit()?;
        Ok(n)
      })
      .await?;
    Ok(removed)
  }
}
