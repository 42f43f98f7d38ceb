//! [`RowStatusStore`] for [`SqliteStore`].
//!
//! Every mutation bumps `status_revision` inside the same transaction and
//! notifies subscribers once the transaction has committed.

use std::collections::BTreeMap;

use rusqlite::OptionalExtension as _;
use tracing::debug;

use salesplan_core::{
  review::{RowKey, RowStatus},
  store::{RowStatusStore, StatusChange, StatusSnapshot, SubscriptionId},
};

use crate::{
  Error, Result,
  encode::{decode_ordinal, decode_row_status, decode_uuid, encode_dt, encode_uuid, now},
  store::SqliteStore,
};

fn bump_revision(tx: &rusqlite::Transaction<'_>) -> rusqlite::Result<u64> {
  tx.execute("UPDATE status_revision SET revision = revision + 1 WHERE id = 1", [])?;
  let revision: i64 =
    tx.query_row("SELECT revision FROM status_revision WHERE id = 1", [], |r| r.get(0))?;
  Ok(revision as u64)
}

impl SqliteStore {
  fn notify_change(&self, change: StatusChange) {
    debug!(revision = change.revision(), "status change committed");
    self.observers.notify(&change);
  }
}

impl RowStatusStore for SqliteStore {
  type Error = Error;

  async fn get_status(&self, key: RowKey) -> Result<RowStatus> {
    let plan_id = encode_uuid(key.plan_id);
    let ordinal = key.ordinal as i64;
    let stored: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT status FROM row_statuses WHERE plan_id = ?1 AND ordinal = ?2",
              rusqlite::params![plan_id, ordinal],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    stored.as_deref().map(decode_row_status).transpose().map(Option::unwrap_or_default)
  }

  async fn set_status(&self, key: RowKey, status: RowStatus) -> Result<()> {
    let plan_id = encode_uuid(key.plan_id);
    let ordinal = key.ordinal as i64;
    let ts_str = encode_dt(now());

    let revision = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO row_statuses (plan_id, ordinal, status, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (plan_id, ordinal)
           DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
          rusqlite::params![plan_id, ordinal, status.as_ref(), ts_str],
        )?;
        let revision = bump_revision(&tx)?;
        tx.commit()?;
        Ok(revision)
      })
      .await?;

    self.notify_change(StatusChange::Set { key, status, revision });
    Ok(())
  }

  async fn remove_status(&self, key: RowKey) -> Result<bool> {
    let plan_id = encode_uuid(key.plan_id);
    let ordinal = key.ordinal as i64;

    let revision = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "DELETE FROM row_statuses WHERE plan_id = ?1 AND ordinal = ?2",
          rusqlite::params![plan_id, ordinal],
        )?;
        if n == 0 {
          return Ok(None);
        }
        let revision = bump_revision(&tx)?;
        tx.commit()?;
        Ok(Some(revision))
      })
      .await?;

    match revision {
      Some(revision) => {
        self.notify_change(StatusChange::Removed { key, revision });
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn snapshot(&self) -> Result<StatusSnapshot> {
    let (revision, raw) = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let revision: i64 = tx.query_row(
          "SELECT revision FROM status_revision WHERE id = 1",
          [],
          |r| r.get(0),
        )?;
        let raw = {
          let mut stmt =
            tx.prepare("SELECT plan_id, ordinal, status FROM row_statuses")?;
          stmt
            .query_map([], |r| {
              Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?, r.get::<_, String>(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok((revision as u64, raw))
      })
      .await?;

    let mut statuses = BTreeMap::new();
    for (plan_id, ordinal, status) in raw {
      let key = RowKey::new(decode_uuid(&plan_id)?, decode_ordinal(ordinal)?);
      statuses.insert(key, decode_row_status(&status)?);
    }
    Ok(StatusSnapshot { revision, statuses })
  }

  async fn clear_statuses(&self) -> Result<()> {
    let revision = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM row_statuses", [])?;
        let revision = bump_revision(&tx)?;
        tx.commit()?;
        Ok(revision)
      })
      .await?;

    self.notify_change(StatusChange::Cleared { revision });
    Ok(())
  }

  fn subscribe(
    &self,
    callback: Box<dyn Fn(&StatusChange) + Send + Sync>,
  ) -> SubscriptionId {
    self.observers.subscribe(callback)
  }

  fn unsubscribe(&self, id: SubscriptionId) -> bool {
    self.observers.unsubscribe(id)
  }
}
