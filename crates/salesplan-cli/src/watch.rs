//! Polling for row status changes.
//!
//! The server bumps a revision on every status mutation, so a poll whose
//! revision matches the previous one is skipped without diffing.

use std::{collections::BTreeSet, time::Duration};

use anyhow::Result;
use salesplan_core::{
  review::{RowKey, RowStatus},
  store::StatusSnapshot,
};
use tracing::warn;

use crate::client::ApiClient;

/// One row whose effective status differs between two snapshots.
#[derive(Debug, PartialEq, Eq)]
pub struct Change {
  pub key:  RowKey,
  pub from: RowStatus,
  pub to:   RowStatus,
}

/// Every key whose effective status changed from `old` to `new`.
pub fn diff(old: &StatusSnapshot, new: &StatusSnapshot) -> Vec<Change> {
  let keys: BTreeSet<RowKey> =
    old.statuses.keys().chain(new.statuses.keys()).copied().collect();
  keys
    .into_iter()
    .filter_map(|key| {
      let from = old.effective(key);
      let to = new.effective(key);
      (from != to).then_some(Change { key, from, to })
    })
    .collect()
}

/// Print status changes until interrupted.
pub async fn run(client: &ApiClient, interval: Duration) -> Result<()> {
  let mut last = client.row_statuses().await?;
  println!("watching row statuses from revision {}", last.revision);

  let mut ticker = tokio::time::interval(interval);
  ticker.tick().await;
  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => return Ok(()),
      _ = ticker.tick() => {}
    }

    let next = match client.row_statuses().await {
      Ok(next) => next,
      Err(e) => {
        warn!(error = %e, "poll failed; retrying");
        continue;
      }
    };
    if next.revision == last.revision {
      continue;
    }
    for c in diff(&last, &next) {
      println!("[{}] {}  {} → {}", next.revision, c.key, c.from, c.to);
    }
    last = next;
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  fn snapshot(revision: u64, entries: &[(RowKey, RowStatus)]) -> StatusSnapshot {
    StatusSnapshot { revision, statuses: entries.iter().copied().collect() }
  }

  #[test]
  fn removals_read_as_pending() {
    let a = RowKey::new(Uuid::nil(), 0);
    let b = RowKey::new(Uuid::nil(), 1);
    let old = snapshot(1, &[(a, RowStatus::Denied), (b, RowStatus::Approved)]);
    let new = snapshot(3, &[(b, RowStatus::Published)]);
    assert_eq!(diff(&old, &new), vec![
      Change { key: a, from: RowStatus::Denied, to: RowStatus::Pending },
      Change { key: b, from: RowStatus::Approved, to: RowStatus::Published },
    ]);
  }

  #[test]
  fn identical_snapshots_have_no_changes() {
    let a = RowKey::new(Uuid::nil(), 4);
    let s = snapshot(2, &[(a, RowStatus::Approved)]);
    assert!(diff(&s, &s).is_empty());
  }
}
