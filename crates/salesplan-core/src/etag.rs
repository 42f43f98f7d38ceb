//! ETag computation for plans.
//!
//! An ETag is a SHA-256 digest over a plan's identity, its `updated_at`
//! timestamp, its workflow status, and every row in ordinal order. Any write
//! through [`crate::store::PlanStore::update_plan`] bumps `updated_at`, so the
//! ETag changes even when the content is rewritten unchanged.

use sha2::{Digest, Sha256};

use crate::plan::Plan;

/// Compute the quoted ETag for `plan`.
pub fn plan_etag(plan: &Plan) -> String {
  let mut hasher = Sha256::new();
  hasher.update(plan.id.as_bytes());
  hasher.update(plan.updated_at.timestamp_micros().to_le_bytes());
  hasher.update(plan.status.as_ref().as_bytes());
  hasher.update(plan.country.as_bytes());
  hasher.update([0]);
  hasher.update(plan.year.as_bytes());
  hasher.update([0]);
  for row in &plan.rows {
    hasher.update(row.planning_period.as_ref().as_bytes());
    hasher.update(row.hfb_or_empty().as_bytes());
    hasher.update([0]);
    hasher.update(row.sales_goal.to_le_bytes());
    hasher.update(row.actual_sales.to_le_bytes());
    hasher.update(row.variance.to_le_bytes());
    hasher.update(row.qty.unwrap_or(f64::NAN).to_le_bytes());
  }
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Compare two ETags, accepting either with or without surrounding quotes.
pub fn etags_match(a: &str, b: &str) -> bool {
  strip_quotes(a) == strip_quotes(b)
}

fn strip_quotes(s: &str) -> &str { s.trim().trim_matches('"') }

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::plan::{Period, PlanRow, WorkflowStatus};

  fn plan() -> Plan {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Plan {
      id:         Uuid::nil(),
      country:    "Sweden".into(),
      year:       "2025".into(),
      status:     WorkflowStatus::Review,
      user:       None,
      rows:       vec![PlanRow::new(Period::T1, Some("HFB 01".into()), 10.0, 12.0, None)],
      created_at: ts,
      updated_at: ts,
    }
  }

  #[test]
  fn identical_plans_share_an_etag() {
    assert_eq!(plan_etag(&plan()), plan_etag(&plan()));
  }

  #[test]
  fn row_edits_change_the_etag() {
    let mut edited = plan();
    edited.rows[0] = PlanRow::new(Period::T1, Some("HFB 01".into()), 10.0, 13.0, None);
    assert_ne!(plan_etag(&plan()), plan_etag(&edited));
  }

  #[test]
  fn a_newer_timestamp_changes_the_etag() {
    let mut touched = plan();
    touched.updated_at += Duration::seconds(1);
    assert_ne!(plan_etag(&plan()), plan_etag(&touched));
  }

  #[test]
  fn quotes_are_optional_when_comparing() {
    let etag = plan_etag(&plan());
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    assert!(etags_match(&etag, etag.trim_matches('"')));
    assert!(!etags_match(&etag, "\"stale\""));
  }
}
