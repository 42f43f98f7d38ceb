//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision, so lexical order is chronological order. Enumerations are
//! stored by their `strum` names. UUIDs are stored as hyphenated lowercase
//! strings.

use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use uuid::Uuid;

use salesplan_core::{
  plan::{Period, Plan, PlanRow, WorkflowStatus},
  review::RowStatus,
  roles::RoleSet,
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time, truncated to the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

fn decode_named<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode { column, value: s.to_owned() })
}

pub fn decode_period(s: &str) -> Result<Period> {
  decode_named("planning_period", s)
}

pub fn decode_workflow_status(s: &str) -> Result<WorkflowStatus> {
  decode_named("sales_plans.status", s)
}

pub fn decode_row_status(s: &str) -> Result<RowStatus> {
  decode_named("row_statuses.status", s)
}

pub fn decode_ordinal(n: i64) -> Result<usize> {
  usize::try_from(n)
    .map_err(|_| Error::Decode { column: "row_statuses.ordinal", value: n.to_string() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `sales_plans` row.
pub struct RawPlan {
  pub id:         String,
  pub country:    String,
  pub year:       String,
  pub status:     String,
  pub user_email: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawPlan {
  pub const COLUMNS: &'static str =
    "id, country, year, status, user_email, created_at, updated_at";

  pub fn from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         r.get(0)?,
      country:    r.get(1)?,
      year:       r.get(2)?,
      status:     r.get(3)?,
      user_email: r.get(4)?,
      created_at: r.get(5)?,
      updated_at: r.get(6)?,
    })
  }

  pub fn into_plan(self, rows: Vec<RawRow>) -> Result<Plan> {
    Ok(Plan {
      id:         decode_uuid(&self.id)?,
      country:    self.country,
      year:       self.year,
      status:     decode_workflow_status(&self.status)?,
      user:       self.user_email,
      rows:       rows.into_iter().map(RawRow::into_row).collect::<Result<_>>()?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `sales_plan_rows` row.
pub struct RawRow {
  pub plan_id:         String,
  pub planning_period: String,
  pub hfb:             Option<String>,
  pub sales_goal:      f64,
  pub actual_sales:    f64,
  pub variance:        f64,
  pub qty:             Option<f64>,
}

impl RawRow {
  pub const COLUMNS: &'static str =
    "plan_id, planning_period, hfb, sales_goal, actual_sales, variance, qty";

  pub fn from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      plan_id:         r.get(0)?,
      planning_period: r.get(1)?,
      hfb:             r.get(2)?,
      sales_goal:      r.get(3)?,
      actual_sales:    r.get(4)?,
      variance:        r.get(5)?,
      qty:             r.get(6)?,
    })
  }

  pub fn into_row(self) -> Result<PlanRow> {
    Ok(PlanRow {
      planning_period: decode_period(&self.planning_period)?,
      hfb:             self.hfb,
      sales_goal:      self.sales_goal,
      actual_sales:    self.actual_sales,
      variance:        self.variance,
      qty:             self.qty,
    })
  }
}

/// Pair each raw plan with its rows, preserving the plan order.
pub fn assemble(plans: Vec<RawPlan>, rows: Vec<RawRow>) -> Result<Vec<Plan>> {
  let mut by_plan: HashMap<String, Vec<RawRow>> = HashMap::new();
  for row in rows {
    by_plan.entry(row.plan_id.clone()).or_default().push(row);
  }
  plans
    .into_iter()
    .map(|p| {
      let rows = by_plan.remove(&p.id).unwrap_or_default();
      p.into_plan(rows)
    })
    .collect()
}

/// Raw values read directly from a `user_roles` row.
pub struct RawRoles {
  pub user_email: String,
  pub input_user: bool,
  pub reviewer:   bool,
  pub admin:      bool,
}

impl RawRoles {
  pub fn from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_email: r.get(0)?,
      input_user: r.get(1)?,
      reviewer:   r.get(2)?,
      admin:      r.get(3)?,
    })
  }

  pub fn into_roles(self) -> (String, RoleSet) {
    let roles = RoleSet {
      input_user: self.input_user,
      reviewer:   self.reviewer,
      admin:      self.admin,
    };
    (self.user_email, roles)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let whole = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let fractional = Utc.timestamp_opt(1_700_000_000, 500_000_000).unwrap();
    assert_eq!(encode_dt(whole).len(), encode_dt(fractional).len());
    assert!(encode_dt(whole) < encode_dt(fractional));
    assert_eq!(decode_dt(&encode_dt(fractional)).unwrap(), fractional);
  }

  #[test]
  fn unknown_enum_values_name_their_column() {
    let err = decode_row_status("archived").unwrap_err();
    assert!(err.to_string().contains("row_statuses.status"));
    assert_eq!(decode_period("t2").unwrap(), Period::T2);
  }
}
