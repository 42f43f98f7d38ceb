//! Plan and row types: the persisted content of the sales-planning store.
//!
//! A [`Plan`] is one country/year submission owning an ordered list of
//! [`PlanRow`]s. A row's position in `Plan::rows` is its ordinal; ordinals are
//! dense, start at zero, and define display order everywhere.
//!
//! Callers never hand a [`Plan`] to the store directly. They submit a
//! [`PlanInput`] (the loosely-typed JSON shape), which [`PlanInput::validate`]
//! turns into a [`PlanDraft`] with every row's variance recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, FieldError, Result};

/// Largest accepted gap between a supplied variance and
/// `actualSales - salesGoal`.
pub const VARIANCE_TOLERANCE: f64 = 0.005;

// ─── Period ──────────────────────────────────────────────────────────────────

/// The planning interval of a row. Declaration order is sort order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Period {
  /// Full year.
  Fy,
  T1,
  T2,
  T3,
  // Legacy quarters, still readable from older plans.
  Q1,
  Q2,
  Q3,
  Q4,
}

impl Period {
  pub fn is_legacy_quarter(self) -> bool {
    matches!(self, Self::Q1 | Self::Q2 | Self::Q3 | Self::Q4)
  }
}

// ─── Workflow status ─────────────────────────────────────────────────────────

/// Plan-level lifecycle state. Independent of the per-row review status.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowStatus {
  #[default]
  Draft,
  Review,
  Approved,
  Published,
  Denied,
}

/// A plan-level workflow move.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowAction {
  /// Hand a draft to the reviewer.
  Submit,
  Approve,
  Deny,
  Publish,
  /// Start a new version from a decided plan.
  Revise,
}

impl WorkflowStatus {
  /// The status reached by applying `action`, or an error if the move is not
  /// an edge of the workflow graph:
  ///
  /// ```text
  /// draft     -submit->  review
  /// review    -approve-> approved
  /// review    -deny->    denied
  /// approved  -publish-> published
  /// approved | denied | published -revise-> draft
  /// ```
  pub fn apply(self, action: WorkflowAction) -> Result<Self> {
    use WorkflowAction as A;
    use WorkflowStatus as S;
    match (self, action) {
      (S::Draft, A::Submit) => Ok(S::Review),
      (S::Review, A::Approve) => Ok(S::Approved),
      (S::Review, A::Deny) => Ok(S::Denied),
      (S::Approved, A::Publish) => Ok(S::Published),
      (S::Approved | S::Denied | S::Published, A::Revise) => Ok(S::Draft),
      (from, action) => Err(Error::InvalidWorkflowTransition { from, action }),
    }
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One line item of a plan (period × HFB) with its figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRow {
  pub planning_period: Period,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hfb:             Option<String>,
  pub sales_goal:      f64,
  pub actual_sales:    f64,
  /// `actual_sales - sales_goal`, kept consistent by every writer.
  pub variance:        f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub qty:             Option<f64>,
}

impl PlanRow {
  /// Build a row with the variance derived from the two figures.
  pub fn new(
    planning_period: Period,
    hfb: Option<String>,
    sales_goal: f64,
    actual_sales: f64,
    qty: Option<f64>,
  ) -> Self {
    Self {
      planning_period,
      hfb,
      sales_goal,
      actual_sales,
      variance: actual_sales - sales_goal,
      qty,
    }
  }

  pub fn is_consistent(&self) -> bool {
    (self.actual_sales - self.sales_goal - self.variance).abs()
      <= VARIANCE_TOLERANCE
  }

  /// The HFB code, or an empty string for rows without one.
  pub fn hfb_or_empty(&self) -> &str { self.hfb.as_deref().unwrap_or("") }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// A persisted sales plan with its rows in ordinal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
  pub id:         Uuid,
  pub country:    String,
  pub year:       String,
  pub status:     WorkflowStatus,
  /// The owning user, if the plan was saved by a signed-in editor.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user:       Option<String>,
  pub rows:       Vec<PlanRow>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Plan {
  pub fn row(&self, ordinal: usize) -> Result<&PlanRow> {
    self
      .rows
      .get(ordinal)
      .ok_or(Error::RowNotFound { plan_id: self.id, ordinal })
  }

  /// The draft that would recreate this plan's current content.
  pub fn to_draft(&self) -> PlanDraft {
    PlanDraft {
      country: self.country.clone(),
      year:    self.year.clone(),
      status:  self.status,
      user:    self.user.clone(),
      rows:    self.rows.clone(),
    }
  }
}

/// Validated plan content accepted by [`crate::store::PlanStore`] writes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDraft {
  pub country: String,
  pub year:    String,
  pub status:  WorkflowStatus,
  pub user:    Option<String>,
  pub rows:    Vec<PlanRow>,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// A figure as typed by the user: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Figure {
  Number(f64),
  Text(String),
}

impl Figure {
  fn parse(&self) -> Option<f64> {
    let value = match self {
      Self::Number(n) => *n,
      Self::Text(s) => s.trim().parse().ok()?,
    };
    value.is_finite().then_some(value)
  }
}

impl From<f64> for Figure {
  fn from(n: f64) -> Self { Self::Number(n) }
}

/// One submitted row, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowInput {
  #[serde(default, alias = "quarter", alias = "tertial")]
  pub planning_period: Option<String>,
  #[serde(default)]
  pub hfb:             Option<String>,
  #[serde(default)]
  pub sales_goal:      Option<Figure>,
  #[serde(default)]
  pub actual_sales:    Option<Figure>,
  /// Optional; when present it must agree with the two figures.
  #[serde(default)]
  pub variance:        Option<Figure>,
  #[serde(default)]
  pub qty:             Option<Figure>,
}

impl From<&PlanRow> for RowInput {
  fn from(row: &PlanRow) -> Self {
    Self {
      planning_period: Some(row.planning_period.to_string()),
      hfb:             row.hfb.clone(),
      sales_goal:      Some(row.sales_goal.into()),
      actual_sales:    Some(row.actual_sales.into()),
      variance:        Some(row.variance.into()),
      qty:             row.qty.map(Figure::from),
    }
  }
}

impl RowInput {
  /// Validate this row, pushing any failures under `prefix` (e.g. `rows[3]`).
  fn check(&self, prefix: &str, errors: &mut Vec<FieldError>) -> Option<PlanRow> {
    let before = errors.len();

    let period = match self.planning_period.as_deref().map(str::trim) {
      None | Some("") => {
        errors.push(FieldError::new(
          format!("{prefix}.planningPeriod"),
          "planning period is required",
        ));
        None
      }
      Some(raw) => match raw.parse::<Period>() {
        Ok(p) => Some(p),
        Err(_) => {
          errors.push(FieldError::new(
            format!("{prefix}.planningPeriod"),
            format!("unknown planning period {raw:?}"),
          ));
          None
        }
      },
    };

    let mut figure = |name: &str, value: &Option<Figure>, required: bool| {
      match value {
        None if required => {
          errors.push(FieldError::new(
            format!("{prefix}.{name}"),
            "value is required",
          ));
          None
        }
        None => None,
        Some(f) => {
          let parsed = f.parse();
          if parsed.is_none() {
            errors.push(FieldError::new(
              format!("{prefix}.{name}"),
              "value must be a finite number",
            ));
          }
          parsed
        }
      }
    };

    let sales_goal = figure("salesGoal", &self.sales_goal, true);
    let actual_sales = figure("actualSales", &self.actual_sales, true);
    let supplied_variance = figure("variance", &self.variance, false);
    let qty = figure("qty", &self.qty, false);

    if let (Some(goal), Some(actual), Some(variance)) =
      (sales_goal, actual_sales, supplied_variance)
      && (actual - goal - variance).abs() > VARIANCE_TOLERANCE
    {
      errors.push(FieldError::new(
        format!("{prefix}.variance"),
        format!(
          "variance {variance} does not equal actualSales - salesGoal ({})",
          actual - goal
        ),
      ));
    }

    if errors.len() > before {
      return None;
    }

    let hfb = self
      .hfb
      .as_deref()
      .map(str::trim)
      .filter(|h| !h.is_empty())
      .map(str::to_owned);

    Some(PlanRow::new(period?, hfb, sales_goal?, actual_sales?, qty))
  }

  /// Validate a single row outside of a full plan submission.
  pub fn validate(&self, field_prefix: &str) -> Result<PlanRow> {
    let mut errors = Vec::new();
    match self.check(field_prefix, &mut errors) {
      Some(row) if errors.is_empty() => Ok(row),
      _ => Err(Error::Validation(errors)),
    }
  }
}

/// The body of a create or update request, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInput {
  #[serde(default)]
  pub country: String,
  #[serde(default)]
  pub year:    String,
  #[serde(default)]
  pub status:  Option<WorkflowStatus>,
  #[serde(default)]
  pub user:    Option<String>,
  #[serde(default)]
  pub rows:    Vec<RowInput>,
}

impl PlanInput {
  /// Check every field and recompute each row's variance.
  ///
  /// All failures are collected; the error lists them field by field.
  pub fn validate(&self) -> Result<PlanDraft> {
    let mut errors = Vec::new();

    let country = self.country.trim();
    if country.is_empty() {
      errors.push(FieldError::new("country", "country is required"));
    }

    let year = self.year.trim();
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
      errors.push(FieldError::new("year", "year must be four digits"));
    }

    let rows: Vec<Option<PlanRow>> = self
      .rows
      .iter()
      .enumerate()
      .map(|(i, row)| row.check(&format!("rows[{i}]"), &mut errors))
      .collect();

    if !errors.is_empty() {
      return Err(Error::Validation(errors));
    }

    Ok(PlanDraft {
      country: country.to_owned(),
      year:    year.to_owned(),
      status:  self.status.unwrap_or_default(),
      user:    self
        .user
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_owned),
      rows:    rows.into_iter().flatten().collect(),
    })
  }
}
