//! Read models derived from plans, rows and row statuses.
//!
//! Nothing here is stored. Every view is computed from the same inputs, a
//! plan list plus a [`StatusSnapshot`], so the three pages always agree with
//! each other and with [`status_counts`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
  plan::{Period, Plan, PlanRow, WorkflowStatus},
  review::{RowKey, RowStatus},
  store::StatusSnapshot,
};

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Row filter shared by the three views. `None` (or `"All"` on the wire)
/// disables a criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
  #[serde(default, deserialize_with = "all_as_none")]
  pub year:    Option<String>,
  #[serde(default, deserialize_with = "all_as_none")]
  pub country: Option<String>,
  #[serde(default, deserialize_with = "all_as_none")]
  pub hfb:     Option<String>,
  /// Ignored by the published report, which only ever shows published rows.
  #[serde(default, deserialize_with = "status_all_as_none")]
  pub status:  Option<RowStatus>,
}

impl ViewFilter {
  fn matches_plan(&self, plan: &Plan) -> bool {
    self.year.as_ref().is_none_or(|y| *y == plan.year)
      && self.country.as_ref().is_none_or(|c| *c == plan.country)
  }

  fn matches_row(&self, row: &PlanRow) -> bool {
    self.hfb.as_ref().is_none_or(|h| h == row.hfb_or_empty())
  }

  fn matches_status(&self, status: RowStatus) -> bool {
    self.status.is_none_or(|s| s == status)
  }
}

fn is_all(s: &str) -> bool {
  let s = s.trim();
  s.is_empty() || s.eq_ignore_ascii_case("all")
}

fn all_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
  let value = Option::<String>::deserialize(d)?;
  Ok(value.filter(|s| !is_all(s)).map(|s| s.trim().to_owned()))
}

fn status_all_as_none<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<Option<RowStatus>, D::Error> {
  match Option::<String>::deserialize(d)? {
    Some(s) if !is_all(&s) => s
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| serde::de::Error::custom(format!("unknown row status {s:?}"))),
    _ => Ok(None),
  }
}

// ─── Counts ──────────────────────────────────────────────────────────────────

/// Row counts by effective status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
  pub total:     usize,
  pub pending:   usize,
  pub approved:  usize,
  pub denied:    usize,
  pub published: usize,
}

impl StatusCounts {
  pub fn add(&mut self, status: RowStatus) {
    self.total += 1;
    match status {
      RowStatus::Pending => self.pending += 1,
      RowStatus::Approved => self.approved += 1,
      RowStatus::Denied => self.denied += 1,
      RowStatus::Published => self.published += 1,
    }
  }

  /// Whether the per-status counts add up to the total.
  pub fn is_consistent(&self) -> bool {
    self.pending + self.approved + self.denied + self.published == self.total
  }

  fn of_plan(plan: &Plan, statuses: &StatusSnapshot) -> Self {
    let mut counts = Self::default();
    for ordinal in 0..plan.rows.len() {
      counts.add(statuses.effective(RowKey::new(plan.id, ordinal)));
    }
    counts
  }
}

/// Counts over every row of every plan in `plans`.
pub fn status_counts(plans: &[Plan], statuses: &StatusSnapshot) -> StatusCounts {
  let mut counts = StatusCounts::default();
  for plan in plans {
    for ordinal in 0..plan.rows.len() {
      counts.add(statuses.effective(RowKey::new(plan.id, ordinal)));
    }
  }
  counts
}

// ─── Grouped rows ────────────────────────────────────────────────────────────

/// A row together with its position and effective status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedRow {
  pub plan_id: Uuid,
  pub ordinal: usize,
  #[serde(flatten)]
  pub row:     PlanRow,
  pub status:  RowStatus,
}

/// The visible rows of one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanGroup {
  pub plan_id:         Uuid,
  pub country:         String,
  pub year:            String,
  pub workflow_status: WorkflowStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user:            Option<String>,
  pub rows:            Vec<AnnotatedRow>,
  /// Counts over all of the plan's rows, not just the visible ones.
  pub counts:          StatusCounts,
}

impl PlanGroup {
  fn collect<F>(
    plan: &Plan,
    statuses: &StatusSnapshot,
    filter: &ViewFilter,
    mut keep: F,
  ) -> Option<Self>
  where
    F: FnMut(RowStatus) -> bool,
  {
    let rows: Vec<AnnotatedRow> = plan
      .rows
      .iter()
      .enumerate()
      .filter_map(|(ordinal, row)| {
        let status = statuses.effective(RowKey::new(plan.id, ordinal));
        (keep(status) && filter.matches_status(status) && filter.matches_row(row))
          .then(|| AnnotatedRow { plan_id: plan.id, ordinal, row: row.clone(), status })
      })
      .collect();

    if rows.is_empty() {
      return None;
    }

    Some(Self {
      plan_id: plan.id,
      country: plan.country.clone(),
      year: plan.year.clone(),
      workflow_status: plan.status,
      user: plan.user.clone(),
      rows,
      counts: StatusCounts::of_plan(plan, statuses),
    })
  }
}

/// Year ascending, then country ascending; creation order breaks ties.
fn by_year_then_country(a: &Plan, b: &Plan) -> Ordering {
  a.year
    .cmp(&b.year)
    .then_with(|| a.country.cmp(&b.country))
    .then_with(|| a.created_at.cmp(&b.created_at))
    .then_with(|| a.id.cmp(&b.id))
}

fn sorted_plans<'a>(plans: impl Iterator<Item = &'a Plan>) -> Vec<&'a Plan> {
  let mut plans: Vec<&Plan> = plans.collect();
  plans.sort_by(|a, b| by_year_then_country(a, b));
  plans
}

// ─── Editor view ─────────────────────────────────────────────────────────────

/// The editor's working set: their own plans, minus published rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorView {
  pub user:   String,
  pub groups: Vec<PlanGroup>,
  /// Counts over every row of the user's plans.
  pub counts: StatusCounts,
}

/// Rows keep their stored order inside each group; they are never re-sorted
/// by period, so the view matches the order rows were entered in.
pub fn editor_view(
  plans: &[Plan],
  statuses: &StatusSnapshot,
  user: &str,
  filter: &ViewFilter,
) -> EditorView {
  let owned: Vec<&Plan> = sorted_plans(
    plans.iter().filter(|p| p.user.as_deref() == Some(user)),
  );

  let mut counts = StatusCounts::default();
  for plan in &owned {
    let c = StatusCounts::of_plan(plan, statuses);
    counts.total += c.total;
    counts.pending += c.pending;
    counts.approved += c.approved;
    counts.denied += c.denied;
    counts.published += c.published;
  }

  let groups = owned
    .into_iter()
    .filter(|p| filter.matches_plan(p))
    .filter_map(|p| PlanGroup::collect(p, statuses, filter, RowStatus::in_editor_queue))
    .collect();

  EditorView { user: user.to_owned(), groups, counts }
}

// ─── Reviewer queue ──────────────────────────────────────────────────────────

/// Rows awaiting a reviewer decision or publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerQueue {
  pub groups: Vec<PlanGroup>,
  /// Counts over the entire row population, for progress reporting.
  pub counts: StatusCounts,
}

pub fn reviewer_queue(
  plans: &[Plan],
  statuses: &StatusSnapshot,
  filter: &ViewFilter,
) -> ReviewerQueue {
  let groups = sorted_plans(plans.iter().filter(|p| filter.matches_plan(p)))
    .into_iter()
    .filter_map(|p| PlanGroup::collect(p, statuses, filter, RowStatus::in_review_queue))
    .map(|mut group| {
      // Stable sort: rows sharing a period keep their ordinal order.
      group.rows.sort_by_key(|r| r.row.planning_period);
      group
    })
    .collect();

  ReviewerQueue { groups, counts: status_counts(plans, statuses) }
}

// ─── Published report ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRow {
  pub plan_id:         Uuid,
  pub ordinal:         usize,
  pub country:         String,
  pub year:            String,
  pub planning_period: Period,
  pub hfb:             String,
  pub sales_goal:      f64,
  pub actual_sales:    f64,
  pub variance:        f64,
  /// `actual_sales - sales_goal`, derived at read time.
  pub difference:      f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub qty:             Option<f64>,
  pub updated_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
  pub rows:         usize,
  pub sales_goal:   f64,
  pub actual_sales: f64,
  pub difference:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedReport {
  pub rows:   Vec<PublishedRow>,
  pub totals: ReportTotals,
}

/// Published rows only, sorted year desc → country → period → HFB.
///
/// An empty result is not an error; the totals are then all zero.
pub fn published_report(
  plans: &[Plan],
  statuses: &StatusSnapshot,
  filter: &ViewFilter,
) -> PublishedReport {
  let mut rows: Vec<PublishedRow> = plans
    .iter()
    .filter(|p| filter.matches_plan(p))
    .flat_map(|plan| {
      plan.rows.iter().enumerate().filter_map(move |(ordinal, row)| {
        let published = statuses.effective(RowKey::new(plan.id, ordinal))
          == RowStatus::Published;
        (published && filter.matches_row(row)).then(|| PublishedRow {
          plan_id: plan.id,
          ordinal,
          country: plan.country.clone(),
          year: plan.year.clone(),
          planning_period: row.planning_period,
          hfb: row.hfb_or_empty().to_owned(),
          sales_goal: row.sales_goal,
          actual_sales: row.actual_sales,
          variance: row.variance,
          difference: row.actual_sales - row.sales_goal,
          qty: row.qty,
          updated_at: plan.updated_at,
        })
      })
    })
    .collect();

  rows.sort_by(|a, b| {
    b.year
      .cmp(&a.year)
      .then_with(|| a.country.cmp(&b.country))
      .then_with(|| a.planning_period.cmp(&b.planning_period))
      .then_with(|| a.hfb.cmp(&b.hfb))
  });

  let totals = rows.iter().fold(ReportTotals::default(), |mut t, r| {
    t.rows += 1;
    t.sales_goal += r.sales_goal;
    t.actual_sales += r.actual_sales;
    t.difference += r.difference;
    t
  });

  PublishedReport { rows, totals }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn plan(country: &str, year: &str, user: Option<&str>, rows: Vec<PlanRow>) -> Plan {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Plan {
      id: Uuid::new_v4(),
      country: country.into(),
      year: year.into(),
      status: WorkflowStatus::Review,
      user: user.map(Into::into),
      rows,
      created_at: ts,
      updated_at: ts,
    }
  }

  fn row(period: Period, hfb: &str, goal: f64, actual: f64) -> PlanRow {
    PlanRow::new(period, Some(hfb.into()), goal, actual, None)
  }

  fn three_rows() -> Vec<PlanRow> {
    vec![
      row(Period::T2, "HFB 01", 100.0, 90.0),
      row(Period::T1, "HFB 02", 200.0, 210.0),
      row(Period::T1, "HFB 01", 300.0, 300.0),
    ]
  }

  fn with(statuses: &[(RowKey, RowStatus)]) -> StatusSnapshot {
    StatusSnapshot { revision: 1, statuses: statuses.iter().copied().collect() }
  }

  fn queue_ordinals(queue: &ReviewerQueue) -> Vec<usize> {
    queue.groups.iter().flat_map(|g| g.rows.iter().map(|r| r.ordinal)).collect()
  }

  #[test]
  fn reviewer_queue_excludes_denied_and_published() {
    let p = plan("USA", "2025", None, three_rows());
    let statuses = with(&[
      (RowKey::new(p.id, 0), RowStatus::Approved),
      (RowKey::new(p.id, 1), RowStatus::Denied),
    ]);
    let plans = vec![p.clone()];

    let queue = reviewer_queue(&plans, &statuses, &ViewFilter::default());
    // Row 2 (T1) sorts ahead of row 0 (T2).
    assert_eq!(queue_ordinals(&queue), vec![2, 0]);
    assert_eq!(queue.counts, StatusCounts {
      total:     3,
      pending:   1,
      approved:  1,
      denied:    1,
      published: 0,
    });

    let statuses = with(&[
      (RowKey::new(p.id, 0), RowStatus::Published),
      (RowKey::new(p.id, 1), RowStatus::Denied),
    ]);
    let queue = reviewer_queue(&plans, &statuses, &ViewFilter::default());
    assert_eq!(queue_ordinals(&queue), vec![2]);

    let report = published_report(&plans, &statuses, &ViewFilter::default());
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].ordinal, 0);
    assert_eq!(report.totals.difference, -10.0);
  }

  #[test]
  fn reviewer_groups_sort_by_year_then_country() {
    let plans = vec![
      plan("Sweden", "2025", None, three_rows()),
      plan("Denmark", "2025", None, three_rows()),
      plan("USA", "2024", None, three_rows()),
    ];
    let queue = reviewer_queue(&plans, &StatusSnapshot::default(), &ViewFilter::default());
    let order: Vec<(&str, &str)> = queue
      .groups
      .iter()
      .map(|g| (g.year.as_str(), g.country.as_str()))
      .collect();
    assert_eq!(order, vec![("2024", "USA"), ("2025", "Denmark"), ("2025", "Sweden")]);
    assert_eq!(queue.counts.total, 9);
    assert_eq!(queue.counts.pending, 9);
  }

  #[test]
  fn editor_view_keeps_stored_row_order_and_hides_published() {
    let mine = plan("USA", "2025", Some("me@example.com"), three_rows());
    let theirs = plan("USA", "2025", Some("them@example.com"), three_rows());
    let statuses = with(&[
      (RowKey::new(mine.id, 1), RowStatus::Published),
      (RowKey::new(mine.id, 2), RowStatus::Denied),
    ]);
    let plans = vec![theirs, mine.clone()];

    let view = editor_view(&plans, &statuses, "me@example.com", &ViewFilter::default());
    assert_eq!(view.groups.len(), 1);
    assert_eq!(view.groups[0].plan_id, mine.id);
    let rows: Vec<(usize, RowStatus)> =
      view.groups[0].rows.iter().map(|r| (r.ordinal, r.status)).collect();
    assert_eq!(rows, vec![(0, RowStatus::Pending), (2, RowStatus::Denied)]);
    assert_eq!(view.counts.total, 3);
    assert_eq!(view.counts.published, 1);
  }

  #[test]
  fn editor_filters_by_status_and_hfb() {
    let mine = plan("USA", "2025", Some("me@example.com"), three_rows());
    let statuses = with(&[(RowKey::new(mine.id, 2), RowStatus::Denied)]);
    let plans = vec![mine];

    let denied = ViewFilter { status: Some(RowStatus::Denied), ..ViewFilter::default() };
    let view = editor_view(&plans, &statuses, "me@example.com", &denied);
    assert_eq!(view.groups[0].rows.len(), 1);
    assert_eq!(view.groups[0].rows[0].ordinal, 2);

    let hfb = ViewFilter { hfb: Some("HFB 02".into()), ..ViewFilter::default() };
    let view = editor_view(&plans, &statuses, "me@example.com", &hfb);
    assert_eq!(view.groups[0].rows[0].ordinal, 1);

    let nobody = editor_view(&plans, &statuses, "other@example.com", &hfb);
    assert!(nobody.groups.is_empty());
    assert_eq!(nobody.counts, StatusCounts::default());
  }

  #[test]
  fn published_report_sorting() {
    let a = plan("Sweden", "2024", None, vec![row(Period::T2, "B", 1.0, 1.0)]);
    let b = plan("Denmark", "2025", None, vec![
      row(Period::T2, "A", 1.0, 2.0),
      row(Period::T1, "B", 1.0, 2.0),
      row(Period::T1, "A", 1.0, 2.0),
    ]);
    let mut published = vec![(RowKey::new(a.id, 0), RowStatus::Published)];
    for ordinal in 0..3 {
      published.push((RowKey::new(b.id, ordinal), RowStatus::Published));
    }
    let plans = vec![a, b];
    let report = published_report(&plans, &with(&published), &ViewFilter::default());
    let order: Vec<(&str, Period, &str)> = report
      .rows
      .iter()
      .map(|r| (r.year.as_str(), r.planning_period, r.hfb.as_str()))
      .collect();
    assert_eq!(order, vec![
      ("2025", Period::T1, "A"),
      ("2025", Period::T1, "B"),
      ("2025", Period::T2, "A"),
      ("2024", Period::T2, "B"),
    ]);
    assert_eq!(report.totals.rows, 4);
    assert_eq!(report.totals.sales_goal, 4.0);
    assert_eq!(report.totals.actual_sales, 7.0);
    assert_eq!(report.totals.difference, 3.0);
  }

  #[test]
  fn filtering_to_an_empty_report_yields_zero_totals() {
    let p = plan("USA", "2025", None, three_rows());
    let statuses = with(&[(RowKey::new(p.id, 0), RowStatus::Published)]);
    let filter = ViewFilter { year: Some("2024".into()), ..ViewFilter::default() };
    let report = published_report(&[p], &statuses, &filter);
    assert!(report.rows.is_empty());
    assert_eq!(report.totals, ReportTotals::default());
  }

  #[test]
  fn counts_always_reconcile() {
    let plans = vec![
      plan("USA", "2025", None, three_rows()),
      plan("Sweden", "2024", None, three_rows()),
    ];
    let statuses = with(&[
      (RowKey::new(plans[0].id, 0), RowStatus::Published),
      (RowKey::new(plans[0].id, 1), RowStatus::Approved),
      (RowKey::new(plans[1].id, 2), RowStatus::Denied),
      // Orphaned entry for a deleted plan.
      (RowKey::new(Uuid::new_v4(), 0), RowStatus::Approved),
    ]);
    let counts = status_counts(&plans, &statuses);
    assert_eq!(counts.total, 6);
    assert!(counts.is_consistent());
  }

  #[test]
  fn all_on_the_wire_disables_a_filter() {
    let filter: ViewFilter = serde_json::from_str(
      r#"{"year":"All","country":"USA","hfb":"","status":"all"}"#,
    )
    .unwrap();
    assert_eq!(filter, ViewFilter {
      year:    None,
      country: Some("USA".into()),
      hfb:     None,
      status:  None,
    });
    let filter: ViewFilter = serde_json::from_str(r#"{"status":"denied"}"#).unwrap();
    assert_eq!(filter.status, Some(RowStatus::Denied));
    assert!(serde_json::from_str::<ViewFilter>(r#"{"status":"lost"}"#).is_err());
  }
}
