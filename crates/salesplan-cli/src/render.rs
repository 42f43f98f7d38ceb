//! Plain-text rendering of API responses for the terminal.

use std::fmt::Write as _;

use salesplan_core::{
  plan::{Plan, PlanRow},
  views::{EditorView, PlanGroup, PublishedReport, ReviewerQueue, StatusCounts},
};

fn opt(v: Option<f64>) -> String { v.map(|q| q.to_string()).unwrap_or_default() }

fn row_line(out: &mut String, ordinal: usize, row: &PlanRow, status: Option<&str>) {
  let _ = writeln!(
    out,
    "  {ordinal:>3}  {:<3} {:<10} {:>12.2} {:>12.2} {:>12.2} {:>8}  {}",
    row.planning_period.as_ref(),
    row.hfb_or_empty(),
    row.sales_goal,
    row.actual_sales,
    row.variance,
    opt(row.qty),
    status.unwrap_or(""),
  );
}

const ROW_HEADER: &str =
  "    #  per HFB           sales goal       actual     variance      qty  status";

pub fn counts(c: &StatusCounts) -> String {
  format!(
    "{} rows: {} pending, {} approved, {} denied, {} published",
    c.total, c.pending, c.approved, c.denied, c.published
  )
}

pub fn plan_summaries(plans: &[Plan]) -> String {
  let mut out = String::new();
  for p in plans {
    let _ = writeln!(
      out,
      "{}  {:<16} {}  {:<9} {:>3} rows  {}",
      p.id,
      p.country,
      p.year,
      p.status.as_ref(),
      p.rows.len(),
      p.user.as_deref().unwrap_or("-"),
    );
  }
  if out.is_empty() {
    out.push_str("no sales plans\n");
  }
  out
}

pub fn plan(plan: &Plan, etag: Option<&str>) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{} {} ({})", plan.country, plan.year, plan.status);
  let _ = writeln!(out, "id:      {}", plan.id);
  if let Some(user) = &plan.user {
    let _ = writeln!(out, "user:    {user}");
  }
  let _ = writeln!(out, "updated: {}", plan.updated_at.to_rfc3339());
  if let Some(etag) = etag {
    let _ = writeln!(out, "etag:    {etag}");
  }
  out.push_str(ROW_HEADER);
  out.push('\n');
  for (n, row) in plan.rows.iter().enumerate() {
    row_line(&mut out, n, row, None);
  }
  out
}

fn groups(out: &mut String, groups: &[PlanGroup]) {
  for g in groups {
    let _ = writeln!(
      out,
      "{} {} ({})  {}  [{}]",
      g.country,
      g.year,
      g.workflow_status,
      g.plan_id,
      counts(&g.counts)
    );
    out.push_str(ROW_HEADER);
    out.push('\n');
    for r in &g.rows {
      row_line(out, r.ordinal, &r.row, Some(r.status.as_ref()));
    }
  }
}

pub fn editor(view: &EditorView) -> String {
  let mut out = format!("plans of {}: {}\n", view.user, counts(&view.counts));
  groups(&mut out, &view.groups);
  out
}

pub fn review(queue: &ReviewerQueue) -> String {
  let mut out = format!("review queue, overall {}\n", counts(&queue.counts));
  groups(&mut out, &queue.groups);
  out
}

pub fn published(report: &PublishedReport) -> String {
  let mut out = String::new();
  for r in &report.rows {
    let _ = writeln!(
      out,
      "{}  {:<16} {:<3} {:<10} {:>12.2} {:>12.2} {:>12.2}",
      r.year,
      r.country,
      r.planning_period.as_ref(),
      r.hfb,
      r.sales_goal,
      r.actual_sales,
      r.difference,
    );
  }
  let t = &report.totals;
  let _ = writeln!(
    out,
    "{} published rows, goal {:.2}, actual {:.2}, difference {:.2}",
    t.rows, t.sales_goal, t.actual_sales, t.difference
  );
  out
}

#[cfg(test)]
mod tests {
  use salesplan_core::views::ReportTotals;

  use super::*;

  #[test]
  fn empty_report_prints_zero_totals() {
    let report = PublishedReport { rows: vec![], totals: ReportTotals::default() };
    assert_eq!(
      published(&report),
      "0 published rows, goal 0.00, actual 0.00, difference 0.00\n"
    );
  }

  #[test]
  fn no_plans_is_reported() {
    assert_eq!(plan_summaries(&[]), "no sales plans\n");
  }
}
