//! Async HTTP client wrapping the sales-planning JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Response, header};
use salesplan_core::{
  plan::{Plan, PlanInput, RowInput, WorkflowAction},
  review::{ReviewAction, RowKey, RowStatus},
  roles::{RoleSet, Tab},
  store::StatusSnapshot,
  views::{EditorView, PublishedReport, ReviewerQueue, StatusCounts, ViewFilter},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Connection settings for the API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the sales-planning JSON REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Deserialize)]
struct Created {
  id: Uuid,
}

#[derive(Deserialize)]
struct Cleared {
  deleted: usize,
}

#[derive(Deserialize)]
struct RowStatusBody {
  status: RowStatus,
}

/// Turn a non-success response into an error carrying the server's message
/// and, for validation failures, each offending field.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body: Value = resp.json().await.unwrap_or(Value::Null);
  let mut message = format!("{what} → {status}");
  if let Some(error) = body["error"].as_str() {
    message.push_str(&format!(": {error}"));
  }
  if let Some(fields) = body["fields"].as_array() {
    for f in fields {
      let field = f["field"].as_str().unwrap_or("?");
      let reason = f["message"].as_str().unwrap_or("");
      message.push_str(&format!("\n  {field}: {reason}"));
    }
  }
  Err(anyhow!(message))
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    debug!(request = what, "sending");
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    check(resp, what)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising {what} response"))
  }

  // ── Health ────────────────────────────────────────────────────────────────

  /// `GET /api/health`
  pub async fn health(&self) -> Result<Value> {
    self.send(self.client.get(self.url("/health")), "GET /health").await
  }

  // ── Plans ─────────────────────────────────────────────────────────────────

  /// `GET /api/sales-plans[/status/<status>]`
  pub async fn list_plans(&self, status: Option<&str>) -> Result<Vec<Plan>> {
    match status {
      Some(s) => {
        let path = format!("/sales-plans/status/{s}");
        self.send(self.client.get(self.url(&path)), &format!("GET {path}")).await
      }
      None => {
        self.send(self.client.get(self.url("/sales-plans")), "GET /sales-plans").await
      }
    }
  }

  /// `GET /api/sales-plans/<id>`, returning the plan and its ETag.
  pub async fn get_plan(&self, id: Uuid) -> Result<(Plan, Option<String>)> {
    let what = format!("GET /sales-plans/{id}");
    let resp = self
      .client
      .get(self.url(&format!("/sales-plans/{id}")))
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    let resp = check(resp, &what).await?;
    let etag = resp
      .headers()
      .get(header::ETAG)
      .and_then(|v| v.to_str().ok())
      .map(str::to_owned);
    let plan = resp.json().await.context("deserialising plan")?;
    Ok((plan, etag))
  }

  /// `POST /api/sales-plans`
  pub async fn create_plan(&self, input: &PlanInput) -> Result<Uuid> {
    let created: Created = self
      .send(
        self.client.post(self.url("/sales-plans")).json(input),
        "POST /sales-plans",
      )
      .await?;
    Ok(created.id)
  }

  /// `PUT /api/sales-plans/<id>`, optionally conditional on `if_match`.
  pub async fn update_plan(
    &self,
    id: Uuid,
    input: &PlanInput,
    if_match: Option<&str>,
  ) -> Result<()> {
    let mut req = self.client.put(self.url(&format!("/sales-plans/{id}"))).json(input);
    if let Some(etag) = if_match {
      req = req.header(header::IF_MATCH, etag);
    }
    let _: Value = self.send(req, &format!("PUT /sales-plans/{id}")).await?;
    Ok(())
  }

  /// `DELETE /api/sales-plans/<id>`
  pub async fn delete_plan(&self, id: Uuid) -> Result<()> {
    let _: Value = self
      .send(
        self.client.delete(self.url(&format!("/sales-plans/{id}"))),
        &format!("DELETE /sales-plans/{id}"),
      )
      .await?;
    Ok(())
  }

  /// `DELETE /api/sales-plans`: returns the number of plans removed.
  pub async fn clear_plans(&self) -> Result<usize> {
    let cleared: Cleared = self
      .send(self.client.delete(self.url("/sales-plans")), "DELETE /sales-plans")
      .await?;
    Ok(cleared.deleted)
  }

  /// `POST /api/sales-plans/<id>/workflow`
  pub async fn workflow(&self, id: Uuid, action: WorkflowAction) -> Result<Plan> {
    self
      .send(
        self
          .client
          .post(self.url(&format!("/sales-plans/{id}/workflow")))
          .json(&serde_json::json!({ "action": action })),
        &format!("POST /sales-plans/{id}/workflow"),
      )
      .await
  }

  // ── Rows ──────────────────────────────────────────────────────────────────

  /// `POST /api/sales-plans/<id>/rows/<n>/<action>`
  pub async fn row_action(&self, key: RowKey, action: ReviewAction) -> Result<RowStatus> {
    let path = format!("/sales-plans/{}/rows/{}/{action}", key.plan_id, key.ordinal);
    let body: RowStatusBody =
      self.send(self.client.post(self.url(&path)), &format!("POST {path}")).await?;
    Ok(body.status)
  }

  /// `PUT /api/sales-plans/<id>/rows/<n>`
  pub async fn revise_row(&self, key: RowKey, input: &RowInput) -> Result<Plan> {
    let path = format!("/sales-plans/{}/rows/{}", key.plan_id, key.ordinal);
    self
      .send(self.client.put(self.url(&path)).json(input), &format!("PUT {path}"))
      .await
  }

  /// `GET /api/row-statuses`
  pub async fn row_statuses(&self) -> Result<StatusSnapshot> {
    self.send(self.client.get(self.url("/row-statuses")), "GET /row-statuses").await
  }

  // ── Views ─────────────────────────────────────────────────────────────────

  /// `GET /api/views/editor?user=<user>&...`
  pub async fn editor_view(&self, user: &str, filter: &ViewFilter) -> Result<EditorView> {
    self
      .send(
        self
          .client
          .get(self.url("/views/editor"))
          .query(&[("user", user)])
          .query(filter),
        "GET /views/editor",
      )
      .await
  }

  /// `GET /api/views/review?...`
  pub async fn review_queue(&self, filter: &ViewFilter) -> Result<ReviewerQueue> {
    self
      .send(self.client.get(self.url("/views/review")).query(filter), "GET /views/review")
      .await
  }

  /// `GET /api/views/published?...`
  pub async fn published_report(&self, filter: &ViewFilter) -> Result<PublishedReport> {
    self
      .send(
        self.client.get(self.url("/views/published")).query(filter),
        "GET /views/published",
      )
      .await
  }

  /// `GET /api/views/counts`
  pub async fn counts(&self) -> Result<StatusCounts> {
    self.send(self.client.get(self.url("/views/counts")), "GET /views/counts").await
  }

  // ── Roles ─────────────────────────────────────────────────────────────────

  /// `GET /api/roles`
  pub async fn list_roles(&self) -> Result<std::collections::BTreeMap<String, RoleSet>> {
    self.send(self.client.get(self.url("/roles")), "GET /roles").await
  }

  /// `PUT /api/roles/<user>`
  pub async fn set_roles(&self, user: &str, roles: RoleSet) -> Result<RoleSet> {
    self
      .send(
        self.client.put(self.url(&format!("/roles/{user}"))).json(&roles),
        &format!("PUT /roles/{user}"),
      )
      .await
  }

  /// `GET /api/roles/<user>/tabs`
  pub async fn tabs(&self, user: &str) -> Result<Vec<Tab>> {
    self
      .send(
        self.client.get(self.url(&format!("/roles/{user}/tabs"))),
        &format!("GET /roles/{user}/tabs"),
      )
      .await
  }
}
