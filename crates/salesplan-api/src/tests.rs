//! Router tests driven through `tower::ServiceExt::oneshot` against an
//! in-memory store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use salesplan_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store))
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  headers: Vec<(header::HeaderName, &str)>,
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn usa_plan() -> Value {
  json!({
    "country": "USA",
    "year": "2025",
    "status": "draft",
    "user": "editor@example.com",
    "rows": [
      { "planningPeriod": "T1", "hfb": "HFB 01", "salesGoal": 1000, "actualSales": 900, "variance": -100 },
      { "quarter": "Q2", "hfb": "HFB 02", "salesGoal": "50", "actualSales": "75" },
      { "planningPeriod": "T3", "hfb": "HFB 03", "salesGoal": 10, "actualSales": 10 }
    ]
  })
}

async fn create(app: &Router) -> String {
  let resp = send(app, "POST", "/sales-plans", vec![], Some(usa_plan())).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body = json_body(resp).await;
  assert_eq!(body["message"], "Sales plan created successfully");
  body["id"].as_str().unwrap().to_owned()
}

// ── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
  let app = app().await;
  let resp = send(&app, "GET", "/health", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["status"], "OK");
}

// ── Plans ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_round_trips_variance() {
  let app = app().await;
  let id = create(&app).await;

  let resp = send(&app, "GET", &format!("/sales-plans/{id}"), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(resp.headers().contains_key(header::ETAG));
  let plan = json_body(resp).await;
  assert_eq!(plan["rows"][0]["variance"], -100.0);
  assert_eq!(plan["rows"][1]["planningPeriod"], "Q2");
  assert_eq!(plan["rows"][1]["variance"], 25.0);
}

#[tokio::test]
async fn invalid_plans_report_each_field() {
  let app = app().await;
  let body = json!({
    "country": "",
    "year": "25",
    "rows": [{ "planningPeriod": "T9", "salesGoal": "abc", "actualSales": 1 }]
  });
  let resp = send(&app, "POST", "/sales-plans", vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let fields: Vec<String> = json_body(resp).await["fields"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["field"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(fields, vec!["country", "year", "rows[0].planningPeriod", "rows[0].salesGoal"]);
}

#[tokio::test]
async fn missing_plans_are_404() {
  let app = app().await;
  let missing = uuid::Uuid::new_v4();
  for method in ["GET", "DELETE"] {
    let resp = send(&app, method, &format!("/sales-plans/{missing}"), vec![], None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"], "Sales plan not found");
  }
  let resp =
    send(&app, "PUT", &format!("/sales-plans/{missing}"), vec![], Some(usa_plan())).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_with_stale_if_match_is_412() {
  let app = app().await;
  let id = create(&app).await;
  let uri = format!("/sales-plans/{id}");

  let resp = send(&app, "GET", &uri, vec![], None).await;
  let etag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();

  let resp =
    send(&app, "PUT", &uri, vec![(header::IF_MATCH, etag.as_str())], Some(usa_plan())).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["message"], "Sales plan updated successfully");

  let resp =
    send(&app, "PUT", &uri, vec![(header::IF_MATCH, etag.as_str())], Some(usa_plan())).await;
  assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn workflow_and_status_listing() {
  let app = app().await;
  let id = create(&app).await;
  let uri = format!("/sales-plans/{id}/workflow");

  let resp = send(&app, "POST", &uri, vec![], Some(json!({ "action": "submit" }))).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["status"], "review");

  let resp = send(&app, "POST", &uri, vec![], Some(json!({ "action": "publish" }))).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let resp = send(&app, "GET", "/sales-plans/status/review", vec![], None).await;
  assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
  let resp = send(&app, "GET", "/sales-plans/status/draft", vec![], None).await;
  assert!(json_body(resp).await.as_array().unwrap().is_empty());
}

// ── Rows and views ──────────────────────────────────────────────────────────

#[tokio::test]
async fn review_flow_through_views() {
  let app = app().await;
  let id = create(&app).await;
  let row = |n: usize, action: &str| format!("/sales-plans/{id}/rows/{n}/{action}");

  let resp = send(&app, "POST", &row(0, "approve"), vec![], None).await;
  assert_eq!(json_body(resp).await["status"], "approved");
  send(&app, "POST", &row(1, "deny"), vec![], None).await;

  let queue = json_body(send(&app, "GET", "/views/review", vec![], None).await).await;
  let ordinals: Vec<u64> = queue["groups"][0]["rows"]
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["ordinal"].as_u64().unwrap())
    .collect();
  assert_eq!(ordinals, vec![0, 2]);

  send(&app, "POST", &row(0, "publish"), vec![], None).await;
  let report =
    json_body(send(&app, "GET", "/views/published?year=All", vec![], None).await).await;
  assert_eq!(report["rows"].as_array().unwrap().len(), 1);
  assert_eq!(report["totals"]["difference"], -100.0);

  let empty =
    json_body(send(&app, "GET", "/views/published?year=2024", vec![], None).await).await;
  assert!(empty["rows"].as_array().unwrap().is_empty());
  assert_eq!(empty["totals"]["salesGoal"], 0.0);

  let counts = json_body(send(&app, "GET", "/views/counts", vec![], None).await).await;
  assert_eq!(counts["total"], 3);
  assert_eq!(counts["published"], 1);

  let snapshot = json_body(send(&app, "GET", "/row-statuses", vec![], None).await).await;
  assert_eq!(snapshot["revision"], 3);
  assert_eq!(snapshot["statuses"][format!("{id}-0")], "published");
  assert_eq!(snapshot["statuses"][format!("{id}-1")], "denied");
}

#[tokio::test]
async fn illegal_row_transition_is_409_and_unknown_row_404() {
  let app = app().await;
  let id = create(&app).await;

  let resp = send(&app, "POST", &format!("/sales-plans/{id}/rows/0/publish"), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let resp = send(&app, "GET", &format!("/sales-plans/{id}/rows/0/status"), vec![], None).await;
  assert_eq!(json_body(resp).await["status"], "pending");

  let resp = send(&app, "POST", &format!("/sales-plans/{id}/rows/9/approve"), vec![], None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revising_a_denied_row_returns_it_to_pending() {
  let app = app().await;
  let id = create(&app).await;
  send(&app, "POST", &format!("/sales-plans/{id}/rows/1/deny"), vec![], None).await;

  let body = json!({ "planningPeriod": "Q2", "hfb": "HFB 02", "salesGoal": 50, "actualSales": 60 });
  let resp = send(&app, "PUT", &format!("/sales-plans/{id}/rows/1"), vec![], Some(body)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["rows"][1]["variance"], 10.0);

  let resp = send(&app, "GET", &format!("/sales-plans/{id}/rows/1/status"), vec![], None).await;
  assert_eq!(json_body(resp).await["status"], "pending");
}

#[tokio::test]
async fn put_changing_a_published_row_is_409() {
  let app = app().await;
  let id = create(&app).await;
  send(&app, "POST", &format!("/sales-plans/{id}/rows/0/approve"), vec![], None).await;
  send(&app, "POST", &format!("/sales-plans/{id}/rows/0/publish"), vec![], None).await;

  let mut plan = usa_plan();
  plan["rows"][0]["actualSales"] = json!(999);
  plan["rows"][0]["variance"] = json!(-1);
  let resp = send(&app, "PUT", &format!("/sales-plans/{id}"), vec![], Some(plan)).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);

  let resp = send(&app, "GET", &format!("/sales-plans/{id}"), vec![], None).await;
  assert_eq!(json_body(resp).await["rows"][0]["actualSales"], 900.0);
}

#[tokio::test]
async fn editor_view_requires_user_and_hides_other_users() {
  let app = app().await;
  create(&app).await;

  let resp = send(&app, "GET", "/views/editor", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let mine = json_body(
    send(&app, "GET", "/views/editor?user=editor@example.com&country=All", vec![], None).await,
  )
  .await;
  assert_eq!(mine["groups"].as_array().unwrap().len(), 1);

  let theirs =
    json_body(send(&app, "GET", "/views/editor?user=other@example.com", vec![], None).await)
      .await;
  assert!(theirs["groups"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn clear_all_removes_plans_and_statuses() {
  let app = app().await;
  let id = create(&app).await;
  send(&app, "POST", &format!("/sales-plans/{id}/rows/0/approve"), vec![], None).await;

  let resp = send(&app, "DELETE", "/sales-plans", vec![], None).await;
  assert_eq!(json_body(resp).await["deleted"], 1);

  let plans = json_body(send(&app, "GET", "/sales-plans", vec![], None).await).await;
  assert!(plans.as_array().unwrap().is_empty());
  let snapshot = json_body(send(&app, "GET", "/row-statuses", vec![], None).await).await;
  assert!(snapshot["statuses"].as_object().unwrap().is_empty());
}

// ── Roles ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn roles_drive_visible_tabs() {
  let app = app().await;

  let resp = send(&app, "GET", "/roles/nobody@example.com/tabs", vec![], None).await;
  assert_eq!(json_body(resp).await, json!(["published"]));

  let resp = send(
    &app,
    "PUT",
    "/roles/not-an-email",
    vec![],
    Some(json!({ "inputUser": true })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

  let resp = send(
    &app,
    "PUT",
    "/roles/lead@example.com",
    vec![],
    Some(json!({ "reviewer": true, "admin": true })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = send(&app, "GET", "/roles/lead@example.com/tabs", vec![], None).await;
  assert_eq!(json_body(resp).await, json!(["review", "published", "admin"]));

  let all = json_body(send(&app, "GET", "/roles", vec![], None).await).await;
  assert_eq!(all["lead@example.com"]["inputUser"], false);
}
