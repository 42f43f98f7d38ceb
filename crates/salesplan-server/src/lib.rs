//! HTTP server assembly for the sales-planning API.
//!
//! Mounts [`salesplan_api::api_router`] under `/api`, wraps it in request
//! tracing (and optionally permissive CORS for the browser front end), and
//! provides the startup hooks the binary runs before serving.

pub mod error;

pub use error::{Error, Result};

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use salesplan_api::{Backend, api_router};
use salesplan_core::{
  roles::{RoleSet, validate_user},
  store::{RoleStore, RowStatusStore, StatusChange, SubscriptionId},
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 3001 }

fn default_store_path() -> PathBuf { PathBuf::from("salesplan.db") }

/// Runtime server configuration, deserialised from `config.toml` and
/// `SALESPLAN_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Users granted every role at startup.
  #[serde(default)]
  pub admins:     Vec<String>,
  /// Allow cross-origin requests from any origin.
  #[serde(default)]
  pub cors:       bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       default_host(),
      port:       default_port(),
      store_path: default_store_path(),
      admins:     Vec::new(),
      cors:       false,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the top-level [`Router`] for `store`.
pub fn router<S: Backend>(store: Arc<S>, config: &ServerConfig) -> Router {
  let app = Router::new()
    .nest("/api", api_router(store))
    .layer(TraceLayer::new_for_http());
  if config.cors { app.layer(CorsLayer::permissive()) } else { app }
}

// ─── Startup hooks ───────────────────────────────────────────────────────────

/// Grant every role to each configured admin.
pub async fn seed_admins<S: RoleStore>(store: &S, admins: &[String]) -> Result<()> {
  for user in admins {
    let user = user.trim();
    validate_user(user).map_err(|source| Error::InvalidAdmin {
      user: user.to_owned(),
      source,
    })?;
    store
      .set_roles(user, RoleSet::ALL)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    info!(%user, "seeded admin roles");
  }
  Ok(())
}

/// Log every committed row status change.
pub fn log_status_changes<S: RowStatusStore>(store: &S) -> SubscriptionId {
  store.subscribe(Box::new(|change: &StatusChange| match change {
    StatusChange::Set { key, status, revision } => {
      info!(%key, %status, revision, "row status set");
    }
    StatusChange::Removed { key, revision } => {
      info!(%key, revision, "row status reset to pending");
    }
    StatusChange::Cleared { revision } => {
      info!(revision, "all row statuses cleared");
    }
  }))
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use salesplan_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  async fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().await.unwrap())
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let app = router(store().await, &ServerConfig::default());

    let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Sales Planning API is running");

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn cors_headers_only_when_enabled() {
    let preflight = || {
      Request::builder()
        .method("OPTIONS")
        .uri("/api/sales-plans")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
    };

    let config = ServerConfig { cors: true, ..ServerConfig::default() };
    let resp = router(store().await, &config).oneshot(preflight()).await.unwrap();
    assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

    let resp =
      router(store().await, &ServerConfig::default()).oneshot(preflight()).await.unwrap();
    assert!(!resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
  }

  #[tokio::test]
  async fn admins_are_seeded_with_every_role() {
    let s = store().await;
    seed_admins(s.as_ref(), &["boss@example.com".to_string()]).await.unwrap();
    assert_eq!(s.get_roles("boss@example.com").await.unwrap(), Some(RoleSet::ALL));

    let err = seed_admins(s.as_ref(), &["boss".to_string()]).await.unwrap_err();
    assert!(matches!(err, Error::InvalidAdmin { .. }));
  }

  #[tokio::test]
  async fn status_logger_can_be_removed() {
    let s = store().await;
    let id = log_status_changes(s.as_ref());
    assert!(s.unsubscribe(id));
  }
}
