//! Handlers for `/roles` endpoints.
//!
//! A user without a record holds no roles; `GET /roles/:user` then returns
//! all flags `false` rather than 404.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
};
use salesplan_core::{
  roles::{RoleSet, Tab, validate_user},
  store::RoleStore,
};
use tracing::info;

use crate::{ApiState, Backend, error::ApiError};

async fn roles_of<S: Backend>(
  state: &ApiState<S>,
  user: &str,
) -> Result<Option<RoleSet>, ApiError> {
  state
    .store
    .get_roles(user)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))
}

/// `GET /roles`
pub async fn list<S: Backend>(
  State(state): State<ApiState<S>>,
) -> Result<Json<BTreeMap<String, RoleSet>>, ApiError> {
  let roles = state
    .store
    .list_roles()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(roles))
}

/// `GET /roles/:user`
pub async fn get_one<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(user): Path<String>,
) -> Result<Json<RoleSet>, ApiError> {
  Ok(Json(roles_of(&state, &user).await?.unwrap_or_default()))
}

/// `PUT /roles/:user`, body: `{"inputUser":true,"reviewer":false,"admin":false}`
///
/// Users without an existing record must look like an email address.
pub async fn set<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(user): Path<String>,
  Json(roles): Json<RoleSet>,
) -> Result<Json<RoleSet>, ApiError> {
  let user = user.trim().to_owned();
  if roles_of(&state, &user).await?.is_none() {
    validate_user(&user)?;
  }
  state
    .store
    .set_roles(&user, roles)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  info!(%user, ?roles, "roles updated");
  Ok(Json(roles))
}

/// `GET /roles/:user/tabs`
pub async fn tabs<S: Backend>(
  State(state): State<ApiState<S>>,
  Path(user): Path<String>,
) -> Result<Json<Vec<Tab>>, ApiError> {
  let roles = roles_of(&state, &user).await?.unwrap_or_default();
  Ok(Json(roles.tabs()))
}
