//! User roles and the navigation they unlock.
//!
//! Roles are assigned by an administrator and are not authenticated; they
//! only decide which pages a user is offered.

use serde::{Deserialize, Serialize};

use crate::{Error, FieldError, Result};

/// The roles held by one user. A user with no record holds none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSet {
  #[serde(default)]
  pub input_user: bool,
  #[serde(default)]
  pub reviewer:   bool,
  #[serde(default)]
  pub admin:      bool,
}

impl RoleSet {
  pub const ALL: Self = Self { input_user: true, reviewer: true, admin: true };

  /// Default roles for a newly added user.
  pub const NEW_USER: Self =
    Self { input_user: true, reviewer: false, admin: false };

  /// The pages this user can navigate to, in tab order.
  pub fn tabs(&self) -> Vec<Tab> {
    let mut tabs = Vec::with_capacity(4);
    if self.input_user {
      tabs.push(Tab::Main);
    }
    if self.reviewer {
      tabs.push(Tab::Review);
    }
    tabs.push(Tab::Published);
    if self.admin {
      tabs.push(Tab::Admin);
    }
    tabs
  }
}

/// A top-level page of the front end.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tab {
  /// The editor's plan entry page.
  Main,
  Review,
  Published,
  Admin,
}

/// Check that `user` looks like an email address.
pub fn validate_user(user: &str) -> Result<()> {
  let message = if user.trim().is_empty() {
    "email is required"
  } else if !user.contains('@') || !user.contains('.') {
    "please enter a valid email address"
  } else {
    return Ok(());
  };
  Err(Error::Validation(vec![FieldError::new("user", message)]))
}
