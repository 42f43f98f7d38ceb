//! Startup errors for the server library.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A configured admin is not a usable user name.
  #[error("invalid admin {user:?}: {source}")]
  InvalidAdmin {
    user:   String,
    #[source]
    source: salesplan_core::Error,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
