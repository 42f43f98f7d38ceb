//! Error type for `salesplan-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the domain types do not recognise.
  #[error("cannot decode {column}: {value:?}")]
  Decode { column: &'static str, value: String },
}

impl Error {
  /// Wrap a decode failure raised inside a `Connection::call` closure.
  pub(crate) fn into_call_error(self) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(self))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
