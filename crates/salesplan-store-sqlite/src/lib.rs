//! SQLite backend for the sales-planning stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] implements the
//! plan, row-status and role stores over a single database file.

mod encode;
mod roles;
mod schema;
mod status;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
