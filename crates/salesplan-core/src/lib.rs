//! Core types and trait definitions for the sales-planning workflow.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the plan model, the row review state machine, the storage traits,
//! the review engine that enforces the state machine, and the aggregation
//! service that derives the editor, reviewer and published views.

// We intentionally use `impl Future` return types in traits (stabilised in
// Rust 1.75) and implement them with `async fn`.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod etag;
pub mod notify;
pub mod plan;
pub mod review;
pub mod roles;
pub mod store;
pub mod views;

pub use aggregate::AggregationService;
pub use engine::ReviewEngine;
pub use error::{Error, FieldError, Result};
