//! ClickHouse-backed event log source.
//!
//! The event log is append-only; this crate only ever reads it. Queries are
//! scoped to a (tenant, time-window) pair and retried with backoff on
//! transient failures.

pub mod client;
pub mod config;
pub mod health;
pub mod query;
pub mod retry;

pub use client::EventLogClient;
pub use config::ClickHouseConfig;
pub use query::ClickHouseEventLog;
pub use retry::RetryPolicy;
