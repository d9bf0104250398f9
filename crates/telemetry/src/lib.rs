//! Internal telemetry for the aggregation engine.
//!
//! Batch jobs report through structured logs and an in-process metrics
//! registry snapshotted at the end of each sweep; no external metrics
//! system is involved.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
