//! Daily statistics jobs: reconcile the event log, entity store, and ledger
//! into dimensional daily-statistics rows.
//!
//! Pipeline for one (tenant, date):
//! 1. resolve the day window;
//! 2. build the identity map (anonymous events → authenticated uid);
//! 3. fetch every metric source concurrently, each in its own failure
//!    domain;
//! 4. resolve user profiles and acquisition channels for all observed uids;
//! 5. fold, merge cross-source evidence, aggregate over the observed
//!    dimension universe;
//! 6. materialize idempotently.

pub mod aggregate;
pub mod channel;
pub mod collectors;
pub mod driver;
pub mod identity;
pub mod job;
pub mod materialize;
pub mod merge;
pub mod profile;
pub mod universe;

pub use driver::{run_backfill, run_single, BackfillSummary, DriverConfig};
pub use job::{JobConfig, JobContext, JobReport};
pub use materialize::{MaterializeOutcome, WriteStrategy};
