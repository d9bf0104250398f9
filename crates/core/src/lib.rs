//! Core types, source contracts, and pure aggregation logic for the
//! Atelier aggregation engine.

pub mod accounts;
pub mod calendar;
pub mod cohort;
pub mod device;
pub mod error;
pub mod record;
pub mod sources;
pub mod stats;

pub use calendar::DayWindow;
pub use cohort::{Cohort, CohortBuckets};
pub use device::Device;
pub use error::{Error, Result};
pub use record::RawRecord;
pub use sources::*;
pub use stats::*;
