//! User lifecycle classification.
//!
//! Two distinct notions share this module:
//!
//! * a [`Cohort`] label relative to a target statistics date (new / growing /
//!   old), bucketed on calendar-day distance from the registration date;
//! * membership in a per-user lifecycle *window*: "did this behavior happen
//!   within N days of this user's own registration". Every user in a window
//!   report has a different absolute window.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{days_between, start_of_day};

/// Lifecycle cohort label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    /// Registered on the target date.
    New,
    /// Registered 1..=N days before the target date.
    Growing,
    /// Registered earlier, or registration unknown.
    #[default]
    Old,
}

impl Cohort {
    pub const ALL: [Cohort; 3] = [Cohort::New, Cohort::Growing, Cohort::Old];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Growing => "growing",
            Self::Old => "old",
        }
    }
}

impl std::fmt::Display for Cohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket bounds for [`classify`], in calendar days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CohortBuckets {
    /// Upper bound (inclusive) of the `New` bucket.
    pub new_max_days: i64,
    /// Upper bound (inclusive) of the `Growing` bucket.
    pub growing_max_days: i64,
}

impl Default for CohortBuckets {
    fn default() -> Self {
        Self {
            new_max_days: 0,
            growing_max_days: 30,
        }
    }
}

/// Assign a cohort label for a user on the target date.
///
/// A user with no known registration date falls into the oldest bucket.
/// The boundary rule is fixed: day-of-registration is `New`, days 1..=30
/// are `Growing`, everything beyond is `Old`.
pub fn classify(
    registration: Option<NaiveDate>,
    target: NaiveDate,
    buckets: &CohortBuckets,
) -> Cohort {
    let registration = match registration {
        Some(d) => d,
        None => return Cohort::Old,
    };
    let diff = days_between(registration, target);
    if diff <= buckets.new_max_days {
        Cohort::New
    } else if diff <= buckets.growing_max_days {
        Cohort::Growing
    } else {
        Cohort::Old
    }
}

/// Whether a behavior timestamp falls within the user's personal
/// registration window: the half-open interval
/// `[start_of_day(registration), start_of_day(registration) + window_days)`.
pub fn in_window(registration: NaiveDate, behavior_ts: DateTime<Utc>, window_days: u32) -> bool {
    let start = start_of_day(registration);
    let end = start + Duration::days(i64::from(window_days));
    behavior_ts >= start && behavior_ts < end
}
