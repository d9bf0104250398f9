//! Per-run user profiles: stable device assignment and registration dates.
//!
//! A user's device dimension is resolved once per run from the platform
//! recorded at registration; raw events may report drifting platform
//! strings, but the user's dimensional assignment stays stable for the whole
//! statistics run.

use std::collections::HashMap;

use chrono::NaiveDate;
use engine_core::{
    cohort, Cohort, CohortBuckets, Device, EntityStore, Uid,
};
use tracing::{info, warn};

/// Run-local profile cache for all uids observed in the window.
#[derive(Debug, Default)]
pub struct UserProfiles {
    devices: HashMap<Uid, Device>,
    registrations: HashMap<Uid, NaiveDate>,
}

impl UserProfiles {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bulk-load profiles for the observed uids. A failed load degrades to
    /// empty profiles (event-platform device fallback, oldest cohort).
    pub async fn load(entities: &dyn EntityStore, tenant: &str, uids: &[Uid]) -> Self {
        if uids.is_empty() {
            return Self::empty();
        }

        let users = match entities.users_by_ids(tenant, uids).await {
            Ok(users) => users,
            Err(e) => {
                warn!(tenant = tenant, error = %e, "User profile load failed, degrading");
                return Self::empty();
            }
        };

        let mut devices = HashMap::with_capacity(users.len());
        let mut registrations = HashMap::with_capacity(users.len());
        for user in users {
            devices.insert(user.uid, Device::normalize(user.platform.as_deref()));
            registrations.insert(user.uid, user.registered_at.date_naive());
        }

        info!(
            tenant = tenant,
            requested = uids.len(),
            loaded = devices.len(),
            "User profiles loaded"
        );

        Self {
            devices,
            registrations,
        }
    }

    /// The user's device dimension: registration-source device first, the
    /// record's own platform string as fallback.
    pub fn device(&self, uid: Uid, event_platform: Option<&str>) -> Device {
        match self.devices.get(&uid) {
            Some(&device) => device,
            None => Device::normalize(event_platform),
        }
    }

    pub fn registration(&self, uid: Uid) -> Option<NaiveDate> {
        self.registrations.get(&uid).copied()
    }

    pub fn cohort(&self, uid: Uid, target: NaiveDate, buckets: &CohortBuckets) -> Cohort {
        cohort::classify(self.registration(uid), target, buckets)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }
}
