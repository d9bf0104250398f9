//! Identity resolution: stitching anonymous pre-login events to the user
//! who eventually authenticates.

use std::collections::HashMap;

use engine_core::record::fields;
use engine_core::{DayWindow, EventFilter, EventLogSource, RawRecord, Uid};
use telemetry::metrics;
use tracing::{debug, info, warn};

/// `distinct_id → uid` map for one (tenant, window). Built once per job run
/// and read-only afterwards.
///
/// First-seen-wins: no event overwrites an existing mapping. Events are not
/// guaranteed ordered, so "first" means the source's default return
/// ordering; if a distinct_id is reused by two accounts in one window the
/// outcome is non-deterministic. That is a known limitation of the upstream
/// data, not something this map tries to repair.
#[derive(Debug, Default)]
pub struct IdentityMap {
    map: HashMap<String, Uid>,
}

impl IdentityMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the map from identity-bearing event records.
    pub fn from_records(records: &[RawRecord]) -> Self {
        let mut map = HashMap::new();

        for rec in records {
            let uid = match rec.i64_field(fields::UID) {
                Some(uid) => uid,
                None => continue,
            };
            let distinct_id = match rec.str_field(fields::DISTINCT_ID) {
                Some(id) if !id.is_empty() => id,
                _ => continue,
            };

            match map.get(distinct_id) {
                None => {
                    map.insert(distinct_id.to_string(), uid);
                }
                Some(&existing) if existing != uid => {
                    metrics().identity_collisions.inc();
                    debug!(
                        distinct_id = distinct_id,
                        kept = existing,
                        dropped = uid,
                        "distinct_id mapped to multiple uids, keeping first"
                    );
                }
                Some(_) => {}
            }
        }

        Self { map }
    }

    pub fn resolve(&self, distinct_id: &str) -> Option<Uid> {
        self.map.get(distinct_id).copied()
    }

    /// The uid a record's activity is attributed to: a present uid always
    /// wins over a resolved one.
    pub fn effective_uid(&self, raw_uid: Option<Uid>, distinct_id: Option<&str>) -> Option<Uid> {
        raw_uid.or_else(|| distinct_id.and_then(|id| self.resolve(id)))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Build the identity map for a window by scanning identity-bearing events.
///
/// A failed scan degrades to an empty map instead of failing the job;
/// collectors then count only already-authenticated events.
pub async fn resolve_identity(
    source: &dyn EventLogSource,
    tenant: &str,
    window: &DayWindow,
) -> IdentityMap {
    let filter = EventFilter::for_tenant(tenant).with_uid_only();

    match source.query(&filter, window.from, window.to).await {
        Ok(records) => {
            let map = IdentityMap::from_records(&records);
            info!(
                tenant = tenant,
                date = %window.date,
                scanned = records.len(),
                mapped = map.len(),
                "Identity map built"
            );
            map
        }
        Err(e) => {
            warn!(
                tenant = tenant,
                date = %window.date,
                error = %e,
                "Identity scan failed, degrading to authenticated events only"
            );
            IdentityMap::empty()
        }
    }
}
