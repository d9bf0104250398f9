//! Metric collectors.
//!
//! Each collector pairs a *fetch* (one or more source queries scoped to the
//! window and a metric-specific predicate) with a *fold* (pure accumulation
//! of per-dimension PV/UV). Fetches run concurrently under independent
//! failure domains: a collector whose source is down yields empty output and
//! the sibling collectors are unaffected. Folds run after profile and
//! channel resolution, which is a hard ordering dependency.

pub mod click;
pub mod conversion;
pub mod creation;
pub mod intercept;
pub mod order;
pub mod search;
pub mod template;
pub mod view;

use std::future::Future;

use chrono::NaiveDate;
use engine_core::accounts::is_internal_account;
use engine_core::record::fields;
use engine_core::{
    ChannelKey, CohortBuckets, MetricMap, RawRecord, Uid, WindowKey,
};
use telemetry::metrics;
use tracing::warn;

use crate::channel::ChannelMap;
use crate::identity::IdentityMap;
use crate::profile::UserProfiles;

/// Resolution context shared by every fold: identity map, per-run profile
/// and channel caches, cohort bucket bounds, and the statistics date.
pub struct FoldCtx<'a> {
    pub identity: &'a IdentityMap,
    pub profiles: &'a UserProfiles,
    pub channels: &'a ChannelMap,
    pub buckets: &'a CohortBuckets,
    pub date: NaiveDate,
}

impl FoldCtx<'_> {
    /// The uid a record counts toward, or `None` if the record should be
    /// skipped (unresolvable or an internal test account).
    pub fn effective_uid(&self, rec: &RawRecord) -> Option<Uid> {
        let uid = self.identity.effective_uid(
            rec.i64_field(fields::UID),
            rec.str_field(fields::DISTINCT_ID),
        );
        match uid {
            None => {
                metrics().events_without_uid.inc();
                None
            }
            Some(uid) => self.admit_uid(uid),
        }
    }

    /// Internal-account filter for sources that carry a uid directly
    /// (works, orders).
    pub fn admit_uid(&self, uid: Uid) -> Option<Uid> {
        if is_internal_account(uid) {
            metrics().internal_events_skipped.inc();
            None
        } else {
            Some(uid)
        }
    }

    /// The channel-job dimension key for a user.
    pub fn channel_key(&self, uid: Uid, event_platform: Option<&str>) -> ChannelKey {
        ChannelKey {
            device: self.profiles.device(uid, event_platform),
            channel: self.channels.channel(uid).to_string(),
            cohort: self.profiles.cohort(uid, self.date, self.buckets),
        }
    }

    /// Window-job keys for a behavior timestamp: one per configured window
    /// the timestamp falls into, anchored to the user's own registration
    /// date. Users without a known registration date are in no window.
    pub fn window_keys(
        &self,
        uid: Uid,
        behavior_ts: chrono::DateTime<chrono::Utc>,
        event_platform: Option<&str>,
        windows: &[u32],
    ) -> Vec<WindowKey> {
        let registration = match self.profiles.registration(uid) {
            Some(d) => d,
            None => return Vec::new(),
        };
        let device = self.profiles.device(uid, event_platform);
        windows
            .iter()
            .filter(|&&w| engine_core::cohort::in_window(registration, behavior_ts, w))
            .map(|&w| WindowKey {
                device,
                window_days: w,
            })
            .collect()
    }
}

/// Fold event records into a per-dimension metric map. `key_of` returning
/// `None` skips the record.
pub fn fold_events<K: Ord>(
    ctx: &FoldCtx,
    records: &[RawRecord],
    key_of: impl Fn(&FoldCtx, Uid, &RawRecord) -> Option<K>,
) -> MetricMap<K> {
    let mut map = MetricMap::new();
    for rec in records {
        let uid = match ctx.effective_uid(rec) {
            Some(uid) => uid,
            None => continue,
        };
        if let Some(key) = key_of(ctx, uid, rec) {
            map.entry(key).or_default().hit(uid);
        }
    }
    map
}

/// The common channel-dimension fold: device from the user profile (event
/// platform as fallback), channel and cohort from the per-run caches.
pub fn fold_by_channel(ctx: &FoldCtx, records: &[RawRecord]) -> MetricMap<ChannelKey> {
    fold_events(ctx, records, |ctx, uid, rec| {
        Some(ctx.channel_key(uid, rec.str_field(fields::PLATFORM)))
    })
}

/// Window-dimension fold over event records: one hit per window the
/// behavior timestamp falls into.
pub fn fold_events_windows(
    ctx: &FoldCtx,
    records: &[RawRecord],
    windows: &[u32],
) -> MetricMap<WindowKey> {
    let mut map = MetricMap::new();
    for rec in records {
        let uid = match ctx.effective_uid(rec) {
            Some(uid) => uid,
            None => continue,
        };
        let ts = match rec.time_field(fields::TIMESTAMP) {
            Some(ts) => ts,
            None => continue,
        };
        for key in ctx.window_keys(uid, ts, rec.str_field(fields::PLATFORM), windows) {
            map.entry(key).or_default().hit(uid);
        }
    }
    map
}

/// Run one collector fetch in its own failure domain: a failed source query
/// is logged and degraded to the default (empty) value.
pub async fn fetch_or_default<T, Fut>(name: &'static str, fut: Fut) -> T
where
    T: Default,
    Fut: Future<Output = engine_core::Result<T>>,
{
    match fut.await {
        Ok(v) => v,
        Err(e) => {
            metrics().collector_failures.inc();
            warn!(collector = name, error = %e, "Collector source failed, using empty output");
            T::default()
        }
    }
}
