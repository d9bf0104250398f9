//! Creation collector: two independent evidence sources for the same
//! logical metric.
//!
//! A work created in the editor produces an entity-store record *and* the
//! client emits a creation-click event; both can fire for the same user
//! action. The two per-dimension maps are unioned by the cross-source
//! merger, never summed.

use engine_core::record::events;
use engine_core::{
    ChannelKey, DayWindow, EntityStore, EventFilter, EventLogSource, MetricMap, RawRecord,
    Result, TemplateKey, WindowKey, WorkRecord,
};

use super::FoldCtx;

/// Client-side evidence: creation-click events.
pub async fn fetch_events(
    source: &dyn EventLogSource,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<RawRecord>> {
    let filter = EventFilter::for_tenant(tenant).event(events::CREATE_CLICK);
    source.query(&filter, window.from, window.to).await
}

/// Entity-store evidence: work records created inside the window.
pub async fn fetch_works(
    entities: &dyn EntityStore,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<WorkRecord>> {
    entities.works_created(tenant, window.from, window.to).await
}

pub fn fold_works_by_channel(ctx: &FoldCtx, works: &[WorkRecord]) -> MetricMap<ChannelKey> {
    let mut map = MetricMap::new();
    for work in works {
        let uid = match ctx.admit_uid(work.uid) {
            Some(uid) => uid,
            None => continue,
        };
        let key = ctx.channel_key(uid, work.platform.as_deref());
        map.entry(key).or_default().hit(uid);
    }
    map
}

pub fn fold_works_by_template(ctx: &FoldCtx, works: &[WorkRecord]) -> MetricMap<TemplateKey> {
    let mut map = MetricMap::new();
    for work in works {
        let uid = match ctx.admit_uid(work.uid) {
            Some(uid) => uid,
            None => continue,
        };
        let template_id = match work.template_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            // Blank-canvas works have no template dimension.
            _ => continue,
        };
        let key = TemplateKey {
            device: ctx.profiles.device(uid, work.platform.as_deref()),
            template_id: template_id.to_string(),
        };
        map.entry(key).or_default().hit(uid);
    }
    map
}

pub fn fold_works_windows(
    ctx: &FoldCtx,
    works: &[WorkRecord],
    windows: &[u32],
) -> MetricMap<WindowKey> {
    let mut map = MetricMap::new();
    for work in works {
        let uid = match ctx.admit_uid(work.uid) {
            Some(uid) => uid,
            None => continue,
        };
        for key in ctx.window_keys(uid, work.created_at, work.platform.as_deref(), windows) {
            map.entry(key).or_default().hit(uid);
        }
    }
    map
}
