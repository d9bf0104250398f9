//! Search collector: search events and search-attributed clicks.

use engine_core::record::{events, fields};
use engine_core::{
    DayWindow, EventFilter, EventLogSource, MetricMap, RawRecord, Result, SearchKey,
};

use super::{fold_events, FoldCtx};

pub async fn fetch(
    source: &dyn EventLogSource,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<RawRecord>> {
    let filter = EventFilter::for_tenant(tenant).event(events::SEARCH);
    source.query(&filter, window.from, window.to).await
}

/// Fold records by (device, search term). Records without a search term do
/// not belong to this report.
pub fn fold_by_term(ctx: &FoldCtx, records: &[RawRecord]) -> MetricMap<SearchKey> {
    fold_events(ctx, records, |ctx, uid, rec| {
        let term = rec.str_field(fields::SEARCH_TERM)?.trim();
        if term.is_empty() {
            return None;
        }
        Some(SearchKey {
            device: ctx.profiles.device(uid, rec.str_field(fields::PLATFORM)),
            search_term: term.to_string(),
        })
    })
}
