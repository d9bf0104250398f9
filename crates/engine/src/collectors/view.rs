//! View collector: page-view events.

use engine_core::record::events;
use engine_core::{DayWindow, EventFilter, EventLogSource, RawRecord, Result};

pub async fn fetch(
    source: &dyn EventLogSource,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<RawRecord>> {
    let filter = EventFilter::for_tenant(tenant).event(events::PAGE_VIEW);
    source.query(&filter, window.from, window.to).await
}
