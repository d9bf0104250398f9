//! Conversion collector: publish-success events.

use engine_core::record::events;
use engine_core::{DayWindow, EventFilter, EventLogSource, RawRecord, Result};

pub async fn fetch(
    source: &dyn EventLogSource,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<RawRecord>> {
    let filter = EventFilter::for_tenant(tenant).event(events::PUBLISH_SUCCESS);
    source.query(&filter, window.from, window.to).await
}
