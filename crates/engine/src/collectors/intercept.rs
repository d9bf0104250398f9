//! Intercept collector: paywall-block page views.

use engine_core::record::{events, page_types};
use engine_core::{DayWindow, EventFilter, EventLogSource, RawRecord, Result};

pub async fn fetch(
    source: &dyn EventLogSource,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<RawRecord>> {
    let filter = EventFilter::for_tenant(tenant)
        .event(events::PAGE_VIEW)
        .page_type(page_types::PAYWALL_BLOCK);
    source.query(&filter, window.from, window.to).await
}
