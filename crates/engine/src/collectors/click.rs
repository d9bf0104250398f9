//! Click collector: template-item click events.
//!
//! Both the current and the legacy item object types count; old clients
//! kept emitting the legacy type long after the rename.

use engine_core::record::{events, object_types};
use engine_core::{DayWindow, EventFilter, EventLogSource, RawRecord, Result};

pub async fn fetch(
    source: &dyn EventLogSource,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<RawRecord>> {
    let filter = EventFilter::for_tenant(tenant).event(events::CLICK).object_types(&[
        object_types::TEMPLATE_ITEM,
        object_types::LEGACY_TEMPLATE_ITEM,
    ]);
    source.query(&filter, window.from, window.to).await
}
