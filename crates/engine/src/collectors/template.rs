//! Template collector: exposure and click events keyed by template id.

use engine_core::record::{events, fields};
use engine_core::{
    DayWindow, EventFilter, EventLogSource, MetricMap, RawRecord, Result, TemplateKey,
};

use super::{fold_events, FoldCtx};

pub async fn fetch_exposures(
    source: &dyn EventLogSource,
    tenant: &str,
    window: &DayWindow,
) -> Result<Vec<RawRecord>> {
    let filter = EventFilter::for_tenant(tenant).event(events::TEMPLATE_EXPOSURE);
    source.query(&filter, window.from, window.to).await
}

/// Fold records by (device, template id), taken from the object id. Records
/// without an object id do not belong to this report.
pub fn fold_by_template(ctx: &FoldCtx, records: &[RawRecord]) -> MetricMap<TemplateKey> {
    fold_events(ctx, records, |ctx, uid, rec| {
        let template_id = rec.str_field(fields::OBJECT_ID)?;
        if template_id.is_empty() {
            return None;
        }
        Some(TemplateKey {
            device: ctx.profiles.device(uid, rec.str_field(fields::PLATFORM)),
            template_id: template_id.to_string(),
        })
    })
}
