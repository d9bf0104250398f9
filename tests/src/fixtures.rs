//! Test fixtures and record generators.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use engine_core::record::{events, fields, object_types, page_types};
use engine_core::{OrderRecord, RawRecord, Uid, UserRecord, WorkRecord};

pub const TENANT: &str = "acme";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A timestamp inside the given date.
pub fn at(d: NaiveDate, h: u32, min: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_hms_opt(h, min, 0).unwrap())
}

fn base_event(name: &str, ts: DateTime<Utc>, platform: &str) -> RawRecord {
    RawRecord::new()
        .with(fields::EVENT_NAME, name)
        .with(fields::TIMESTAMP, ts.timestamp_millis())
        .with(fields::PLATFORM, platform)
}

fn with_identity(mut rec: RawRecord, distinct_id: Option<&str>, uid: Option<Uid>) -> RawRecord {
    if let Some(id) = distinct_id {
        rec = rec.with(fields::DISTINCT_ID, id);
    }
    if let Some(uid) = uid {
        rec = rec.with(fields::UID, uid);
    }
    rec
}

/// A page view; carries both ids when present, so it also feeds the
/// identity scan.
pub fn page_view(
    distinct_id: Option<&str>,
    uid: Option<Uid>,
    ts: DateTime<Utc>,
    platform: &str,
) -> RawRecord {
    with_identity(base_event(events::PAGE_VIEW, ts, platform), distinct_id, uid)
}

/// A paywall-block page view (intercept evidence).
pub fn paywall_view(uid: Uid, ts: DateTime<Utc>, platform: &str) -> RawRecord {
    base_event(events::PAGE_VIEW, ts, platform)
        .with(fields::PAGE_TYPE, page_types::PAYWALL_BLOCK)
        .with(fields::UID, uid)
}

/// A template-item click.
pub fn template_click(
    distinct_id: Option<&str>,
    uid: Option<Uid>,
    ts: DateTime<Utc>,
    platform: &str,
) -> RawRecord {
    with_identity(
        base_event(events::CLICK, ts, platform).with(fields::OBJECT_TYPE, object_types::TEMPLATE_ITEM),
        distinct_id,
        uid,
    )
}

/// A legacy-type template click (old clients).
pub fn legacy_template_click(uid: Uid, ts: DateTime<Utc>, platform: &str) -> RawRecord {
    base_event(events::CLICK, ts, platform)
        .with(fields::OBJECT_TYPE, object_types::LEGACY_TEMPLATE_ITEM)
        .with(fields::UID, uid)
}

/// A template click attributed to a search term and template.
pub fn search_result_click(
    uid: Uid,
    ts: DateTime<Utc>,
    platform: &str,
    term: &str,
    template_id: &str,
) -> RawRecord {
    template_click(None, Some(uid), ts, platform)
        .with(fields::SEARCH_TERM, term)
        .with(fields::OBJECT_ID, template_id)
}

pub fn search_event(uid: Uid, ts: DateTime<Utc>, platform: &str, term: &str) -> RawRecord {
    base_event(events::SEARCH, ts, platform)
        .with(fields::UID, uid)
        .with(fields::SEARCH_TERM, term)
}

pub fn template_exposure(uid: Uid, ts: DateTime<Utc>, platform: &str, template_id: &str) -> RawRecord {
    base_event(events::TEMPLATE_EXPOSURE, ts, platform)
        .with(fields::UID, uid)
        .with(fields::OBJECT_ID, template_id)
}

pub fn create_click(uid: Uid, ts: DateTime<Utc>, platform: &str) -> RawRecord {
    base_event(events::CREATE_CLICK, ts, platform).with(fields::UID, uid)
}

pub fn publish_success(uid: Uid, ts: DateTime<Utc>, platform: &str) -> RawRecord {
    base_event(events::PUBLISH_SUCCESS, ts, platform).with(fields::UID, uid)
}

pub fn user(uid: Uid, registered: NaiveDate, platform: &str) -> UserRecord {
    UserRecord {
        uid,
        registered_at: at(registered, 10, 0),
        platform: Some(platform.to_string()),
    }
}

pub fn work(uid: Uid, ts: DateTime<Utc>, template_id: Option<&str>, platform: &str) -> WorkRecord {
    WorkRecord {
        uid,
        created_at: ts,
        template_id: template_id.map(Into::into),
        platform: Some(platform.to_string()),
    }
}

pub fn order(order_id: &str, uid: Uid, amount_minor: i64, paid_at: DateTime<Utc>) -> OrderRecord {
    OrderRecord {
        order_id: order_id.to_string(),
        uid,
        amount_minor,
        paid_at,
    }
}
