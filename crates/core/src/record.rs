//! Raw event log records.
//!
//! The event log store returns records as arbitrary key-value bags; field
//! presence varies with the query projection, and the engine must tolerate
//! any subset of fields being absent.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names used by event log queries.
pub mod fields {
    pub const EVENT_NAME: &str = "event_name";
    pub const PAGE_TYPE: &str = "page_type";
    pub const OBJECT_TYPE: &str = "object_type";
    pub const OBJECT_ID: &str = "object_id";
    pub const DISTINCT_ID: &str = "distinct_id";
    pub const UID: &str = "uid";
    pub const PLATFORM: &str = "platform";
    pub const TIMESTAMP: &str = "timestamp";
    pub const SEARCH_TERM: &str = "search_term";
}

/// Behavioral event names emitted by the editor clients.
pub mod events {
    pub const PAGE_VIEW: &str = "page_view";
    pub const CLICK: &str = "click";
    pub const SEARCH: &str = "search";
    pub const TEMPLATE_EXPOSURE: &str = "template_exposure";
    /// Client-side evidence of a work creation (paired with the entity-store
    /// work record by the cross-source merger).
    pub const CREATE_CLICK: &str = "create_click";
    pub const PUBLISH_SUCCESS: &str = "publish_success";
}

/// `page_type` values with metric-specific meaning.
pub mod page_types {
    pub const PAYWALL_BLOCK: &str = "paywall_block";
}

/// `object_type` values counted as template interactions.
pub mod object_types {
    pub const TEMPLATE_ITEM: &str = "template_item";
    pub const LEGACY_TEMPLATE_ITEM: &str = "legacy_template_item";
}

/// One record returned by the event log store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord(BTreeMap<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter, used by source adapters and fixtures.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// String field, if present and non-null.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Integer field; numeric strings are accepted since projections of the
    /// event store serialize large ids as strings.
    pub fn i64_field(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Timestamp field: epoch milliseconds or an RFC 3339 string.
    pub fn time_field(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
