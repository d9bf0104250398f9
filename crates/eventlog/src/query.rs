//! Event log queries: filter → SQL, projection rows → raw records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use engine_core::record::fields;
use engine_core::{Error, EventFilter, EventLogSource, RawRecord, Result};
use serde::Deserialize;
use telemetry::metrics;
use tracing::debug;

use crate::client::EventLogClient;
use crate::retry::RetryPolicy;

/// Fixed projection of the events table. Every column except the tenant and
/// timestamp is nullable; absent fields are simply not carried into the
/// resulting record.
#[derive(Debug, Clone, Row, Deserialize)]
struct EventProjection {
    event_name: String,
    page_type: Option<String>,
    object_type: Option<String>,
    object_id: Option<String>,
    distinct_id: Option<String>,
    uid: Option<i64>,
    platform: Option<String>,
    timestamp: i64, // milliseconds since epoch
    search_term: Option<String>,
}

impl From<EventProjection> for RawRecord {
    fn from(row: EventProjection) -> Self {
        let mut rec = RawRecord::new()
            .with(fields::EVENT_NAME, row.event_name)
            .with(fields::TIMESTAMP, row.timestamp);
        if let Some(v) = row.page_type {
            rec = rec.with(fields::PAGE_TYPE, v);
        }
        if let Some(v) = row.object_type {
            rec = rec.with(fields::OBJECT_TYPE, v);
        }
        if let Some(v) = row.object_id {
            rec = rec.with(fields::OBJECT_ID, v);
        }
        if let Some(v) = row.distinct_id {
            rec = rec.with(fields::DISTINCT_ID, v);
        }
        if let Some(v) = row.uid {
            rec = rec.with(fields::UID, v);
        }
        if let Some(v) = row.platform {
            rec = rec.with(fields::PLATFORM, v);
        }
        if let Some(v) = row.search_term {
            rec = rec.with(fields::SEARCH_TERM, v);
        }
        rec
    }
}

/// Classify a ClickHouse error for the retry layer. Compression/decoding
/// problems, timeouts, and connection drops are transient; everything else
/// (bad query, auth) is not.
fn classify(e: &clickhouse::error::Error) -> Error {
    classify_message(e.to_string())
}

fn classify_message(message: String) -> Error {
    const TRANSIENT_MARKERS: &[&str] = &[
        "timeout",
        "timed out",
        "connection reset",
        "connection refused",
        "connection closed",
        "broken pipe",
        "compression",
        "decompress",
        "decode",
        "unexpected end",
        "network",
    ];

    let lower = message.to_ascii_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        Error::source_transient(message)
    } else {
        Error::source(message)
    }
}

/// ClickHouse-backed implementation of [`EventLogSource`].
pub struct ClickHouseEventLog {
    client: EventLogClient,
    retry: RetryPolicy,
}

impl ClickHouseEventLog {
    pub fn new(client: EventLogClient) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(client: EventLogClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Build the query SQL for a filter. Bind order: tenant, from, to, then
    /// optional predicates in declaration order.
    fn build_sql(&self, filter: &EventFilter) -> String {
        let mut sql = format!(
            "SELECT event_name, page_type, object_type, object_id, distinct_id, uid, \
             platform, timestamp, search_term FROM {}.events \
             WHERE tenant = ? AND timestamp >= ? AND timestamp < ?",
            self.client.config().database
        );

        if filter.event_name.is_some() {
            sql.push_str(" AND event_name = ?");
        }
        if filter.page_type.is_some() {
            sql.push_str(" AND page_type = ?");
        }
        if !filter.object_types.is_empty() {
            let placeholders = vec!["?"; filter.object_types.len()].join(", ");
            sql.push_str(&format!(" AND object_type IN ({})", placeholders));
        }
        if filter.require_uid {
            sql.push_str(" AND uid IS NOT NULL");
        }

        sql
    }

    async fn fetch(
        &self,
        filter: &EventFilter,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RawRecord>> {
        let sql = self.build_sql(filter);

        let mut query = self
            .client
            .inner()
            .query(&sql)
            .bind(filter.tenant.as_str())
            .bind(from.timestamp_millis())
            .bind(to.timestamp_millis());

        if let Some(ref name) = filter.event_name {
            query = query.bind(name.as_str());
        }
        if let Some(ref page_type) = filter.page_type {
            query = query.bind(page_type.as_str());
        }
        for object_type in &filter.object_types {
            query = query.bind(object_type.as_str());
        }

        let rows: Vec<EventProjection> = query.fetch_all().await.map_err(|e| classify(&e))?;

        Ok(rows.into_iter().map(RawRecord::from).collect())
    }
}

#[async_trait]
impl EventLogSource for ClickHouseEventLog {
    async fn query(
        &self,
        filter: &EventFilter,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RawRecord>> {
        let start = std::time::Instant::now();
        metrics().source_queries.inc();

        let result = self
            .retry
            .run("eventlog.query", || self.fetch(filter, from, to))
            .await;

        let elapsed = start.elapsed();
        metrics()
            .source_query_latency_ms
            .observe(elapsed.as_millis() as u64);

        match result {
            Ok(records) => {
                metrics().records_scanned.inc_by(records.len() as u64);
                debug!(
                    tenant = %filter.tenant,
                    event = filter.event_name.as_deref().unwrap_or("*"),
                    count = records.len(),
                    latency_ms = %elapsed.as_millis(),
                    "Event log query complete"
                );
                Ok(records)
            }
            Err(e) => {
                metrics().source_query_errors.inc();
                Err(e)
            }
        }
    }
}
