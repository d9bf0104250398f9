//! Mock implementations of the store contracts.
//!
//! These implement the same traits as the real ClickHouse/Postgres
//! backends, letting tests drive the full pipeline in memory and verify the
//! exact rows that would be persisted, with per-source failure injection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use engine_core::record::fields;
use engine_core::{
    AdConversion, CampaignConversion, ChannelDailyRow, CohortWindowRow, EntityStore, Error,
    EventFilter, EventLogSource, LedgerStore, OrderRecord, RawRecord, Result, SearchDailyRow,
    StatsSink, TemplateDailyRow, Uid, UserRecord, WorkRecord,
};
use parking_lot::Mutex;

/// In-memory event log applying the same predicate semantics as the
/// ClickHouse source.
#[derive(Default)]
pub struct MockEventLog {
    events: Mutex<Vec<RawRecord>>,
    /// Fail every query.
    fail_all: Mutex<bool>,
    /// Fail queries for one event name (per-collector failure injection).
    fail_event: Mutex<Option<String>>,
    /// Fail only the identity scan (`require_uid` queries).
    fail_identity: Mutex<bool>,
}

impl MockEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: RawRecord) {
        self.events.lock().push(record);
    }

    pub fn extend(&self, records: impl IntoIterator<Item = RawRecord>) {
        self.events.lock().extend(records);
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.lock() = fail;
    }

    pub fn set_fail_event(&self, event_name: Option<&str>) {
        *self.fail_event.lock() = event_name.map(Into::into);
    }

    pub fn set_fail_identity(&self, fail: bool) {
        *self.fail_identity.lock() = fail;
    }

    fn matches(filter: &EventFilter, rec: &RawRecord, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        if let Some(ref name) = filter.event_name {
            if rec.str_field(fields::EVENT_NAME) != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(ref page_type) = filter.page_type {
            if rec.str_field(fields::PAGE_TYPE) != Some(page_type.as_str()) {
                return false;
            }
        }
        if !filter.object_types.is_empty() {
            match rec.str_field(fields::OBJECT_TYPE) {
                Some(t) if filter.object_types.iter().any(|ot| ot == t) => {}
                _ => return false,
            }
        }
        if filter.require_uid && rec.i64_field(fields::UID).is_none() {
            return false;
        }
        match rec.time_field(fields::TIMESTAMP) {
            Some(ts) => ts >= from && ts < to,
            None => false,
        }
    }
}

#[async_trait]
impl EventLogSource for MockEventLog {
    async fn query(
        &self,
        filter: &EventFilter,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RawRecord>> {
        if *self.fail_all.lock() {
            return Err(Error::source_transient("mock event log offline"));
        }
        if filter.require_uid && *self.fail_identity.lock() {
            return Err(Error::source_transient("mock identity scan failure"));
        }
        if let Some(ref failing) = *self.fail_event.lock() {
            if filter.event_name.as_deref() == Some(failing.as_str()) {
                return Err(Error::source(format!("mock failure for {}", failing)));
            }
        }

        Ok(self
            .events
            .lock()
            .iter()
            .filter(|rec| Self::matches(filter, rec, from, to))
            .cloned()
            .collect())
    }
}

/// In-memory entity store.
#[derive(Default)]
pub struct MockEntityStore {
    pub users: Mutex<Vec<UserRecord>>,
    pub campaign: Mutex<Vec<CampaignConversion>>,
    pub ad: Mutex<Vec<AdConversion>>,
    pub works: Mutex<Vec<WorkRecord>>,
    pub tenants: Mutex<Vec<String>>,
    fail_works: Mutex<bool>,
    fail_users: Mutex<bool>,
}

impl MockEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_works(&self, fail: bool) {
        *self.fail_works.lock() = fail;
    }

    pub fn set_fail_users(&self, fail: bool) {
        *self.fail_users.lock() = fail;
    }
}

#[async_trait]
impl EntityStore for MockEntityStore {
    async fn users_by_ids(&self, _tenant: &str, uids: &[Uid]) -> Result<Vec<UserRecord>> {
        if *self.fail_users.lock() {
            return Err(Error::source("mock user query failure"));
        }
        Ok(self
            .users
            .lock()
            .iter()
            .filter(|u| uids.contains(&u.uid))
            .cloned()
            .collect())
    }

    async fn campaign_conversions(
        &self,
        _tenant: &str,
        uids: &[Uid],
    ) -> Result<Vec<CampaignConversion>> {
        Ok(self
            .campaign
            .lock()
            .iter()
            .filter(|c| uids.contains(&c.uid))
            .cloned()
            .collect())
    }

    async fn ad_conversions(&self, _tenant: &str, uids: &[Uid]) -> Result<Vec<AdConversion>> {
        Ok(self
            .ad
            .lock()
            .iter()
            .filter(|a| uids.contains(&a.uid))
            .cloned()
            .collect())
    }

    async fn works_created(
        &self,
        _tenant: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkRecord>> {
        if *self.fail_works.lock() {
            return Err(Error::source("mock works query failure"));
        }
        Ok(self
            .works
            .lock()
            .iter()
            .filter(|w| w.created_at >= from && w.created_at < to)
            .cloned()
            .collect())
    }

    async fn active_tenants(&self) -> Result<Vec<String>> {
        Ok(self.tenants.lock().clone())
    }
}

/// In-memory ledger store.
#[derive(Default)]
pub struct MockLedger {
    pub orders: Mutex<Vec<OrderRecord>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MockLedger {
    async fn paid_orders(
        &self,
        _tenant: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OrderRecord>> {
        Ok(self
            .orders
            .lock()
            .iter()
            .filter(|o| o.paid_at >= from && o.paid_at < to)
            .cloned()
            .collect())
    }
}

/// In-memory statistics sink with natural-key semantics matching the
/// Postgres sink: deletes scoped to (tenant, date), upserts replacing by
/// full natural key.
#[derive(Default)]
pub struct MockSink {
    channel: Mutex<Vec<ChannelDailyRow>>,
    search: Mutex<Vec<SearchDailyRow>>,
    template: Mutex<Vec<TemplateDailyRow>>,
    cohort: Mutex<Vec<CohortWindowRow>>,
    fail_writes: Mutex<bool>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn channel_rows(&self) -> Vec<ChannelDailyRow> {
        self.channel.lock().clone()
    }

    pub fn search_rows(&self) -> Vec<SearchDailyRow> {
        self.search.lock().clone()
    }

    pub fn template_rows(&self) -> Vec<TemplateDailyRow> {
        self.template.lock().clone()
    }

    pub fn cohort_rows(&self) -> Vec<CohortWindowRow> {
        self.cohort.lock().clone()
    }

    fn check_writable(&self) -> Result<()> {
        if *self.fail_writes.lock() {
            Err(Error::sink("mock sink write failure"))
        } else {
            Ok(())
        }
    }
}

fn delete_rows<R>(rows: &mut Vec<R>, tenant: &str, date: NaiveDate, key: impl Fn(&R) -> (String, NaiveDate)) -> u64 {
    let before = rows.len();
    rows.retain(|r| key(r) != (tenant.to_string(), date));
    (before - rows.len()) as u64
}

fn upsert_by_key<R: Clone, K: PartialEq>(rows: &mut Vec<R>, new_rows: &[R], key: impl Fn(&R) -> K) {
    for new_row in new_rows {
        match rows.iter().position(|r| key(r) == key(new_row)) {
            Some(i) => rows[i] = new_row.clone(),
            None => rows.push(new_row.clone()),
        }
    }
}

#[async_trait]
impl StatsSink for MockSink {
    async fn delete_channel_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64> {
        self.check_writable()?;
        Ok(delete_rows(&mut self.channel.lock(), tenant, date, |r| {
            (r.tenant.clone(), r.date)
        }))
    }

    async fn insert_channel_daily(&self, rows: &[ChannelDailyRow]) -> Result<u64> {
        self.check_writable()?;
        self.channel.lock().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn upsert_channel_daily(&self, rows: &[ChannelDailyRow]) -> Result<u64> {
        self.check_writable()?;
        upsert_by_key(&mut self.channel.lock(), rows, |r| {
            (r.tenant.clone(), r.date, r.device, r.channel.clone(), r.cohort)
        });
        Ok(rows.len() as u64)
    }

    async fn delete_search_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64> {
        self.check_writable()?;
        Ok(delete_rows(&mut self.search.lock(), tenant, date, |r| {
            (r.tenant.clone(), r.date)
        }))
    }

    async fn insert_search_daily(&self, rows: &[SearchDailyRow]) -> Result<u64> {
        self.check_writable()?;
        self.search.lock().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn upsert_search_daily(&self, rows: &[SearchDailyRow]) -> Result<u64> {
        self.check_writable()?;
        upsert_by_key(&mut self.search.lock(), rows, |r| {
            (r.tenant.clone(), r.date, r.device, r.search_term.clone())
        });
        Ok(rows.len() as u64)
    }

    async fn delete_template_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64> {
        self.check_writable()?;
        Ok(delete_rows(&mut self.template.lock(), tenant, date, |r| {
            (r.tenant.clone(), r.date)
        }))
    }

    async fn insert_template_daily(&self, rows: &[TemplateDailyRow]) -> Result<u64> {
        self.check_writable()?;
        self.template.lock().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn upsert_template_daily(&self, rows: &[TemplateDailyRow]) -> Result<u64> {
        self.check_writable()?;
        upsert_by_key(&mut self.template.lock(), rows, |r| {
            (r.tenant.clone(), r.date, r.device, r.template_id.clone())
        });
        Ok(rows.len() as u64)
    }

    async fn delete_cohort_window(&self, tenant: &str, date: NaiveDate) -> Result<u64> {
        self.check_writable()?;
        Ok(delete_rows(&mut self.cohort.lock(), tenant, date, |r| {
            (r.tenant.clone(), r.date)
        }))
    }

    async fn insert_cohort_window(&self, rows: &[CohortWindowRow]) -> Result<u64> {
        self.check_writable()?;
        self.cohort.lock().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn upsert_cohort_window(&self, rows: &[CohortWindowRow]) -> Result<u64> {
        self.check_writable()?;
        upsert_by_key(&mut self.cohort.lock(), rows, |r| {
            (r.tenant.clone(), r.date, r.device, r.window_days)
        });
        Ok(rows.len() as u64)
    }
}

/// The full mock store set wired into a [`JobContext`].
pub struct MockStores {
    pub eventlog: Arc<MockEventLog>,
    pub entities: Arc<MockEntityStore>,
    pub ledger: Arc<MockLedger>,
    pub sink: Arc<MockSink>,
}

impl MockStores {
    pub fn new() -> Self {
        Self {
            eventlog: Arc::new(MockEventLog::new()),
            entities: Arc::new(MockEntityStore::new()),
            ledger: Arc::new(MockLedger::new()),
            sink: Arc::new(MockSink::new()),
        }
    }

    pub fn job_context(&self) -> aggregation::JobContext {
        aggregation::JobContext {
            eventlog: self.eventlog.clone(),
            entities: self.entities.clone(),
            ledger: self.ledger.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl Default for MockStores {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{Cohort, Device};

    fn row(tenant: &str, date: NaiveDate, channel: &str) -> ChannelDailyRow {
        ChannelDailyRow {
            tenant: tenant.into(),
            date,
            device: Device::Web,
            channel: channel.into(),
            cohort: Cohort::Old,
            view_pv: 1,
            view_uv: 1,
            click_pv: 0,
            click_uv: 0,
            intercept_pv: 0,
            intercept_uv: 0,
            creation_pv: 0,
            creation_uv: 0,
            conversion_pv: 0,
            conversion_uv: 0,
            order_count: 0,
            gmv: 0.0,
        }
    }

    #[tokio::test]
    async fn test_mock_sink_delete_scoped_to_tenant_and_date() {
        let sink = MockSink::new();
        let d1 = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        sink.insert_channel_daily(&[row("acme", d1, "organic"), row("acme", d2, "organic")])
            .await
            .unwrap();

        let deleted = sink.delete_channel_daily("acme", d1).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(sink.channel_rows().len(), 1);
        assert_eq!(sink.channel_rows()[0].date, d2);
    }

    #[tokio::test]
    async fn test_mock_sink_upsert_replaces_by_natural_key() {
        let sink = MockSink::new();
        let d = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        sink.upsert_channel_daily(&[row("acme", d, "organic")])
            .await
            .unwrap();

        let mut updated = row("acme", d, "organic");
        updated.view_pv = 99;
        sink.upsert_channel_daily(&[updated]).await.unwrap();

        let rows = sink.channel_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].view_pv, 99);
    }
}
