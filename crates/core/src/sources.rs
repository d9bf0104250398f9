//! Abstract contracts for the three external stores and the statistics sink.
//!
//! Concrete backends live in the `eventlog-client` (ClickHouse) and
//! `entity-store` (Postgres) crates; tests substitute in-memory
//! implementations. Handles are constructed at process start and passed by
//! parameter into every component.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::RawRecord;
use crate::stats::{
    ChannelDailyRow, CohortWindowRow, SearchDailyRow, TemplateDailyRow, Uid,
};

/// Predicate for one event log query. Unset fields do not constrain the
/// query; `object_types` is set-membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub tenant: String,
    pub event_name: Option<String>,
    pub page_type: Option<String>,
    pub object_types: Vec<String>,
    /// Only return events carrying a non-null uid (identity resolution scan).
    pub require_uid: bool,
}

impl EventFilter {
    pub fn for_tenant(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            ..Self::default()
        }
    }

    pub fn event(mut self, name: &str) -> Self {
        self.event_name = Some(name.to_string());
        self
    }

    pub fn page_type(mut self, page_type: &str) -> Self {
        self.page_type = Some(page_type.to_string());
        self
    }

    pub fn object_types(mut self, types: &[&str]) -> Self {
        self.object_types = types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_uid_only(mut self) -> Self {
        self.require_uid = true;
        self
    }
}

/// Append-only behavioral event log (queried, never mutated).
#[async_trait]
pub trait EventLogSource: Send + Sync {
    async fn query(
        &self,
        filter: &EventFilter,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<RawRecord>>;
}

/// A user row from the identity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: Uid,
    /// Authoritative registration time.
    pub registered_at: DateTime<Utc>,
    /// Platform recorded at registration; source of the user's stable
    /// device dimension.
    pub platform: Option<String>,
}

/// A paid-campaign conversion joined to its campaign event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConversion {
    pub uid: Uid,
    pub channel: Option<String>,
}

/// An ad-network conversion event report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdConversion {
    pub uid: Uid,
    pub event: String,
    pub report_status: String,
    pub platform: Option<String>,
}

/// A work (content item) created in the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRecord {
    pub uid: Uid,
    pub created_at: DateTime<Utc>,
    pub template_id: Option<String>,
    pub platform: Option<String>,
}

/// A paid order joined with its extension record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub uid: Uid,
    /// Amount in the minor currency unit (cents).
    pub amount_minor: i64,
    pub paid_at: DateTime<Utc>,
}

/// Relational store of business entities (users, works, attribution records).
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Bulk fetch; one query for all uids, never one query per uid.
    async fn users_by_ids(&self, tenant: &str, uids: &[Uid]) -> Result<Vec<UserRecord>>;

    /// Paid-campaign conversions for the given uids (bulk).
    async fn campaign_conversions(
        &self,
        tenant: &str,
        uids: &[Uid],
    ) -> Result<Vec<CampaignConversion>>;

    /// Ad-network conversion reports for the given uids (bulk).
    async fn ad_conversions(&self, tenant: &str, uids: &[Uid]) -> Result<Vec<AdConversion>>;

    /// Works created inside the window.
    async fn works_created(
        &self,
        tenant: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkRecord>>;

    /// Tenants eligible for the default backfill sweep.
    async fn active_tenants(&self) -> Result<Vec<String>>;
}

/// System of record for payments.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Orders with status "paid" whose paid time falls inside the window.
    async fn paid_orders(
        &self,
        tenant: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OrderRecord>>;
}

/// Write surface for the dimensional statistics tables. Deletes are scoped
/// to one (tenant, date); inserts and upserts are batched by the caller.
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn delete_channel_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64>;
    async fn insert_channel_daily(&self, rows: &[ChannelDailyRow]) -> Result<u64>;
    async fn upsert_channel_daily(&self, rows: &[ChannelDailyRow]) -> Result<u64>;

    async fn delete_search_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64>;
    async fn insert_search_daily(&self, rows: &[SearchDailyRow]) -> Result<u64>;
    async fn upsert_search_daily(&self, rows: &[SearchDailyRow]) -> Result<u64>;

    async fn delete_template_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64>;
    async fn insert_template_daily(&self, rows: &[TemplateDailyRow]) -> Result<u64>;
    async fn upsert_template_daily(&self, rows: &[TemplateDailyRow]) -> Result<u64>;

    async fn delete_cohort_window(&self, tenant: &str, date: NaiveDate) -> Result<u64>;
    async fn insert_cohort_window(&self, rows: &[CohortWindowRow]) -> Result<u64>;
    async fn upsert_cohort_window(&self, rows: &[CohortWindowRow]) -> Result<u64>;
}
