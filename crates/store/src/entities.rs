//! Entity store reads: users, attribution records, works, tenants.
//!
//! Every uid-scoped read is a single bulk query (`= ANY($1)`); cohort sizes
//! reach tens of thousands of uids per day.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{
    AdConversion, CampaignConversion, EntityStore, Error, Result, Uid, UserRecord, WorkRecord,
};
use sqlx::FromRow;

use crate::client::PostgresStore;

#[derive(Debug, FromRow)]
struct UserRow {
    uid: i64,
    registered_at: DateTime<Utc>,
    platform: Option<String>,
}

#[derive(Debug, FromRow)]
struct CampaignConversionRow {
    uid: i64,
    channel: Option<String>,
}

#[derive(Debug, FromRow)]
struct AdConversionRow {
    uid: i64,
    event: String,
    report_status: String,
    platform: Option<String>,
}

#[derive(Debug, FromRow)]
struct WorkRow {
    uid: i64,
    created_at: DateTime<Utc>,
    template_id: Option<String>,
    platform: Option<String>,
}

fn query_err(e: sqlx::Error) -> Error {
    Error::source(format!("Entity store query error: {}", e))
}

#[async_trait]
impl EntityStore for PostgresStore {
    async fn users_by_ids(&self, tenant: &str, uids: &[Uid]) -> Result<Vec<UserRecord>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT uid, registered_at, platform FROM users \
             WHERE tenant = $1 AND uid = ANY($2)",
        )
        .bind(tenant)
        .bind(uids)
        .fetch_all(self.pool())
        .await
        .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|r| UserRecord {
                uid: r.uid,
                registered_at: r.registered_at,
                platform: r.platform,
            })
            .collect())
    }

    async fn campaign_conversions(
        &self,
        tenant: &str,
        uids: &[Uid],
    ) -> Result<Vec<CampaignConversion>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<CampaignConversionRow> = sqlx::query_as(
            "SELECT l.uid, c.channel FROM campaign_conversion_links l \
             JOIN campaign_events c ON c.id = l.campaign_event_id \
             WHERE l.tenant = $1 AND l.uid = ANY($2)",
        )
        .bind(tenant)
        .bind(uids)
        .fetch_all(self.pool())
        .await
        .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|r| CampaignConversion {
                uid: r.uid,
                channel: r.channel,
            })
            .collect())
    }

    async fn ad_conversions(&self, tenant: &str, uids: &[Uid]) -> Result<Vec<AdConversion>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<AdConversionRow> = sqlx::query_as(
            "SELECT uid, event, report_status, platform FROM ad_conversion_events \
             WHERE tenant = $1 AND uid = ANY($2)",
        )
        .bind(tenant)
        .bind(uids)
        .fetch_all(self.pool())
        .await
        .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|r| AdConversion {
                uid: r.uid,
                event: r.event,
                report_status: r.report_status,
                platform: r.platform,
            })
            .collect())
    }

    async fn works_created(
        &self,
        tenant: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<WorkRecord>> {
        let rows: Vec<WorkRow> = sqlx::query_as(
            "SELECT uid, created_at, template_id, platform FROM works \
             WHERE tenant = $1 AND created_at >= $2 AND created_at < $3",
        )
        .bind(tenant)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await
        .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|r| WorkRecord {
                uid: r.uid,
                created_at: r.created_at,
                template_id: r.template_id,
                platform: r.platform,
            })
            .collect())
    }

    async fn active_tenants(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT slug FROM tenants WHERE active ORDER BY slug")
                .fetch_all(self.pool())
                .await
                .map_err(query_err)?;

        Ok(rows.into_iter().map(|(slug,)| slug).collect())
    }
}
