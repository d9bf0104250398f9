//! Statistics sink: per-table delete / insert / upsert over the dimensional
//! daily tables.
//!
//! Deletes are always scoped to one (tenant, date) so a delete-then-insert
//! run replaces a date's rows as a unit. Inserts run inside a transaction;
//! the caller batches rows (the materializer uses batches of 500).

use async_trait::async_trait;
use chrono::NaiveDate;
use engine_core::{
    ChannelDailyRow, CohortWindowRow, Error, Result, SearchDailyRow, StatsSink, TemplateDailyRow,
};
use tracing::debug;

use crate::client::PostgresStore;

fn write_err(e: sqlx::Error) -> Error {
    Error::sink(format!("Statistics write error: {}", e))
}

impl PostgresStore {
    async fn delete_for_date(&self, table: &str, tenant: &str, date: NaiveDate) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE tenant = $1 AND date = $2", table);
        let result = sqlx::query(&sql)
            .bind(tenant)
            .bind(date)
            .execute(self.pool())
            .await
            .map_err(write_err)?;

        debug!(
            table = table,
            tenant = tenant,
            date = %date,
            deleted = result.rows_affected(),
            "Deleted statistics rows for date"
        );
        Ok(result.rows_affected())
    }
}

const CHANNEL_DAILY_COLUMNS: &str = "tenant, date, device, channel, cohort, \
     view_pv, view_uv, click_pv, click_uv, intercept_pv, intercept_uv, \
     creation_pv, creation_uv, conversion_pv, conversion_uv, order_count, gmv";

const CHANNEL_DAILY_UPDATES: &str = "view_pv = EXCLUDED.view_pv, view_uv = EXCLUDED.view_uv, \
     click_pv = EXCLUDED.click_pv, click_uv = EXCLUDED.click_uv, \
     intercept_pv = EXCLUDED.intercept_pv, intercept_uv = EXCLUDED.intercept_uv, \
     creation_pv = EXCLUDED.creation_pv, creation_uv = EXCLUDED.creation_uv, \
     conversion_pv = EXCLUDED.conversion_pv, conversion_uv = EXCLUDED.conversion_uv, \
     order_count = EXCLUDED.order_count, gmv = EXCLUDED.gmv";

fn bind_channel_row<'q>(
    sql: &'q str,
    row: &'q ChannelDailyRow,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(sql)
        .bind(&row.tenant)
        .bind(row.date)
        .bind(row.device.as_str())
        .bind(&row.channel)
        .bind(row.cohort.as_str())
        .bind(row.view_pv as i64)
        .bind(row.view_uv as i64)
        .bind(row.click_pv as i64)
        .bind(row.click_uv as i64)
        .bind(row.intercept_pv as i64)
        .bind(row.intercept_uv as i64)
        .bind(row.creation_pv as i64)
        .bind(row.creation_uv as i64)
        .bind(row.conversion_pv as i64)
        .bind(row.conversion_uv as i64)
        .bind(row.order_count as i64)
        .bind(row.gmv)
}

const SEARCH_DAILY_COLUMNS: &str =
    "tenant, date, device, search_term, search_pv, search_uv, click_pv, click_uv";

const SEARCH_DAILY_UPDATES: &str = "search_pv = EXCLUDED.search_pv, \
     search_uv = EXCLUDED.search_uv, click_pv = EXCLUDED.click_pv, \
     click_uv = EXCLUDED.click_uv";

fn bind_search_row<'q>(
    sql: &'q str,
    row: &'q SearchDailyRow,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(sql)
        .bind(&row.tenant)
        .bind(row.date)
        .bind(row.device.as_str())
        .bind(&row.search_term)
        .bind(row.search_pv as i64)
        .bind(row.search_uv as i64)
        .bind(row.click_pv as i64)
        .bind(row.click_uv as i64)
}

const TEMPLATE_DAILY_COLUMNS: &str = "tenant, date, device, template_id, \
     exposure_pv, exposure_uv, click_pv, click_uv, creation_pv, creation_uv";

const TEMPLATE_DAILY_UPDATES: &str = "exposure_pv = EXCLUDED.exposure_pv, \
     exposure_uv = EXCLUDED.exposure_uv, click_pv = EXCLUDED.click_pv, \
     click_uv = EXCLUDED.click_uv, creation_pv = EXCLUDED.creation_pv, \
     creation_uv = EXCLUDED.creation_uv";

fn bind_template_row<'q>(
    sql: &'q str,
    row: &'q TemplateDailyRow,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(sql)
        .bind(&row.tenant)
        .bind(row.date)
        .bind(row.device.as_str())
        .bind(&row.template_id)
        .bind(row.exposure_pv as i64)
        .bind(row.exposure_uv as i64)
        .bind(row.click_pv as i64)
        .bind(row.click_uv as i64)
        .bind(row.creation_pv as i64)
        .bind(row.creation_uv as i64)
}

const COHORT_WINDOW_COLUMNS: &str = "tenant, date, device, window_days, \
     creation_pv, creation_uv, conversion_pv, conversion_uv, order_count, gmv";

const COHORT_WINDOW_UPDATES: &str = "creation_pv = EXCLUDED.creation_pv, \
     creation_uv = EXCLUDED.creation_uv, conversion_pv = EXCLUDED.conversion_pv, \
     conversion_uv = EXCLUDED.conversion_uv, order_count = EXCLUDED.order_count, \
     gmv = EXCLUDED.gmv";

fn bind_cohort_row<'q>(
    sql: &'q str,
    row: &'q CohortWindowRow,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(sql)
        .bind(&row.tenant)
        .bind(row.date)
        .bind(row.device.as_str())
        .bind(row.window_days as i32)
        .bind(row.creation_pv as i64)
        .bind(row.creation_uv as i64)
        .bind(row.conversion_pv as i64)
        .bind(row.conversion_uv as i64)
        .bind(row.order_count as i64)
        .bind(row.gmv)
}

fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

macro_rules! insert_rows {
    ($self:expr, $rows:expr, $table:expr, $columns:expr, $ncols:expr, $bind:ident) => {{
        if $rows.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            $table,
            $columns,
            placeholders($ncols)
        );

        let mut tx = $self.pool().begin().await.map_err(write_err)?;
        for row in $rows {
            $bind(&sql, row).execute(&mut *tx).await.map_err(write_err)?;
        }
        tx.commit().await.map_err(write_err)?;

        Ok($rows.len() as u64)
    }};
}

macro_rules! upsert_rows {
    ($self:expr, $rows:expr, $table:expr, $columns:expr, $ncols:expr, $key:expr, $updates:expr, $bind:ident) => {{
        if $rows.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
            $table,
            $columns,
            placeholders($ncols),
            $key,
            $updates
        );

        let mut tx = $self.pool().begin().await.map_err(write_err)?;
        for row in $rows {
            $bind(&sql, row).execute(&mut *tx).await.map_err(write_err)?;
        }
        tx.commit().await.map_err(write_err)?;

        Ok($rows.len() as u64)
    }};
}

#[async_trait]
impl StatsSink for PostgresStore {
    async fn delete_channel_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64> {
        self.delete_for_date("stats_channel_daily", tenant, date).await
    }

    async fn insert_channel_daily(&self, rows: &[ChannelDailyRow]) -> Result<u64> {
        insert_rows!(
            self,
            rows,
            "stats_channel_daily",
            CHANNEL_DAILY_COLUMNS,
            17,
            bind_channel_row
        )
    }

    async fn upsert_channel_daily(&self, rows: &[ChannelDailyRow]) -> Result<u64> {
        upsert_rows!(
            self,
            rows,
            "stats_channel_daily",
            CHANNEL_DAILY_COLUMNS,
            17,
            "tenant, date, device, channel, cohort",
            CHANNEL_DAILY_UPDATES,
            bind_channel_row
        )
    }

    async fn delete_search_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64> {
        self.delete_for_date("stats_search_daily", tenant, date).await
    }

    async fn insert_search_daily(&self, rows: &[SearchDailyRow]) -> Result<u64> {
        insert_rows!(
            self,
            rows,
            "stats_search_daily",
            SEARCH_DAILY_COLUMNS,
            8,
            bind_search_row
        )
    }

    async fn upsert_search_daily(&self, rows: &[SearchDailyRow]) -> Result<u64> {
        upsert_rows!(
            self,
            rows,
            "stats_search_daily",
            SEARCH_DAILY_COLUMNS,
            8,
            "tenant, date, device, search_term",
            SEARCH_DAILY_UPDATES,
            bind_search_row
        )
    }

    async fn delete_template_daily(&self, tenant: &str, date: NaiveDate) -> Result<u64> {
        self.delete_for_date("stats_template_daily", tenant, date).await
    }

    async fn insert_template_daily(&self, rows: &[TemplateDailyRow]) -> Result<u64> {
        insert_rows!(
            self,
            rows,
            "stats_template_daily",
            TEMPLATE_DAILY_COLUMNS,
            10,
            bind_template_row
        )
    }

    async fn upsert_template_daily(&self, rows: &[TemplateDailyRow]) -> Result<u64> {
        upsert_rows!(
            self,
            rows,
            "stats_template_daily",
            TEMPLATE_DAILY_COLUMNS,
            10,
            "tenant, date, device, template_id",
            TEMPLATE_DAILY_UPDATES,
            bind_template_row
        )
    }

    async fn delete_cohort_window(&self, tenant: &str, date: NaiveDate) -> Result<u64> {
        self.delete_for_date("stats_cohort_window", tenant, date).await
    }

    async fn insert_cohort_window(&self, rows: &[CohortWindowRow]) -> Result<u64> {
        insert_rows!(
            self,
            rows,
            "stats_cohort_window",
            COHORT_WINDOW_COLUMNS,
            10,
            bind_cohort_row
        )
    }

    async fn upsert_cohort_window(&self, rows: &[CohortWindowRow]) -> Result<u64> {
        upsert_rows!(
            self,
            rows,
            "stats_cohort_window",
            COHORT_WINDOW_COLUMNS,
            10,
            "tenant, date, device, window_days",
            COHORT_WINDOW_UPDATES,
            bind_cohort_row
        )
    }
}
