//! Idempotent materialization of aggregated rows.
//!
//! Two strategies, both safe to re-run for the same (tenant, date):
//!
//! * **Upsert-by-key** — update-if-exists else insert on the full natural
//!   key. Cheap, but a dimension value that disappears between runs leaves
//!   its old row behind.
//! * **Delete-then-insert** — delete the date's rows, then batch-insert the
//!   freshly computed set. Required when the dimension universe can shrink.
//!
//! Writes go out in batches of 500 with per-batch error accounting, so one
//! failed batch does not discard already-committed batches.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use engine_core::{
    ChannelDailyRow, CohortWindowRow, Result, SearchDailyRow, StatsSink, TemplateDailyRow,
};
use telemetry::metrics;
use tracing::{error, info};

/// Rows per write batch.
pub const WRITE_BATCH_SIZE: usize = 500;

/// How a table's rows are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    UpsertByKey,
    DeleteThenInsert,
}

impl Default for WriteStrategy {
    fn default() -> Self {
        Self::DeleteThenInsert
    }
}

/// Aggregate result of materializing one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeOutcome {
    pub written: u64,
    pub failed: u64,
    pub failed_batches: u32,
    pub deleted: u64,
}

impl MaterializeOutcome {
    pub fn ok(&self) -> bool {
        self.failed == 0
    }

    pub fn merge(&mut self, other: &MaterializeOutcome) {
        self.written += other.written;
        self.failed += other.failed;
        self.failed_batches += other.failed_batches;
        self.deleted += other.deleted;
    }
}

type WriteFut<'a> = Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>>;

/// Strategy-driven write loop shared by all four tables.
async fn write_table<'a, R>(
    table: &'static str,
    strategy: WriteStrategy,
    tenant: &str,
    date: NaiveDate,
    rows: &'a [R],
    delete: impl Fn() -> WriteFut<'a>,
    write_batch: impl Fn(&'a [R]) -> WriteFut<'a>,
) -> MaterializeOutcome {
    let start = std::time::Instant::now();
    let mut outcome = MaterializeOutcome::default();

    // The delete runs even when this run produced no rows: a dimension value
    // with all-zero metrics must not leave a stale nonzero row behind.
    if strategy == WriteStrategy::DeleteThenInsert {
        match delete().await {
            Ok(deleted) => outcome.deleted = deleted,
            Err(e) => {
                // Inserting on top of stale rows would double them; give up
                // on this table and let the next run replace it wholesale.
                error!(table = table, tenant = tenant, date = %date, error = %e,
                    "Delete failed, skipping table");
                outcome.failed = rows.len() as u64;
                outcome.failed_batches = rows.chunks(WRITE_BATCH_SIZE).len() as u32;
                metrics().rows_failed.inc_by(outcome.failed);
                return outcome;
            }
        }
    }

    for batch in rows.chunks(WRITE_BATCH_SIZE) {
        match write_batch(batch).await {
            Ok(written) => {
                outcome.written += written;
                metrics().rows_written.inc_by(written);
            }
            Err(e) => {
                outcome.failed += batch.len() as u64;
                outcome.failed_batches += 1;
                metrics().rows_failed.inc_by(batch.len() as u64);
                metrics().batches_failed.inc();
                error!(
                    table = table,
                    tenant = tenant,
                    date = %date,
                    batch_size = batch.len(),
                    error = %e,
                    "Statistics batch write failed"
                );
            }
        }
    }

    metrics()
        .materialize_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    info!(
        table = table,
        tenant = tenant,
        date = %date,
        strategy = ?strategy,
        written = outcome.written,
        failed = outcome.failed,
        deleted = outcome.deleted,
        "Materialized statistics table"
    );

    outcome
}

pub async fn write_channel_daily<'a>(
    sink: &'a dyn StatsSink,
    strategy: WriteStrategy,
    tenant: &'a str,
    date: NaiveDate,
    rows: &'a [ChannelDailyRow],
) -> MaterializeOutcome {
    write_table(
        "stats_channel_daily",
        strategy,
        tenant,
        date,
        rows,
        || Box::pin(sink.delete_channel_daily(tenant, date)),
        move |batch| match strategy {
            WriteStrategy::DeleteThenInsert => Box::pin(sink.insert_channel_daily(batch)),
            WriteStrategy::UpsertByKey => Box::pin(sink.upsert_channel_daily(batch)),
        },
    )
    .await
}

pub async fn write_search_daily<'a>(
    sink: &'a dyn StatsSink,
    strategy: WriteStrategy,
    tenant: &'a str,
    date: NaiveDate,
    rows: &'a [SearchDailyRow],
) -> MaterializeOutcome {
    write_table(
        "stats_search_daily",
        strategy,
        tenant,
        date,
        rows,
        || Box::pin(sink.delete_search_daily(tenant, date)),
        move |batch| match strategy {
            WriteStrategy::DeleteThenInsert => Box::pin(sink.insert_search_daily(batch)),
            WriteStrategy::UpsertByKey => Box::pin(sink.upsert_search_daily(batch)),
        },
    )
    .await
}

pub async fn write_template_daily<'a>(
    sink: &'a dyn StatsSink,
    strategy: WriteStrategy,
    tenant: &'a str,
    date: NaiveDate,
    rows: &'a [TemplateDailyRow],
) -> MaterializeOutcome {
    write_table(
        "stats_template_daily",
        strategy,
        tenant,
        date,
        rows,
        || Box::pin(sink.delete_template_daily(tenant, date)),
        move |batch| match strategy {
            WriteStrategy::DeleteThenInsert => Box::pin(sink.insert_template_daily(batch)),
            WriteStrategy::UpsertByKey => Box::pin(sink.upsert_template_daily(batch)),
        },
    )
    .await
}

pub async fn write_cohort_window<'a>(
    sink: &'a dyn StatsSink,
    strategy: WriteStrategy,
    tenant: &'a str,
    date: NaiveDate,
    rows: &'a [CohortWindowRow],
) -> MaterializeOutcome {
    write_table(
        "stats_cohort_window",
        strategy,
        tenant,
        date,
        rows,
        || Box::pin(sink.delete_cohort_window(tenant, date)),
        move |batch| match strategy {
            WriteStrategy::DeleteThenInsert => Box::pin(sink.insert_cohort_window(batch)),
            WriteStrategy::UpsertByKey => Box::pin(sink.upsert_cohort_window(batch)),
        },
    )
    .await
}
