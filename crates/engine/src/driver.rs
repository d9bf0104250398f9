//! Outer job driver: single runs and the multi-tenant backfill sweep.
//!
//! The sweep iterates (tenant, date) pairs in bounded-size concurrent
//! batches to cap load on the shared source stores; each batch settles
//! before the next starts. A pair appears at most once per sweep, which is
//! what makes delete-then-insert materialization safe.

use chrono::NaiveDate;
use engine_core::{calendar, Result};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::job::{self, JobConfig, JobContext, JobReport};

/// Driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Trailing days recomputed by the default backfill (today inclusive).
    #[serde(default = "default_backfill_days")]
    pub backfill_days: u32,
    /// Jobs run concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub job: JobConfig,
}

fn default_backfill_days() -> u32 {
    7
}

fn default_batch_size() -> usize {
    20
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            backfill_days: default_backfill_days(),
            batch_size: default_batch_size(),
            job: JobConfig::default(),
        }
    }
}

/// Outcome of a backfill sweep.
#[derive(Debug, Clone, Default)]
pub struct BackfillSummary {
    pub jobs_run: u32,
    pub jobs_failed: u32,
    pub rows_written: u64,
}

impl BackfillSummary {
    pub fn ok(&self) -> bool {
        self.jobs_failed == 0
    }

    fn absorb(&mut self, report: &JobReport) {
        self.jobs_run += 1;
        if !report.ok() {
            self.jobs_failed += 1;
        }
        self.rows_written += report.outcome.written;
    }
}

/// Run one (tenant, date) job.
pub async fn run_single(
    ctx: &JobContext,
    cfg: &DriverConfig,
    tenant: &str,
    date: NaiveDate,
) -> Result<JobReport> {
    job::run(ctx, &cfg.job, tenant, date).await
}

/// Run the default backfill: every active tenant over the trailing window,
/// in batches. Individual job failures are logged and counted, never abort
/// the sweep; the operator reruns failed pairs, which is always safe.
pub async fn run_backfill(
    ctx: &JobContext,
    cfg: &DriverConfig,
    today: NaiveDate,
) -> Result<BackfillSummary> {
    // No tenant list means nothing can run: structural, fail fast.
    let tenants = ctx.entities.active_tenants().await?;

    let mut pairs = Vec::with_capacity(tenants.len() * cfg.backfill_days as usize);
    for tenant in &tenants {
        for offset in 0..cfg.backfill_days {
            pairs.push((tenant.clone(), calendar::shift(today, -i64::from(offset))));
        }
    }

    info!(
        tenants = tenants.len(),
        days = cfg.backfill_days,
        jobs = pairs.len(),
        batch_size = cfg.batch_size,
        "Backfill sweep starting"
    );

    let mut summary = BackfillSummary::default();

    for batch in pairs.chunks(cfg.batch_size.max(1)) {
        let mut set = JoinSet::new();
        for (tenant, date) in batch {
            let ctx = ctx.clone();
            let job_cfg = cfg.job.clone();
            let tenant = tenant.clone();
            let date = *date;
            set.spawn(async move { job::run(&ctx, &job_cfg, &tenant, date).await });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(report)) => {
                    if !report.ok() {
                        error!(
                            tenant = %report.tenant,
                            date = %report.date,
                            rows_failed = report.outcome.failed,
                            "Job finished with write failures, rerun this pair"
                        );
                    }
                    summary.absorb(&report);
                }
                Ok(Err(e)) => {
                    summary.jobs_run += 1;
                    summary.jobs_failed += 1;
                    metrics().jobs_failed.inc();
                    error!(error = %e, "Job failed");
                }
                Err(e) => {
                    summary.jobs_run += 1;
                    summary.jobs_failed += 1;
                    metrics().jobs_failed.inc();
                    error!(error = %e, "Job task panicked");
                }
            }
        }
    }

    info!(
        jobs_run = summary.jobs_run,
        jobs_failed = summary.jobs_failed,
        rows_written = summary.rows_written,
        "Backfill sweep finished"
    );

    Ok(summary)
}
