//! One statistics job: a single (tenant, date) pair, all four daily tables.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use engine_core::accounts::is_internal_account;
use engine_core::record::fields;
use engine_core::{
    CohortBuckets, DayWindow, EntityStore, EventLogSource, LedgerStore, OrderRecord, RawRecord,
    Result, StatsSink, Uid, WorkRecord,
};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::info;

use crate::aggregate::{
    self, ChannelMetrics, SearchMetrics, TemplateMetrics, WindowMetrics,
};
use crate::channel::resolve_channels;
use crate::collectors::{
    self, click, conversion, creation, fetch_or_default, intercept, order, search, template,
    view, FoldCtx,
};
use crate::identity::{resolve_identity, IdentityMap};
use crate::materialize::{self, MaterializeOutcome, WriteStrategy};
use crate::merge::merge;
use crate::profile::UserProfiles;

/// Store handles for one job run, owned by the top-level driver and passed
/// by parameter; no component holds a global connection.
#[derive(Clone)]
pub struct JobContext {
    pub eventlog: Arc<dyn EventLogSource>,
    pub entities: Arc<dyn EntityStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub sink: Arc<dyn StatsSink>,
}

/// Per-job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub strategy: WriteStrategy,
    #[serde(default)]
    pub buckets: CohortBuckets,
    /// Registration-anchored windows of the new-user report, in days.
    #[serde(default = "default_windows")]
    pub windows: Vec<u32>,
}

fn default_windows() -> Vec<u32> {
    vec![1, 3, 7]
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            strategy: WriteStrategy::default(),
            buckets: CohortBuckets::default(),
            windows: default_windows(),
        }
    }
}

/// Outcome of one (tenant, date) run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub tenant: String,
    pub date: NaiveDate,
    pub identity_mappings: usize,
    pub profiles_loaded: usize,
    pub outcome: MaterializeOutcome,
}

impl JobReport {
    pub fn ok(&self) -> bool {
        self.outcome.ok()
    }
}

/// Everything the sources returned for one window, each fetch already
/// degraded to empty on failure.
struct FetchedSources {
    views: Vec<RawRecord>,
    clicks: Vec<RawRecord>,
    intercepts: Vec<RawRecord>,
    conversions: Vec<RawRecord>,
    creation_events: Vec<RawRecord>,
    searches: Vec<RawRecord>,
    exposures: Vec<RawRecord>,
    works: Vec<WorkRecord>,
    orders: Vec<OrderRecord>,
}

impl FetchedSources {
    /// Every uid observed by any source, after identity resolution and the
    /// internal-account filter. This is the candidate set for profile and
    /// channel resolution.
    fn observed_uids(&self, identity: &IdentityMap) -> Vec<Uid> {
        let mut uids = BTreeSet::new();

        let event_records = self
            .views
            .iter()
            .chain(&self.clicks)
            .chain(&self.intercepts)
            .chain(&self.conversions)
            .chain(&self.creation_events)
            .chain(&self.searches)
            .chain(&self.exposures);

        for rec in event_records {
            if let Some(uid) = identity.effective_uid(
                rec.i64_field(fields::UID),
                rec.str_field(fields::DISTINCT_ID),
            ) {
                if !is_internal_account(uid) {
                    uids.insert(uid);
                }
            }
        }
        for work in &self.works {
            if !is_internal_account(work.uid) {
                uids.insert(work.uid);
            }
        }
        for order in &self.orders {
            if !is_internal_account(order.uid) {
                uids.insert(order.uid);
            }
        }

        uids.into_iter().collect()
    }
}

/// Fetch every metric source concurrently. Each fetch is its own failure
/// domain; a down source yields empty records for its metric only.
async fn fetch_all(ctx: &JobContext, tenant: &str, window: &DayWindow) -> FetchedSources {
    let eventlog = &*ctx.eventlog;
    let (views, clicks, intercepts, conversions, creation_events, searches, exposures, works, orders) =
        tokio::join!(
            fetch_or_default("view", view::fetch(eventlog, tenant, window)),
            fetch_or_default("click", click::fetch(eventlog, tenant, window)),
            fetch_or_default("intercept", intercept::fetch(eventlog, tenant, window)),
            fetch_or_default("conversion", conversion::fetch(eventlog, tenant, window)),
            fetch_or_default("creation_events", creation::fetch_events(eventlog, tenant, window)),
            fetch_or_default("search", search::fetch(eventlog, tenant, window)),
            fetch_or_default("template_exposure", template::fetch_exposures(eventlog, tenant, window)),
            fetch_or_default("creation_works", creation::fetch_works(&*ctx.entities, tenant, window)),
            fetch_or_default("order", order::fetch(&*ctx.ledger, tenant, window)),
        );

    FetchedSources {
        views,
        clicks,
        intercepts,
        conversions,
        creation_events,
        searches,
        exposures,
        works,
        orders,
    }
}

/// Run the full pipeline for one (tenant, date).
///
/// Concurrent runs for the *same* pair are not safe under delete-then-insert
/// and are excluded by the outer driver, which runs each pair at most once
/// per sweep.
pub async fn run(
    ctx: &JobContext,
    cfg: &JobConfig,
    tenant: &str,
    date: NaiveDate,
) -> Result<JobReport> {
    let start = std::time::Instant::now();
    metrics().active_jobs.inc();
    info!(tenant = tenant, date = %date, "Statistics job starting");

    let window = DayWindow::for_date(date);

    // Identity first: every collector fold depends on it.
    let identity = resolve_identity(&*ctx.eventlog, tenant, &window).await;

    let sources = fetch_all(ctx, tenant, &window).await;

    // Profiles and channels must complete (or degrade) before any fold runs.
    let uids = sources.observed_uids(&identity);
    let profiles = UserProfiles::load(&*ctx.entities, tenant, &uids).await;
    let channels = resolve_channels(&*ctx.entities, tenant, &uids).await;

    let fold_ctx = FoldCtx {
        identity: &identity,
        profiles: &profiles,
        channels: &channels,
        buckets: &cfg.buckets,
        date,
    };

    // Channel daily table.
    let views = collectors::fold_by_channel(&fold_ctx, &sources.views);
    let clicks = collectors::fold_by_channel(&fold_ctx, &sources.clicks);
    let intercepts = collectors::fold_by_channel(&fold_ctx, &sources.intercepts);
    let conversions = collectors::fold_by_channel(&fold_ctx, &sources.conversions);
    let creations = merge(
        creation::fold_works_by_channel(&fold_ctx, &sources.works),
        collectors::fold_by_channel(&fold_ctx, &sources.creation_events),
    );
    let order_stats = order::fold_by_channel(&fold_ctx, &sources.orders);
    let channel_rows = aggregate::channel_rows(
        tenant,
        date,
        &ChannelMetrics {
            views: &views,
            clicks: &clicks,
            intercepts: &intercepts,
            creations: &creations,
            conversions: &conversions,
            orders: &order_stats,
        },
    );

    // Search daily table: search events plus search-attributed clicks.
    let searches = search::fold_by_term(&fold_ctx, &sources.searches);
    let search_clicks = search::fold_by_term(&fold_ctx, &sources.clicks);
    let search_rows = aggregate::search_rows(
        tenant,
        date,
        &SearchMetrics {
            searches: &searches,
            clicks: &search_clicks,
        },
    );

    // Template daily table.
    let exposures = template::fold_by_template(&fold_ctx, &sources.exposures);
    let template_clicks = template::fold_by_template(&fold_ctx, &sources.clicks);
    let template_creations = creation::fold_works_by_template(&fold_ctx, &sources.works);
    let template_rows = aggregate::template_rows(
        tenant,
        date,
        &TemplateMetrics {
            exposures: &exposures,
            clicks: &template_clicks,
            creations: &template_creations,
        },
    );

    // New-user window table, anchored to each user's registration date.
    let window_creations = merge(
        creation::fold_works_windows(&fold_ctx, &sources.works, &cfg.windows),
        collectors::fold_events_windows(&fold_ctx, &sources.creation_events, &cfg.windows),
    );
    let window_conversions =
        collectors::fold_events_windows(&fold_ctx, &sources.conversions, &cfg.windows);
    let window_orders = order::fold_windows(&fold_ctx, &sources.orders, &cfg.windows);
    let window_rows = aggregate::window_rows(
        tenant,
        date,
        &WindowMetrics {
            creations: &window_creations,
            conversions: &window_conversions,
            orders: &window_orders,
        },
    );

    // The full in-memory table set exists before the first write; a date's
    // rows are replaced as a unit, never streamed.
    let sink = &*ctx.sink;
    let mut outcome = MaterializeOutcome::default();
    outcome.merge(
        &materialize::write_channel_daily(sink, cfg.strategy, tenant, date, &channel_rows).await,
    );
    outcome.merge(
        &materialize::write_search_daily(sink, cfg.strategy, tenant, date, &search_rows).await,
    );
    outcome.merge(
        &materialize::write_template_daily(sink, cfg.strategy, tenant, date, &template_rows).await,
    );
    outcome.merge(
        &materialize::write_cohort_window(sink, cfg.strategy, tenant, date, &window_rows).await,
    );

    let report = JobReport {
        tenant: tenant.to_string(),
        date,
        identity_mappings: identity.len(),
        profiles_loaded: profiles.len(),
        outcome,
    };

    metrics().active_jobs.dec();
    metrics().job_latency_ms.observe(start.elapsed().as_millis() as u64);
    if report.ok() {
        metrics().jobs_succeeded.inc();
    } else {
        metrics().jobs_failed.inc();
    }

    info!(
        tenant = tenant,
        date = %date,
        identity_mappings = report.identity_mappings,
        profiles = report.profiles_loaded,
        rows_written = report.outcome.written,
        rows_failed = report.outcome.failed,
        elapsed_ms = %start.elapsed().as_millis(),
        "Statistics job finished"
    );

    Ok(report)
}
