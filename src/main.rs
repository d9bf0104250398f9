//! Atelier Statistics Aggregation Engine
//!
//! Daily batch jobs reconciling the behavioral event log, the entity store,
//! and the payment ledger into dimensional daily-statistics rows:
//! - identity stitching of anonymous pre-login events
//! - multi-priority acquisition channel attribution
//! - registration-anchored lifecycle cohorts and windows
//! - idempotent delete-then-insert / upsert materialization

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use aggregation::{run_backfill, run_single, DriverConfig, JobContext};
use engine_core::calendar;
use entity_store::{PostgresConfig, PostgresStore};
use eventlog_client::{ClickHouseConfig, ClickHouseEventLog, EventLogClient};
use telemetry::{health, init_tracing_from_env, metrics};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    postgres: PostgresConfig,

    #[serde(default)]
    driver: DriverConfig,
}

/// Parsed CLI invocation: `run [tenant] [date:YYYY-MM-DD]`.
#[derive(Debug)]
struct Cli {
    /// Absent tenant triggers the default multi-tenant backfill.
    tenant: Option<String>,
    /// Absent date defaults to today.
    date: Option<NaiveDate>,
}

const USAGE: &str = "usage: aggregation-engine run [tenant] [date:YYYY-MM-DD]";

fn parse_args(args: &[String]) -> Result<Cli> {
    match args.first().map(String::as_str) {
        Some("run") => {
            if args.len() > 3 {
                bail!("{}", USAGE);
            }
            let tenant = args.get(1).cloned();
            let date = args
                .get(2)
                .map(|s| calendar::parse_date(s))
                .transpose()
                .context(USAGE)?;
            Ok(Cli { tenant, date })
        }
        _ => bail!("{}", USAGE),
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!(
        "Starting Atelier Aggregation Engine v{}",
        env!("CARGO_PKG_VERSION")
    );

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    let config = load_config()?;

    // Store handles are constructed once here and passed down; components
    // never hold their own connections.
    let eventlog_client = EventLogClient::new(config.clickhouse.clone())
        .context("Failed to create event log client")?;
    let store = Arc::new(
        PostgresStore::connect(&config.postgres)
            .await
            .context("Failed to connect entity store")?,
    );

    check_health(&eventlog_client, &store).await;

    let ctx = JobContext {
        eventlog: Arc::new(ClickHouseEventLog::new(eventlog_client)),
        entities: store.clone(),
        ledger: store.clone(),
        sink: store.clone(),
    };

    // Run, then release connections on every exit path.
    let result = dispatch(&ctx, &config.driver, cli).await;
    store.close().await;

    let snapshot = metrics().snapshot();
    info!(
        records_scanned = snapshot.records_scanned,
        collector_failures = snapshot.collector_failures,
        query_retries = snapshot.query_retries,
        rows_written = snapshot.rows_written,
        rows_failed = snapshot.rows_failed,
        jobs_succeeded = snapshot.jobs_succeeded,
        jobs_failed = snapshot.jobs_failed,
        "Run metrics"
    );

    result
}

async fn dispatch(ctx: &JobContext, driver: &DriverConfig, cli: Cli) -> Result<()> {
    let today = Utc::now().date_naive();

    match cli.tenant {
        Some(tenant) => {
            let date = cli.date.unwrap_or(today);
            let report = run_single(ctx, driver, &tenant, date).await?;
            if !report.ok() {
                warn!(
                    tenant = %report.tenant,
                    date = %report.date,
                    rows_failed = report.outcome.failed,
                    "Job finished with write failures, rerunning is safe"
                );
            }
            Ok(())
        }
        None => {
            let summary = run_backfill(ctx, driver, today).await?;
            if !summary.ok() {
                warn!(
                    jobs_failed = summary.jobs_failed,
                    "Backfill finished with failed jobs, rerun the pairs listed above"
                );
            }
            Ok(())
        }
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("AGGREGATION")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested store config from environment
    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(url) = std::env::var("AGGREGATION_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("AGGREGATION_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("AGGREGATION_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("AGGREGATION_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }
    if let Ok(url) = std::env::var("AGGREGATION_POSTGRES_URL") {
        config.postgres.url = url;
    }

    Ok(config)
}

/// Check store health on startup.
async fn check_health(eventlog: &EventLogClient, store: &PostgresStore) {
    if eventlog_client::health::check_connection(eventlog).await {
        health().eventlog.set_healthy();
        info!("Event log connection: healthy");
    } else {
        health().eventlog.set_unhealthy("Connection failed");
        error!("Event log connection: unhealthy");
    }

    if store.check_connection().await {
        health().entity_store.set_healthy();
        info!("Entity store connection: healthy");
    } else {
        health().entity_store.set_unhealthy("Connection failed");
        error!("Entity store connection: unhealthy");
    }
}
