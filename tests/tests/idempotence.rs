//! Idempotence and stale-row behavior of the two write strategies.

use aggregation::{job, JobConfig, WriteStrategy};
use engine_core::CampaignConversion;
use integration_tests::fixtures::*;
use integration_tests::mocks::MockStores;

/// A representative day touching every table.
fn seed(stores: &MockStores) {
    let d = date(2025, 1, 10);

    stores.entities.users.lock().extend([
        user(1, date(2024, 6, 1), "web"),
        user(2, date(2025, 1, 10), "iPhone"),
        user(3, date(2025, 1, 3), "android"),
    ]);
    stores.eventlog.extend([
        page_view(Some("a"), Some(1), at(d, 8, 0), "web"),
        page_view(Some("a"), None, at(d, 8, 1), "web"),
        template_click(None, Some(2), at(d, 9, 0), "ios"),
        search_event(3, at(d, 9, 30), "android", "wedding"),
        search_result_click(3, at(d, 9, 31), "android", "wedding", "tpl-4"),
        template_exposure(1, at(d, 10, 0), "web", "tpl-4"),
        paywall_view(2, at(d, 10, 30), "ios"),
        create_click(2, at(d, 11, 0), "ios"),
        publish_success(2, at(d, 11, 5), "ios"),
    ]);
    stores.entities.works.lock().extend([
        work(2, at(d, 11, 0), Some("tpl-4"), "ios"),
        work(3, at(d, 12, 0), None, "android"),
    ]);
    stores
        .ledger
        .orders
        .lock()
        .push(order("ord-1", 2, 4990, at(d, 11, 10)));
}

#[tokio::test]
async fn test_rerun_produces_identical_rows() {
    let stores = MockStores::new();
    seed(&stores);
    let ctx = stores.job_context();
    let cfg = JobConfig::default();
    let d = date(2025, 1, 10);

    let first = job::run(&ctx, &cfg, TENANT, d).await.unwrap();
    assert!(first.ok());
    let channel_1 = stores.sink.channel_rows();
    let search_1 = stores.sink.search_rows();
    let template_1 = stores.sink.template_rows();
    let cohort_1 = stores.sink.cohort_rows();
    assert!(!channel_1.is_empty());
    assert!(!search_1.is_empty());
    assert!(!template_1.is_empty());
    assert!(!cohort_1.is_empty());

    let second = job::run(&ctx, &cfg, TENANT, d).await.unwrap();
    assert!(second.ok());

    // Same source data, same rows, same order.
    assert_eq!(stores.sink.channel_rows(), channel_1);
    assert_eq!(stores.sink.search_rows(), search_1);
    assert_eq!(stores.sink.template_rows(), template_1);
    assert_eq!(stores.sink.cohort_rows(), cohort_1);
}

#[tokio::test]
async fn test_upsert_rerun_is_also_idempotent() {
    let stores = MockStores::new();
    seed(&stores);
    let ctx = stores.job_context();
    let cfg = JobConfig {
        strategy: WriteStrategy::UpsertByKey,
        ..JobConfig::default()
    };
    let d = date(2025, 1, 10);

    job::run(&ctx, &cfg, TENANT, d).await.unwrap();
    let channel_1 = stores.sink.channel_rows();

    job::run(&ctx, &cfg, TENANT, d).await.unwrap();
    assert_eq!(stores.sink.channel_rows(), channel_1);
}

#[tokio::test]
async fn test_delete_then_insert_removes_stale_dimension_rows() {
    let stores = MockStores::new();
    let ctx = stores.job_context();
    let cfg = JobConfig::default();
    let d = date(2025, 1, 10);

    // First run: a referral-attributed user produces a nonzero row.
    stores
        .entities
        .users
        .lock()
        .push(user(30, date(2024, 6, 1), "web"));
    stores.entities.campaign.lock().push(CampaignConversion {
        uid: 30,
        channel: Some("referral".into()),
    });
    stores
        .eventlog
        .push(page_view(None, Some(30), at(d, 9, 0), "web"));

    job::run(&ctx, &cfg, TENANT, d).await.unwrap();
    assert!(stores
        .sink
        .channel_rows()
        .iter()
        .any(|r| r.channel == "referral"));

    // The events disappear upstream; the recomputed date must not keep the
    // stale referral row.
    stores.eventlog.clear();
    job::run(&ctx, &cfg, TENANT, d).await.unwrap();

    assert!(stores.sink.channel_rows().is_empty());
}

#[tokio::test]
async fn test_upsert_leaves_stale_rows_when_universe_shrinks() {
    // The documented limitation that makes delete-then-insert the default.
    let stores = MockStores::new();
    let ctx = stores.job_context();
    let cfg = JobConfig {
        strategy: WriteStrategy::UpsertByKey,
        ..JobConfig::default()
    };
    let d = date(2025, 1, 10);

    stores
        .entities
        .users
        .lock()
        .push(user(30, date(2024, 6, 1), "web"));
    stores
        .eventlog
        .push(page_view(None, Some(30), at(d, 9, 0), "web"));

    job::run(&ctx, &cfg, TENANT, d).await.unwrap();
    assert_eq!(stores.sink.channel_rows().len(), 1);

    stores.eventlog.clear();
    job::run(&ctx, &cfg, TENANT, d).await.unwrap();

    // Still there: upsert never saw the now-empty dimension.
    assert_eq!(stores.sink.channel_rows().len(), 1);
}

#[tokio::test]
async fn test_different_dates_do_not_interfere() {
    let stores = MockStores::new();
    let ctx = stores.job_context();
    let cfg = JobConfig::default();
    let d1 = date(2025, 1, 10);
    let d2 = date(2025, 1, 11);

    stores
        .entities
        .users
        .lock()
        .push(user(1, date(2024, 6, 1), "web"));
    stores.eventlog.extend([
        page_view(None, Some(1), at(d1, 9, 0), "web"),
        page_view(None, Some(1), at(d2, 9, 0), "web"),
    ]);

    job::run(&ctx, &cfg, TENANT, d1).await.unwrap();
    job::run(&ctx, &cfg, TENANT, d2).await.unwrap();

    let rows = stores.sink.channel_rows();
    assert_eq!(rows.len(), 2);

    // Rerunning one date replaces only that date's rows.
    job::run(&ctx, &cfg, TENANT, d1).await.unwrap();
    let rows = stores.sink.channel_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.date == d1));
    assert!(rows.iter().any(|r| r.date == d2));
}
