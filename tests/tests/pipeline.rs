//! End-to-end pipeline tests over the in-memory mock stores.

use aggregation::{job, JobConfig};
use engine_core::{CampaignConversion, Cohort, Device};
use integration_tests::fixtures::*;
use integration_tests::mocks::MockStores;

fn job_config() -> JobConfig {
    JobConfig::default()
}

#[tokio::test]
async fn test_click_pv_uv_with_identity_fallback() {
    let stores = MockStores::new();
    let d = date(2025, 1, 10);

    stores.entities.users.lock().extend([
        user(7, date(2024, 6, 1), "web"),
        user(9, date(2024, 6, 1), "web"),
    ]);

    // The page view carries both ids and establishes a -> 7.
    stores.eventlog.push(page_view(Some("a"), Some(7), at(d, 9, 0), "web"));
    // 3 anonymous clicks by "a", 2 authenticated clicks by uid 9.
    stores.eventlog.extend([
        template_click(Some("a"), None, at(d, 9, 5), "web"),
        template_click(Some("a"), None, at(d, 9, 6), "web"),
        template_click(Some("a"), None, at(d, 9, 7), "web"),
        template_click(None, Some(9), at(d, 10, 0), "web"),
        template_click(None, Some(9), at(d, 10, 1), "web"),
    ]);

    let report = job::run(&stores.job_context(), &job_config(), TENANT, d)
        .await
        .unwrap();
    assert!(report.ok());
    assert_eq!(report.identity_mappings, 1);

    let rows = stores.sink.channel_rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.device, Device::Web);
    assert_eq!(row.channel, "organic");
    assert_eq!(row.cohort, Cohort::Old);
    assert_eq!(row.click_pv, 5);
    assert_eq!(row.click_uv, 2);
    assert_eq!(row.view_pv, 1);
    assert_eq!(row.view_uv, 1);
}

#[tokio::test]
async fn test_order_gmv_minor_to_major() {
    let stores = MockStores::new();
    let d = date(2025, 1, 10);

    stores
        .entities
        .users
        .lock()
        .push(user(5, date(2024, 1, 1), "iPhone 15"));
    stores
        .ledger
        .orders
        .lock()
        .push(order("ord-1", 5, 12345, at(d, 14, 30)));

    let report = job::run(&stores.job_context(), &job_config(), TENANT, d)
        .await
        .unwrap();
    assert!(report.ok());

    let rows = stores.sink.channel_rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.device, Device::Ios);
    assert_eq!(row.order_count, 1);
    assert_eq!(row.gmv, 123.45);
    assert_eq!(row.view_pv, 0);
}

#[tokio::test]
async fn test_creation_cross_source_merge_counts_user_once() {
    let stores = MockStores::new();
    let d = date(2025, 1, 10);

    stores
        .entities
        .users
        .lock()
        .push(user(7, date(2024, 6, 1), "web"));
    // The same user action fires both evidence sources.
    stores
        .entities
        .works
        .lock()
        .push(work(7, at(d, 11, 0), Some("tpl-1"), "web"));
    stores.eventlog.push(create_click(7, at(d, 11, 0), "web"));

    let report = job::run(&stores.job_context(), &job_config(), TENANT, d)
        .await
        .unwrap();
    assert!(report.ok());

    let rows = stores.sink.channel_rows();
    assert_eq!(rows.len(), 1);
    // PV adds across sources; UV counts the user once.
    assert_eq!(rows[0].creation_pv, 2);
    assert_eq!(rows[0].creation_uv, 1);
}

#[tokio::test]
async fn test_channel_attribution_priorities() {
    let stores = MockStores::new();
    let d = date(2025, 1, 10);

    stores.entities.users.lock().extend([
        user(1, date(2024, 6, 1), "web"),
        user(2, date(2024, 6, 1), "web"),
        user(3, date(2024, 6, 1), "web"),
    ]);
    stores.entities.campaign.lock().push(CampaignConversion {
        uid: 1,
        channel: Some("video_ads".into()),
    });
    stores.entities.ad.lock().push(engine_core::AdConversion {
        uid: 2,
        event: "register".into(),
        report_status: "success".into(),
        platform: Some("feed_ads".into()),
    });

    for uid in [1, 2, 3] {
        stores
            .eventlog
            .push(page_view(None, Some(uid), at(d, 9, 0), "web"));
    }

    let report = job::run(&stores.job_context(), &job_config(), TENANT, d)
        .await
        .unwrap();
    assert!(report.ok());

    let rows = stores.sink.channel_rows();
    assert_eq!(rows.len(), 3);
    let channel_of = |c: &str| {
        rows.iter()
            .find(|r| r.channel == c)
            .unwrap_or_else(|| panic!("missing channel row {}", c))
            .view_pv
    };
    assert_eq!(channel_of("video_ads"), 1);
    assert_eq!(channel_of("feed_ads"), 1);
    assert_eq!(channel_of("organic"), 1);
}

#[tokio::test]
async fn test_search_and_template_tables() {
    let stores = MockStores::new();
    let d = date(2025, 1, 10);

    stores.entities.users.lock().extend([
        user(1, date(2024, 6, 1), "web"),
        user(2, date(2024, 6, 1), "web"),
    ]);
    stores.eventlog.extend([
        search_event(1, at(d, 9, 0), "web", "birthday card"),
        search_result_click(1, at(d, 9, 1), "web", "birthday card", "tpl-9"),
        template_exposure(2, at(d, 9, 2), "web", "tpl-9"),
    ]);
    stores
        .entities
        .works
        .lock()
        .push(work(1, at(d, 9, 5), Some("tpl-9"), "web"));

    let report = job::run(&stores.job_context(), &job_config(), TENANT, d)
        .await
        .unwrap();
    assert!(report.ok());

    let search_rows = stores.sink.search_rows();
    assert_eq!(search_rows.len(), 1);
    assert_eq!(search_rows[0].search_term, "birthday card");
    assert_eq!(search_rows[0].search_pv, 1);
    assert_eq!(search_rows[0].click_pv, 1);

    let template_rows = stores.sink.template_rows();
    assert_eq!(template_rows.len(), 1);
    let tpl = &template_rows[0];
    assert_eq!(tpl.template_id, "tpl-9");
    assert_eq!(tpl.exposure_pv, 1);
    assert_eq!(tpl.exposure_uv, 1);
    assert_eq!(tpl.click_pv, 1);
    assert_eq!(tpl.creation_pv, 1);
}

#[tokio::test]
async fn test_window_rows_anchor_to_each_users_registration() {
    let stores = MockStores::new();
    let d = date(2025, 1, 10);

    // Registered yesterday: day 2 of life, outside the 1-day window.
    stores
        .entities
        .users
        .lock()
        .push(user(20, date(2025, 1, 9), "web"));
    // Registered today: inside every window.
    stores
        .entities
        .users
        .lock()
        .push(user(21, date(2025, 1, 10), "web"));

    stores.entities.works.lock().extend([
        work(20, at(d, 12, 0), None, "web"),
        work(21, at(d, 12, 0), None, "web"),
    ]);

    let report = job::run(&stores.job_context(), &job_config(), TENANT, d)
        .await
        .unwrap();
    assert!(report.ok());

    let rows = stores.sink.cohort_rows();
    let uv_of = |w: u32| {
        rows.iter()
            .find(|r| r.window_days == w)
            .map(|r| r.creation_uv)
            .unwrap_or(0)
    };
    assert_eq!(uv_of(1), 1);
    assert_eq!(uv_of(3), 2);
    assert_eq!(uv_of(7), 2);
}

#[tokio::test]
async fn test_events_outside_window_are_ignored() {
    let stores = MockStores::new();
    let d = date(2025, 1, 10);

    stores
        .entities
        .users
        .lock()
        .push(user(1, date(2024, 6, 1), "web"));
    stores.eventlog.extend([
        page_view(None, Some(1), at(d, 12, 0), "web"),
        // Previous and next day never reach this date's statistics.
        page_view(None, Some(1), at(date(2025, 1, 9), 23, 59), "web"),
        page_view(None, Some(1), at(date(2025, 1, 11), 0, 0), "web"),
    ]);

    let report = job::run(&stores.job_context(), &job_config(), TENANT, d)
        .await
        .unwrap();
    assert!(report.ok());

    let rows = stores.sink.channel_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].view_pv, 1);
}

#[tokio::test]
async fn test_internal_accounts_are_excluded() {
    let stores = MockStores::new();
    let d = date(2025, 1, 10);

    stores
        .entities
        .users
        .lock()
        .push(user(1, date(2024, 6, 1), "web"));
    stores.eventlog.extend([
        page_view(None, Some(1), at(d, 9, 0), "web"),
        // QA account traffic.
        page_view(None, Some(10001), at(d, 9, 1), "web"),
    ]);
    stores
        .ledger
        .orders
        .lock()
        .push(order("ord-qa", 900001, 99999, at(d, 9, 2)));

    let report = job::run(&stores.job_context(), &job_config(), TENANT, d)
        .await
        .unwrap();
    assert!(report.ok());

    let rows = stores.sink.channel_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].view_pv, 1);
    assert_eq!(rows[0].order_count, 0);
    assert_eq!(rows[0].gmv, 0.0);
}
