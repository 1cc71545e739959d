//! Live integration tests for pricewatch-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/pricewatch-db/`), so `"../../migrations"` resolves to the
//! workspace migration directory.

use chrono::{Duration, Utc};
use pricewatch_core::{AlertFilter, AlertPriority, AlertType, RunType, TriggerSource};
use pricewatch_db::{
    complete_monitoring_run, count_alerts_grouped_since, count_monitored_asins,
    count_price_alerts, count_snapshots, create_monitoring_run, delete_price_alert,
    delete_price_alerts, delete_read_alerts_older_than, delete_snapshots_older_than,
    fail_monitoring_run, get_catalog_product, get_latest_snapshot, get_monitoring_run,
    get_price_alert, insert_baseline_if_absent, insert_observed_snapshot, insert_price_alert,
    last_completed_run_at, latest_own_listing_price, list_active_competitor_mappings,
    list_initialized_asins, list_price_alerts, list_snapshot_history, list_tracked_asins,
    lowest_competitor_price, mark_alert_read, mark_all_alerts_read, start_monitoring_run,
    DbError, NewPriceAlert, NewPriceSnapshot,
};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal")
}

fn snapshot<'a>(asin: &'a str, source: &'a str, price: &str) -> NewPriceSnapshot<'a> {
    NewPriceSnapshot {
        asin,
        source,
        seller_sku: None,
        price: dec(price),
        currency: "USD",
    }
}

fn alert<'a>(asin: &'a str, priority: AlertPriority) -> NewPriceAlert<'a> {
    NewPriceAlert {
        asin,
        seller_sku: Some("SKU-1"),
        product_name: Some("Test Widget"),
        old_price: dec("19.99"),
        new_price: dec("17.99"),
        price_change: dec("-2.00"),
        price_change_percent: dec("-10.0050"),
        currency: "USD",
        alert_type: AlertType::PriceDecrease,
        competitor_name: None,
        priority,
        threshold_triggered: Decimal::ZERO,
    }
}

async fn insert_own_listing(pool: &sqlx::PgPool, asin: &str, sku: &str, price: &str) {
    let main_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO amzn_competitive_pricing_main (asin, seller_sku) VALUES ($1, $2) RETURNING id",
    )
    .bind(asin)
    .bind(sku)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert own listing failed for {asin}: {e}"));

    sqlx::query(
        "INSERT INTO amzn_competitive_prices (pricing_main_id, price_amount, price_currency) \
         VALUES ($1, $2, 'USD')",
    )
    .bind(main_id)
    .bind(dec(price))
    .execute(pool)
    .await
    .unwrap_or_else(|e| panic!("insert own price failed for {asin}: {e}"));
}

async fn insert_competitor_fetch(pool: &sqlx::PgPool, asin: &str, prices: &[&str]) {
    let parent_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO amzn_competitive_pricing_competitors (asin) VALUES ($1) RETURNING id",
    )
    .bind(asin)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert competitor failed for {asin}: {e}"));

    for price in prices {
        sqlx::query(
            "INSERT INTO amzn_competitor_competitive_prices \
                 (competitor_pricing_id, price_amount, price_currency) \
             VALUES ($1, $2, 'USD')",
        )
        .bind(parent_id)
        .bind(dec(price))
        .execute(pool)
        .await
        .unwrap_or_else(|e| panic!("insert competitor price failed for {asin}: {e}"));
    }
}

// ---------------------------------------------------------------------------
// Section 1: Listings and discovery
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn tracked_asins_are_deduplicated_across_sources(pool: sqlx::PgPool) {
    insert_own_listing(&pool, "B000000001", "SKU-1", "10.00").await;
    insert_competitor_fetch(&pool, "B000000002", &["9.00"]).await;
    insert_competitor_fetch(&pool, "B000000001", &["9.50"]).await;
    sqlx::query(
        "INSERT INTO amzn_product_list (asin1, seller_sku, item_name, price) VALUES \
         ('B000000003', 'SKU-3', 'Catalog Only', 5.00), \
         (' B000000001 ', 'SKU-1', 'Dup', 10.00), \
         (NULL, 'SKU-X', 'No ASIN', 1.00), \
         ('   ', 'SKU-Y', 'Blank ASIN', 1.00)",
    )
    .execute(&pool)
    .await
    .expect("insert catalog rows");

    let rows = list_tracked_asins(&pool).await.expect("list_tracked_asins");
    let asins: Vec<&str> = rows.iter().map(|r| r.asin.as_str()).collect();
    assert_eq!(asins, vec!["B000000001", "B000000002", "B000000003"]);

    assert_eq!(rows[0].seller_sku.as_deref(), Some("SKU-1"));
    assert_eq!(rows[0].seller_skus, vec!["SKU-1".to_string()]);
    assert!(rows[1].seller_sku.is_none(), "competitor-only ASIN has no sku");
    assert!(rows[1].seller_skus.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn tracked_asins_carry_every_seller_sku(pool: sqlx::PgPool) {
    insert_own_listing(&pool, "B000000001", "Z-9", "10.00").await;
    sqlx::query(
        "INSERT INTO amzn_product_list (asin1, seller_sku, item_name) \
         VALUES ('B000000001', 'A-1', 'Widget')",
    )
    .execute(&pool)
    .await
    .expect("insert catalog row");

    let rows = list_tracked_asins(&pool).await.expect("list_tracked_asins");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].seller_skus, vec!["A-1".to_string(), "Z-9".to_string()]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn tracked_asins_skip_mapped_competitor_asins(pool: sqlx::PgPool) {
    insert_own_listing(&pool, "B000000001", "SKU-1", "19.99").await;
    insert_competitor_fetch(&pool, "B0000RIVAL", &["20.00"]).await;
    insert_competitor_fetch(&pool, "B0000OTHER", &["7.00"]).await;
    sqlx::query(
        "INSERT INTO competitor_product_mappings (our_seller_sku, our_asin, competitor_asin, competitor_name) \
         VALUES ('SKU-1', 'B000000001', 'B0000RIVAL', 'Rival Co')",
    )
    .execute(&pool)
    .await
    .expect("insert mapping");

    let rows = list_tracked_asins(&pool).await.expect("list_tracked_asins");
    let asins: Vec<&str> = rows.iter().map(|r| r.asin.as_str()).collect();
    assert_eq!(asins, vec!["B000000001", "B0000OTHER"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn tracked_asins_empty_database_is_empty(pool: sqlx::PgPool) {
    let rows = list_tracked_asins(&pool).await.expect("list_tracked_asins");
    assert!(rows.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn latest_own_listing_price_skips_non_positive(pool: sqlx::PgPool) {
    insert_own_listing(&pool, "B000000001", "SKU-1", "12.50").await;
    insert_own_listing(&pool, "B000000001", "SKU-1", "0").await;

    let row = latest_own_listing_price(&pool, "B000000001")
        .await
        .expect("latest_own_listing_price")
        .expect("a price");
    assert_eq!(row.price, dec("12.50"));
    assert_eq!(row.currency, "USD");
    assert_eq!(row.seller_sku.as_deref(), Some("SKU-1"));

    let missing = latest_own_listing_price(&pool, "B000000009")
        .await
        .expect("latest_own_listing_price");
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn lowest_competitor_price_uses_latest_fetch(pool: sqlx::PgPool) {
    insert_competitor_fetch(&pool, "B000000002", &["5.00", "6.00"]).await;
    insert_competitor_fetch(&pool, "B000000002", &["8.00", "7.25", "0"]).await;

    let row = lowest_competitor_price(&pool, "B000000002")
        .await
        .expect("lowest_competitor_price")
        .expect("a price");
    assert_eq!(row.price, dec("7.25"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_product_prefers_priced_entry(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO amzn_product_list (asin1, seller_sku, item_name, price) VALUES \
         ('B000000003', 'SKU-3', 'Priced', 5.00), \
         ('B000000003', 'SKU-3', 'Unpriced', NULL)",
    )
    .execute(&pool)
    .await
    .expect("insert catalog rows");

    let row = get_catalog_product(&pool, "B000000003")
        .await
        .expect("get_catalog_product")
        .expect("catalog row");
    assert_eq!(row.item_name.as_deref(), Some("Priced"));
    assert_eq!(row.price, Some(dec("5.00")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn competitor_mappings_match_by_asin_or_sku(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO competitor_product_mappings \
             (our_seller_sku, our_asin, competitor_asin, competitor_name, mapping_priority, is_active) \
         VALUES \
             ('SKU-1', 'B000000001', 'B0000000C1', 'Acme', 2, TRUE), \
             ('SKU-1', NULL, 'B0000000C2', 'Globex', 1, TRUE), \
             ('SKU-1', 'B000000001', 'B0000000C3', 'Retired', 1, FALSE), \
             ('SKU-9', 'B000000009', 'B0000000C4', 'Other', 1, TRUE)",
    )
    .execute(&pool)
    .await
    .expect("insert mappings");

    let rows = list_active_competitor_mappings(&pool, "B000000001", Some("SKU-1"))
        .await
        .expect("list_active_competitor_mappings");
    let names: Vec<_> = rows
        .iter()
        .map(|r| r.competitor_name.clone().unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["Globex", "Acme"]);

    let by_asin_only = list_active_competitor_mappings(&pool, "B000000001", None)
        .await
        .expect("list_active_competitor_mappings");
    assert_eq!(by_asin_only.len(), 1);
    assert_eq!(by_asin_only[0].competitor_asin, "B0000000C1");
}

// ---------------------------------------------------------------------------
// Section 2: Snapshot store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn baseline_is_inserted_at_most_once(pool: sqlx::PgPool) {
    let first = insert_baseline_if_absent(&pool, &snapshot("B000123456", "own", "19.99"))
        .await
        .expect("first baseline");
    let second = insert_baseline_if_absent(&pool, &snapshot("B000123456", "own", "18.00"))
        .await
        .expect("second baseline");

    assert!(first);
    assert!(!second);
    assert_eq!(count_snapshots(&pool).await.expect("count"), 1);

    let latest = get_latest_snapshot(&pool, "B000123456", "own")
        .await
        .expect("get_latest_snapshot")
        .expect("snapshot");
    assert_eq!(latest.price, dec("19.99"));
    assert_eq!(latest.price_type, "baseline");
    assert_eq!(latest.data_source, "initialization");
}

#[sqlx::test(migrations = "../../migrations")]
async fn baseline_skipped_when_series_already_observed(pool: sqlx::PgPool) {
    insert_observed_snapshot(&pool, &snapshot("B000123456", "own", "19.99"))
        .await
        .expect("observed");

    let inserted = insert_baseline_if_absent(&pool, &snapshot("B000123456", "own", "19.99"))
        .await
        .expect("baseline");
    assert!(!inserted);
}

#[sqlx::test(migrations = "../../migrations")]
async fn initialized_asins_include_observed_seeds(pool: sqlx::PgPool) {
    insert_observed_snapshot(&pool, &snapshot("B000000001", "own", "9.99"))
        .await
        .expect("observed");
    insert_baseline_if_absent(&pool, &snapshot("B000000002", "own", "19.99"))
        .await
        .expect("baseline");

    assert_eq!(
        list_initialized_asins(&pool).await.expect("list"),
        vec!["B000000001".to_string(), "B000000002".to_string()]
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn baselines_are_per_source(pool: sqlx::PgPool) {
    assert!(insert_baseline_if_absent(&pool, &snapshot("B000123456", "own", "19.99"))
        .await
        .expect("own"));
    assert!(
        insert_baseline_if_absent(&pool, &snapshot("B000123456", "competitor:Acme", "18.49"))
            .await
            .expect("competitor")
    );
    assert_eq!(count_monitored_asins(&pool).await.expect("count"), 1);
    assert_eq!(
        list_initialized_asins(&pool).await.expect("list"),
        vec!["B000123456".to_string()]
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn latest_snapshot_breaks_ties_by_id(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO price_snapshots \
             (asin, source, price, currency, price_type, data_source, observed_at) \
         VALUES \
             ('B000123456', 'own', 10.00, 'USD', 'observed', 'monitoring', '2026-01-01T00:00:00Z'), \
             ('B000123456', 'own', 11.00, 'USD', 'observed', 'monitoring', '2026-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .expect("insert tied snapshots");

    let latest = get_latest_snapshot(&pool, "B000123456", "own")
        .await
        .expect("get_latest_snapshot")
        .expect("snapshot");
    assert_eq!(latest.price, dec("11.00"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn retention_keeps_latest_snapshot_of_each_series(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO price_snapshots \
             (asin, source, price, currency, price_type, data_source, observed_at) \
         VALUES \
             ('B000000001', 'own', 10.00, 'USD', 'baseline', 'initialization', NOW() - INTERVAL '400 days'), \
             ('B000000001', 'own', 11.00, 'USD', 'observed', 'monitoring', NOW() - INTERVAL '390 days'), \
             ('B000000001', 'own', 12.00, 'USD', 'observed', 'monitoring', NOW() - INTERVAL '1 day'), \
             ('B000000002', 'own', 20.00, 'USD', 'baseline', 'initialization', NOW() - INTERVAL '500 days')",
    )
    .execute(&pool)
    .await
    .expect("insert snapshots");

    let deleted = delete_snapshots_older_than(&pool, Utc::now() - Duration::days(365))
        .await
        .expect("delete_snapshots_older_than");

    assert_eq!(deleted, 2, "two stale points of B000000001 go");
    assert_eq!(count_snapshots(&pool).await.expect("count"), 2);

    let stale_only = get_latest_snapshot(&pool, "B000000002", "own")
        .await
        .expect("get_latest_snapshot");
    assert!(stale_only.is_some(), "sole point of a series survives");
}

#[sqlx::test(migrations = "../../migrations")]
async fn snapshot_history_is_newest_first_and_windowed(pool: sqlx::PgPool) {
    sqlx::query(
        "INSERT INTO price_snapshots \
             (asin, source, price, currency, price_type, data_source, observed_at) \
         VALUES \
             ('B000000001', 'own', 10.00, 'USD', 'baseline', 'initialization', NOW() - INTERVAL '40 days'), \
             ('B000000001', 'own', 11.00, 'USD', 'observed', 'monitoring', NOW() - INTERVAL '2 days'), \
             ('B000000001', 'competitor:Acme', 9.00, 'USD', 'baseline', 'initialization', NOW() - INTERVAL '1 day')",
    )
    .execute(&pool)
    .await
    .expect("insert snapshots");

    let rows = list_snapshot_history(&pool, "B000000001", Utc::now() - Duration::days(30), 100)
        .await
        .expect("list_snapshot_history");
    let prices: Vec<Decimal> = rows.iter().map(|r| r.price).collect();
    assert_eq!(prices, vec![dec("9.00"), dec("11.00")]);
}

// ---------------------------------------------------------------------------
// Section 3: Alert store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_alert_round_trips_fields(pool: sqlx::PgPool) {
    let row = insert_price_alert(&pool, &alert("B000123456", AlertPriority::Medium))
        .await
        .expect("insert_price_alert");

    assert_eq!(row.asin, "B000123456");
    assert_eq!(row.old_price, dec("19.99"));
    assert_eq!(row.new_price, dec("17.99"));
    assert_eq!(row.price_change, dec("-2.00"));
    assert_eq!(row.price_change_percent, dec("-10.0050"));
    assert_eq!(row.alert_type, "price_decrease");
    assert_eq!(row.priority, "medium");
    assert!(row.competitor_name.is_none());
    assert!(!row.is_read);

    let fetched = get_price_alert(&pool, row.id).await.expect("get_price_alert");
    assert_eq!(fetched.product_name.as_deref(), Some("Test Widget"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_missing_alert_is_not_found(pool: sqlx::PgPool) {
    let err = get_price_alert(&pool, 999_999).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound), "got: {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn alert_filters_and_counts(pool: sqlx::PgPool) {
    let low = insert_price_alert(&pool, &alert("B000000001", AlertPriority::Low))
        .await
        .expect("low");
    insert_price_alert(&pool, &alert("B000000002", AlertPriority::High))
        .await
        .expect("high");
    insert_price_alert(&pool, &alert("B000000003", AlertPriority::Critical))
        .await
        .expect("critical");
    mark_alert_read(&pool, low.id).await.expect("mark read");

    let all = list_price_alerts(&pool, AlertFilter::All, 50, 0)
        .await
        .expect("all");
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].asin, "B000000003", "newest first");

    let unread = list_price_alerts(&pool, AlertFilter::Unread, 50, 0)
        .await
        .expect("unread");
    assert_eq!(unread.len(), 2);

    let high = list_price_alerts(&pool, AlertFilter::HighPriority, 50, 0)
        .await
        .expect("high");
    assert_eq!(high.len(), 2);

    let page = list_price_alerts(&pool, AlertFilter::All, 1, 1)
        .await
        .expect("page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].asin, "B000000002");

    let counts = count_price_alerts(&pool).await.expect("counts");
    assert_eq!(counts.total, 3);
    assert_eq!(counts.unread, 2);
    assert_eq!(counts.high_priority, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_read_is_idempotent(pool: sqlx::PgPool) {
    let row = insert_price_alert(&pool, &alert("B000000001", AlertPriority::Low))
        .await
        .expect("insert");

    assert!(mark_alert_read(&pool, row.id).await.expect("first"));
    assert!(mark_alert_read(&pool, row.id).await.expect("second"));
    assert!(!mark_alert_read(&pool, 999_999).await.expect("missing"));

    let fetched = get_price_alert(&pool, row.id).await.expect("get");
    assert!(fetched.is_read);
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_all_read_converges(pool: sqlx::PgPool) {
    for asin in ["B000000001", "B000000002", "B000000003"] {
        insert_price_alert(&pool, &alert(asin, AlertPriority::Low))
            .await
            .expect("insert");
    }

    assert_eq!(mark_all_alerts_read(&pool).await.expect("first"), 3);
    assert_eq!(mark_all_alerts_read(&pool).await.expect("second"), 0);

    let counts = count_price_alerts(&pool).await.expect("counts");
    assert_eq!(counts.unread, 0);
    assert_eq!(counts.total, 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn dismiss_is_permanent_and_idempotent(pool: sqlx::PgPool) {
    let row = insert_price_alert(&pool, &alert("B000000001", AlertPriority::Low))
        .await
        .expect("insert");

    assert_eq!(delete_price_alert(&pool, row.id).await.expect("first"), 1);
    assert_eq!(delete_price_alert(&pool, row.id).await.expect("second"), 0);
    assert!(matches!(
        get_price_alert(&pool, row.id).await,
        Err(DbError::NotFound)
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn bulk_dismiss_ignores_unknown_ids(pool: sqlx::PgPool) {
    let a = insert_price_alert(&pool, &alert("B000000001", AlertPriority::Low))
        .await
        .expect("a");
    let b = insert_price_alert(&pool, &alert("B000000002", AlertPriority::Low))
        .await
        .expect("b");
    insert_price_alert(&pool, &alert("B000000003", AlertPriority::Low))
        .await
        .expect("c");

    let deleted = delete_price_alerts(&pool, &[a.id, b.id, 999_999])
        .await
        .expect("delete_price_alerts");
    assert_eq!(deleted, 2);
    assert_eq!(delete_price_alerts(&pool, &[]).await.expect("empty"), 0);

    let counts = count_price_alerts(&pool).await.expect("counts");
    assert_eq!(counts.total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn retention_deletes_only_old_read_alerts(pool: sqlx::PgPool) {
    let old_read = insert_price_alert(&pool, &alert("B000000001", AlertPriority::Low))
        .await
        .expect("old read");
    let old_unread = insert_price_alert(&pool, &alert("B000000002", AlertPriority::Low))
        .await
        .expect("old unread");
    let recent_read = insert_price_alert(&pool, &alert("B000000003", AlertPriority::Low))
        .await
        .expect("recent read");

    sqlx::query(
        "UPDATE price_alerts SET created_at = NOW() - INTERVAL '90 days' WHERE id = ANY($1)",
    )
    .bind(vec![old_read.id, old_unread.id])
    .execute(&pool)
    .await
    .expect("age alerts");
    mark_alert_read(&pool, old_read.id).await.expect("read");
    mark_alert_read(&pool, recent_read.id).await.expect("read");

    let deleted = delete_read_alerts_older_than(&pool, Utc::now() - Duration::days(60))
        .await
        .expect("delete_read_alerts_older_than");
    assert_eq!(deleted, 1);
    assert!(get_price_alert(&pool, old_unread.id).await.is_ok());
    assert!(get_price_alert(&pool, recent_read.id).await.is_ok());
}

#[sqlx::test(migrations = "../../migrations")]
async fn grouped_counts_cover_type_and_priority(pool: sqlx::PgPool) {
    insert_price_alert(&pool, &alert("B000000001", AlertPriority::Low))
        .await
        .expect("a");
    insert_price_alert(&pool, &alert("B000000002", AlertPriority::Low))
        .await
        .expect("b");
    insert_price_alert(&pool, &alert("B000000003", AlertPriority::High))
        .await
        .expect("c");

    let rows = count_alerts_grouped_since(&pool, Utc::now() - Duration::days(30))
        .await
        .expect("count_alerts_grouped_since");
    assert_eq!(rows.len(), 2);
    let low = rows
        .iter()
        .find(|r| r.priority == "low")
        .expect("low bucket");
    assert_eq!(low.alert_type, "price_decrease");
    assert_eq!(low.count, 2);
}

// ---------------------------------------------------------------------------
// Section 4: Monitoring run ledger
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn monitoring_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let run = create_monitoring_run(&pool, RunType::Monitor, TriggerSource::Cron)
        .await
        .expect("create_monitoring_run");
    assert_eq!(run.status, "queued");
    assert_eq!(run.trigger_source, "cron");

    start_monitoring_run(&pool, run.id).await.expect("start");
    complete_monitoring_run(&pool, run.id, 7, 2)
        .await
        .expect("complete");

    let fetched = get_monitoring_run(&pool, run.id).await.expect("get");
    assert_eq!(fetched.status, "succeeded");
    assert_eq!(fetched.records_processed, 7);
    assert_eq!(fetched.alerts_created, 2);
    assert!(fetched.completed_at.is_some());

    let last = last_completed_run_at(&pool, RunType::Monitor)
        .await
        .expect("last_completed_run_at");
    assert_eq!(last, fetched.completed_at);
    let none = last_completed_run_at(&pool, RunType::Cleanup)
        .await
        .expect("last_completed_run_at");
    assert!(none.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn monitoring_run_failure_records_message(pool: sqlx::PgPool) {
    let run = create_monitoring_run(&pool, RunType::Initialize, TriggerSource::Api)
        .await
        .expect("create");
    start_monitoring_run(&pool, run.id).await.expect("start");
    fail_monitoring_run(&pool, run.id, "database unavailable")
        .await
        .expect("fail");

    let fetched = get_monitoring_run(&pool, run.id).await.expect("get");
    assert_eq!(fetched.status, "failed");
    assert_eq!(fetched.error_message.as_deref(), Some("database unavailable"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn monitoring_run_rejects_invalid_transition(pool: sqlx::PgPool) {
    let run = create_monitoring_run(&pool, RunType::Cleanup, TriggerSource::Scheduler)
        .await
        .expect("create");

    let err = complete_monitoring_run(&pool, run.id, 0, 0)
        .await
        .unwrap_err();
    assert!(
        matches!(err, DbError::InvalidRunTransition { expected_status: "running", .. }),
        "got: {err:?}"
    );
}
