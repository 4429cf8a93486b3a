//! Integration tests for the scan store
//!
//! SQLite tests run against in-memory or temp-file databases. The PostgreSQL
//! test only runs when FQS_TEST_POSTGRES_HOST points at a reachable server.

use chrono::{Duration, TimeZone, Utc};
use fqs_common::config::PostgresConfig;
use fqs_common::db::{PgScanStore, ScanStore, SqliteScanStore};
use fqs_common::models::{
    BoundingBox, FruitResult, FusionMethod, NewScan, PageRequest, QualityStatus, Ripeness,
};
use fqs_common::{uuid_utils, Error};
use std::sync::Arc;

fn fruit(fruit_type: &str, class_name: &str, quality: QualityStatus, ripeness: Ripeness, x: f64) -> FruitResult {
    FruitResult {
        fruit_type: fruit_type.to_string(),
        class_id: 1,
        class_name: class_name.to_string(),
        quality_status: quality,
        ripeness,
        confidence: 0.83,
        yolo_confidence: 0.85,
        nir_confidence: Some(0.80),
        nir_ripeness: Some(Ripeness::Ripe),
        nir_quality_score: Some(0.85),
        ripeness_agreement: Some(true),
        ripeness_confidence: 0.925,
        bbox: BoundingBox::new(x, 10.0, x + 50.0, 80.0),
        fusion_method: FusionMethod::WeightedAverage,
    }
}

fn sample_fruits() -> Vec<FruitResult> {
    vec![
        fruit("Banana", "Banana Ripe", QualityStatus::Ripe, Ripeness::Ripe, 0.0),
        fruit("Mango", "Mango Unripe", QualityStatus::Unripe, Ripeness::Unripe, 60.0),
        fruit("Banana", "Banana Overripe", QualityStatus::Overripe, Ripeness::Overripe, 120.0),
    ]
}

fn new_scan_at(minutes: i64) -> NewScan {
    let id = uuid_utils::generate();
    let mut scan = NewScan::new(id, format!("static/images/uploads/{}.jpg", id), None);
    scan.created_at = Utc.with_ymd_and_hms(2025, 11, 20, 8, 0, 0).unwrap() + Duration::minutes(minutes);
    scan
}

#[tokio::test]
async fn test_save_then_get_returns_fruits_in_order() {
    let store = SqliteScanStore::open_in_memory().await.unwrap();
    let scan = new_scan_at(0);
    let fruits = sample_fruits();

    let id = store.save_scan(&scan, &fruits).await.unwrap();
    assert_eq!(id, scan.id);

    let detail = store.get_scan(id).await.unwrap();
    assert_eq!(detail.fruits, fruits);
    assert_eq!(detail.scan.total_fruits, 3);
    assert_eq!(detail.scan.fruit_counts.get("Banana"), Some(&2));
    assert_eq!(detail.scan.fruit_counts.get("Mango"), Some(&1));
    assert_eq!(detail.scan.created_at, scan.created_at);
    assert_eq!(detail.scan.image_path, scan.image_path);
}

#[tokio::test]
async fn test_detector_only_fruit_keeps_empty_sensor_fields() {
    let store = SqliteScanStore::open_in_memory().await.unwrap();
    let mut only = fruit("Cacao", "Cacao Ripe", QualityStatus::Ripe, Ripeness::Ripe, 5.0);
    only.nir_confidence = None;
    only.nir_ripeness = None;
    only.nir_quality_score = None;
    only.ripeness_agreement = None;
    only.fusion_method = FusionMethod::YoloOnly;

    let scan = new_scan_at(0);
    store.save_scan(&scan, std::slice::from_ref(&only)).await.unwrap();

    let detail = store.get_scan(scan.id).await.unwrap();
    assert_eq!(detail.fruits, vec![only]);
}

#[tokio::test]
async fn test_scan_without_fruits() {
    let store = SqliteScanStore::open_in_memory().await.unwrap();
    let scan = new_scan_at(0);
    store.save_scan(&scan, &[]).await.unwrap();

    let detail = store.get_scan(scan.id).await.unwrap();
    assert!(detail.fruits.is_empty());
    assert_eq!(detail.scan.total_fruits, 0);
    assert!(detail.scan.fruit_counts.is_empty());
}

#[tokio::test]
async fn test_get_unknown_scan_is_not_found() {
    let store = SqliteScanStore::open_in_memory().await.unwrap();
    let result = store.get_scan(uuid_utils::generate()).await;
    assert!(matches!(result, Err(Error::ScanNotFound(_))));
}

#[tokio::test]
async fn test_delete_removes_scan_and_fruits() {
    let store = SqliteScanStore::open_in_memory().await.unwrap();
    let keep = new_scan_at(0);
    let doomed = new_scan_at(1);
    store.save_scan(&keep, &sample_fruits()).await.unwrap();
    store.save_scan(&doomed, &sample_fruits()).await.unwrap();

    store.delete_scan(doomed.id).await.unwrap();

    assert!(matches!(store.get_scan(doomed.id).await, Err(Error::ScanNotFound(_))));
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fruits WHERE scan_id = ?")
        .bind(doomed.id.to_string())
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(orphans, 0);

    // Other scans untouched
    assert_eq!(store.get_scan(keep.id).await.unwrap().fruits.len(), 3);

    // Second delete reports NotFound
    assert!(matches!(store.delete_scan(doomed.id).await, Err(Error::ScanNotFound(_))));
}

#[tokio::test]
async fn test_list_newest_first_with_pagination() {
    let store = SqliteScanStore::open_in_memory().await.unwrap();
    let mut ids = Vec::new();
    for minute in 0..5 {
        let scan = new_scan_at(minute);
        store.save_scan(&scan, &sample_fruits()[..1]).await.unwrap();
        ids.push(scan.id);
    }

    assert_eq!(store.count_scans().await.unwrap(), 5);

    let first = store.list_scans(PageRequest::new(1, 2)).await.unwrap();
    let listed: Vec<_> = first.iter().map(|s| s.scan_id).collect();
    assert_eq!(listed, vec![ids[4], ids[3]]);

    let last = store.list_scans(PageRequest::new(3, 2)).await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].scan_id, ids[0]);

    let beyond = store.list_scans(PageRequest::new(4, 2)).await.unwrap();
    assert!(beyond.is_empty());
}

#[tokio::test]
async fn test_statistics() {
    let store = SqliteScanStore::open_in_memory().await.unwrap();
    store.save_scan(&new_scan_at(0), &sample_fruits()).await.unwrap();
    store
        .save_scan(
            &new_scan_at(1),
            &[fruit("Pineapple", "Pineapple Ripe", QualityStatus::Ripe, Ripeness::Ripe, 0.0)],
        )
        .await
        .unwrap();

    let stats = store.get_statistics().await.unwrap();
    assert_eq!(stats.total_scans, 2);
    assert_eq!(stats.total_fruits, 4);
    assert_eq!(stats.fruit_type_counts.get("Banana"), Some(&2));
    assert_eq!(stats.fruit_type_counts.get("Pineapple"), Some(&1));
    assert_eq!(stats.quality_status_counts.get("ripe"), Some(&2));
    assert_eq!(stats.quality_status_counts.get("unripe"), Some(&1));
    assert_eq!(stats.quality_status_counts.get("overripe"), Some(&1));
}

#[tokio::test]
async fn test_file_database_created_and_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("scans.db");

    let scan = new_scan_at(0);
    {
        let store = SqliteScanStore::open(&db_path, 2).await.unwrap();
        store.save_scan(&scan, &sample_fruits()).await.unwrap();
        store.pool().close().await;
    }
    assert!(db_path.exists());

    let reopened = SqliteScanStore::open(&db_path, 2).await.unwrap();
    assert_eq!(reopened.get_scan(scan.id).await.unwrap().fruits, sample_fruits());
}

#[tokio::test]
async fn test_concurrent_reader_never_sees_partial_fruit_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        SqliteScanStore::open(&dir.path().join("concurrent.db"), 4)
            .await
            .unwrap(),
    );

    let many: Vec<FruitResult> = (0..25)
        .map(|i| fruit("Mango", "Mango Ripe", QualityStatus::Ripe, Ripeness::Ripe, i as f64))
        .collect();

    let writer = {
        let store = Arc::clone(&store);
        let many = many.clone();
        tokio::spawn(async move {
            for minute in 0..20 {
                store.save_scan(&new_scan_at(minute), &many).await.unwrap();
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let mut observed = 0;
            for _ in 0..200 {
                for scan in store.list_scans(PageRequest::new(1, 50)).await.unwrap() {
                    let detail = store.get_scan(scan.scan_id).await.unwrap();
                    assert_eq!(detail.fruits.len(), 25);
                    assert_eq!(detail.scan.total_fruits, 25);
                    observed += 1;
                }
                tokio::task::yield_now().await;
            }
            observed
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(store.count_scans().await.unwrap(), 20);
}

#[tokio::test]
async fn test_postgres_store_round_trip() {
    let host = match std::env::var("FQS_TEST_POSTGRES_HOST") {
        Ok(host) => host,
        Err(_) => {
            eprintln!("FQS_TEST_POSTGRES_HOST not set, skipping PostgreSQL test");
            return;
        }
    };
    let config = PostgresConfig {
        host,
        password: std::env::var("FQS_TEST_POSTGRES_PASSWORD").unwrap_or_default(),
        ..PostgresConfig::default()
    };

    let store = PgScanStore::connect(&config, 2).await.unwrap();
    let scan = new_scan_at(0);
    store.save_scan(&scan, &sample_fruits()).await.unwrap();

    let detail = store.get_scan(scan.id).await.unwrap();
    assert_eq!(detail.fruits, sample_fruits());

    store.delete_scan(scan.id).await.unwrap();
    assert!(matches!(store.get_scan(scan.id).await, Err(Error::ScanNotFound(_))));
}
