//! SQLite scan store (default backend)

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::schema::{FRUIT_COLUMNS, SCAN_COLUMNS, SQLITE_SCHEMA};
use super::{encode_fruit_counts, FruitRow, ScanRow, ScanStore};
use crate::models::{FruitResult, NewScan, PageRequest, Scan, ScanDetail, ScanStatistics};
use crate::{Error, Result};

/// Scan store backed by a single SQLite file
#[derive(Clone)]
pub struct SqliteScanStore {
    pool: SqlitePool,
}

impl SqliteScanStore {
    /// Open (creating if needed) the database file and initialize the schema
    pub async fn open(db_path: &Path, max_connections: u32) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // WAL lets readers proceed while one upload commits its scan
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database on a single connection
    ///
    /// The connection is never recycled, otherwise the data would vanish.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes if they don't exist
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SQLITE_SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Database tables initialized (scans, fruits)");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("Failed to parse created_at '{}': {}", raw, e)))
}

fn scan_from_row(row: &SqliteRow) -> Result<Scan> {
    let created_at: String = row.try_get("created_at")?;
    ScanRow {
        id: row.try_get("id")?,
        image_path: row.try_get("image_path")?,
        annotated_image_path: row.try_get("annotated_image_path")?,
        created_at: decode_timestamp(&created_at)?,
        total_fruits: row.try_get("total_fruits")?,
        fruit_counts: row.try_get("fruit_counts")?,
    }
    .try_into()
}

fn fruit_from_row(row: &SqliteRow) -> Result<FruitResult> {
    FruitRow {
        fruit_type: row.try_get("fruit_type")?,
        class_id: row.try_get("class_id")?,
        class_name: row.try_get("class_name")?,
        quality_status: row.try_get("quality_status")?,
        ripeness: row.try_get("ripeness")?,
        confidence: row.try_get("confidence")?,
        yolo_confidence: row.try_get("yolo_confidence")?,
        nir_confidence: row.try_get("nir_confidence")?,
        nir_ripeness: row.try_get("nir_ripeness")?,
        nir_quality_score: row.try_get("nir_quality_score")?,
        ripeness_agreement: row.try_get("ripeness_agreement")?,
        ripeness_confidence: row.try_get("ripeness_confidence")?,
        bbox: [
            row.try_get("bbox_x1")?,
            row.try_get("bbox_y1")?,
            row.try_get("bbox_x2")?,
            row.try_get("bbox_y2")?,
        ],
        fusion_method: row.try_get("fusion_method")?,
    }
    .try_into()
}

#[async_trait]
impl ScanStore for SqliteScanStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn save_scan(&self, scan: &NewScan, fruits: &[FruitResult]) -> Result<Uuid> {
        // Prepare all data BEFORE opening the transaction
        let scan_id = scan.id.to_string();
        let created_at = encode_timestamp(&scan.created_at);
        let fruit_counts = encode_fruit_counts(fruits)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO scans (
                id, image_path, annotated_image_path, created_at, total_fruits, fruit_counts
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&scan_id)
        .bind(&scan.image_path)
        .bind(&scan.annotated_image_path)
        .bind(&created_at)
        .bind(fruits.len() as i64)
        .bind(&fruit_counts)
        .execute(&mut *tx)
        .await?;

        for (position, fruit) in fruits.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO fruits (
                    scan_id, position, fruit_type, class_id, class_name,
                    quality_status, ripeness, confidence, yolo_confidence,
                    nir_confidence, nir_ripeness, nir_quality_score,
                    ripeness_agreement, ripeness_confidence,
                    bbox_x1, bbox_y1, bbox_x2, bbox_y2, fusion_method
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&scan_id)
            .bind(position as i64)
            .bind(&fruit.fruit_type)
            .bind(fruit.class_id)
            .bind(&fruit.class_name)
            .bind(fruit.quality_status.as_str())
            .bind(fruit.ripeness.as_str())
            .bind(fruit.confidence)
            .bind(fruit.yolo_confidence)
            .bind(fruit.nir_confidence)
            .bind(fruit.nir_ripeness.map(|r| r.as_str()))
            .bind(fruit.nir_quality_score)
            .bind(fruit.ripeness_agreement)
            .bind(fruit.ripeness_confidence)
            .bind(fruit.bbox.x1)
            .bind(fruit.bbox.y1)
            .bind(fruit.bbox.x2)
            .bind(fruit.bbox.y2)
            .bind(fruit.fusion_method.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!("Scan {} saved ({} fruits)", scan_id, fruits.len());
        Ok(scan.id)
    }

    async fn get_scan(&self, scan_id: Uuid) -> Result<ScanDetail> {
        let id = scan_id.to_string();

        // One read transaction: scan row and fruit rows come from the same snapshot
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {} FROM scans WHERE id = ?", SCAN_COLUMNS))
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::ScanNotFound(scan_id))?;
        let scan = scan_from_row(&row)?;

        let fruit_rows = sqlx::query(&format!(
            "SELECT {} FROM fruits WHERE scan_id = ? ORDER BY position ASC",
            FRUIT_COLUMNS
        ))
        .bind(&id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let fruits = fruit_rows
            .iter()
            .map(fruit_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(ScanDetail { scan, fruits })
    }

    async fn list_scans(&self, page: PageRequest) -> Result<Vec<Scan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scans ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
            SCAN_COLUMNS
        ))
        .bind(page.page_size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scan_from_row).collect()
    }

    async fn count_scans(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scans")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_scan(&self, scan_id: Uuid) -> Result<()> {
        let id = scan_id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM fruits WHERE scan_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM scans WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Err(Error::ScanNotFound(scan_id));
        }

        tx.commit().await?;
        info!("Scan {} deleted", scan_id);
        Ok(())
    }

    async fn get_statistics(&self) -> Result<ScanStatistics> {
        let total_scans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scans")
            .fetch_one(&self.pool)
            .await?;
        let total_fruits: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fruits")
            .fetch_one(&self.pool)
            .await?;

        let fruit_type_counts = sqlx::query_as::<_, (String, i64)>(
            "SELECT fruit_type, COUNT(*) FROM fruits GROUP BY fruit_type",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect::<BTreeMap<_, _>>();

        let quality_status_counts = sqlx::query_as::<_, (String, i64)>(
            "SELECT quality_status, COUNT(*) FROM fruits GROUP BY quality_status",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect::<BTreeMap<_, _>>();

        Ok(ScanStatistics {
            total_scans,
            total_fruits,
            fruit_type_counts,
            quality_status_counts,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_encoding_sorts_chronologically() {
        let early = DateTime::parse_from_rfc3339("2025-11-19T10:12:00Z").unwrap().with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2025-11-20T16:45:00.5Z").unwrap().with_timezone(&Utc);
        let (a, b) = (encode_timestamp(&early), encode_timestamp(&late));
        assert!(a < b);
        assert_eq!(decode_timestamp(&a).unwrap(), early);
        assert_eq!(decode_timestamp(&b).unwrap(), late);
    }

    #[tokio::test]
    async fn test_in_memory_store_starts_empty() {
        let store = SqliteScanStore::open_in_memory().await.unwrap();
        assert_eq!(store.count_scans().await.unwrap(), 0);
        assert_eq!(store.get_statistics().await.unwrap(), ScanStatistics::default());
        store.ping().await.unwrap();
    }
}
