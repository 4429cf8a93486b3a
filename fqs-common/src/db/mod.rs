//! Scan storage
//!
//! One [`ScanStore`] contract with two interchangeable adapters:
//! - [`SqliteScanStore`]: single local file (default)
//! - [`PgScanStore`]: networked PostgreSQL server
//!
//! Only the connection configuration differs between them. Every scan is
//! written in one transaction (scan row plus all fruit rows) and read back
//! inside one transaction, so readers never see a partial fruit list.

pub mod postgres;
pub mod schema;
pub mod sqlite;

pub use postgres::PgScanStore;
pub use sqlite::SqliteScanStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};
use crate::models::{
    BoundingBox, FruitResult, NewScan, PageRequest, Scan, ScanDetail, ScanStatistics,
};
use crate::{Error, Result};

/// Storage contract shared by all backends
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Backend identifier ("sqlite", "postgres")
    fn backend(&self) -> &'static str;

    /// Persist one scan and its fruits atomically, returning the scan id
    async fn save_scan(&self, scan: &NewScan, fruits: &[FruitResult]) -> Result<Uuid>;

    /// Load a scan with its fruits in detection order
    ///
    /// Returns `Error::ScanNotFound` for unknown ids.
    async fn get_scan(&self, scan_id: Uuid) -> Result<ScanDetail>;

    /// List scans, newest first
    async fn list_scans(&self, page: PageRequest) -> Result<Vec<Scan>>;

    /// Total number of stored scans
    async fn count_scans(&self) -> Result<i64>;

    /// Delete a scan and all of its fruits
    ///
    /// Returns `Error::ScanNotFound` for unknown ids.
    async fn delete_scan(&self, scan_id: Uuid) -> Result<()>;

    /// Aggregate counts by fruit type and quality status
    async fn get_statistics(&self) -> Result<ScanStatistics>;

    /// Connectivity check for status pages
    async fn ping(&self) -> Result<()>;
}

/// Connect to the configured backend and make sure the schema exists
pub async fn connect_store(config: &StorageConfig) -> Result<Arc<dyn ScanStore>> {
    match config.backend {
        StorageBackend::Sqlite => {
            let store = SqliteScanStore::open(&config.sqlite_path, config.max_connections).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Postgres => {
            let store = PgScanStore::connect(&config.postgres, config.max_connections).await?;
            info!("Connected to {}", config.postgres.redacted());
            Ok(Arc::new(store))
        }
    }
}

/// Backend-neutral scan row as read from the database
#[derive(Debug)]
pub(crate) struct ScanRow {
    pub id: String,
    pub image_path: String,
    pub annotated_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub total_fruits: i64,
    pub fruit_counts: String,
}

impl TryFrom<ScanRow> for Scan {
    type Error = Error;

    fn try_from(row: ScanRow) -> Result<Self> {
        let scan_id = Uuid::parse_str(&row.id)
            .map_err(|e| Error::Corrupt(format!("Corrupt scan id '{}': {}", row.id, e)))?;
        let fruit_counts: BTreeMap<String, i64> = serde_json::from_str(&row.fruit_counts)
            .map_err(|e| Error::Corrupt(format!("Failed to deserialize fruit_counts: {}", e)))?;
        Ok(Scan {
            scan_id,
            image_path: row.image_path,
            annotated_image_path: row.annotated_image_path,
            created_at: row.created_at,
            total_fruits: row.total_fruits,
            fruit_counts,
        })
    }
}

/// Backend-neutral fruit row as read from the database
#[derive(Debug)]
pub(crate) struct FruitRow {
    pub fruit_type: String,
    pub class_id: i64,
    pub class_name: String,
    pub quality_status: String,
    pub ripeness: String,
    pub confidence: f64,
    pub yolo_confidence: f64,
    pub nir_confidence: Option<f64>,
    pub nir_ripeness: Option<String>,
    pub nir_quality_score: Option<f64>,
    pub ripeness_agreement: Option<bool>,
    pub ripeness_confidence: f64,
    pub bbox: [f64; 4],
    pub fusion_method: String,
}

impl TryFrom<FruitRow> for FruitResult {
    type Error = Error;

    fn try_from(row: FruitRow) -> Result<Self> {
        Ok(FruitResult {
            fruit_type: row.fruit_type,
            class_id: row.class_id,
            class_name: row.class_name,
            quality_status: row.quality_status.parse()?,
            ripeness: row.ripeness.parse()?,
            confidence: row.confidence,
            yolo_confidence: row.yolo_confidence,
            nir_confidence: row.nir_confidence,
            nir_ripeness: row.nir_ripeness.map(|r| r.parse()).transpose()?,
            nir_quality_score: row.nir_quality_score,
            ripeness_agreement: row.ripeness_agreement,
            ripeness_confidence: row.ripeness_confidence,
            bbox: BoundingBox::from(row.bbox),
            fusion_method: row.fusion_method.parse()?,
        })
    }
}

/// Serialize per-type counts for the `fruit_counts` column
pub(crate) fn encode_fruit_counts(fruits: &[FruitResult]) -> Result<String> {
    serde_json::to_string(&crate::models::fruit_counts(fruits))
        .map_err(|e| Error::Corrupt(format!("Failed to serialize fruit_counts: {}", e)))
}
