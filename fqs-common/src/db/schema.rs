//! Table definitions for both storage backends
//!
//! `scans` owns `fruits` through `fruits.scan_id` with cascading delete.
//! `fruits.position` keeps the detection order of a scan.

/// SQLite schema (idempotent)
pub const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS scans (
        id TEXT PRIMARY KEY,
        image_path TEXT NOT NULL,
        annotated_image_path TEXT,
        created_at TEXT NOT NULL,
        total_fruits INTEGER NOT NULL DEFAULT 0,
        fruit_counts TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_scans_created_at ON scans(created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS fruits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        scan_id TEXT NOT NULL REFERENCES scans(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        fruit_type TEXT NOT NULL,
        class_id INTEGER NOT NULL,
        class_name TEXT NOT NULL,
        quality_status TEXT NOT NULL,
        ripeness TEXT NOT NULL,
        confidence REAL NOT NULL,
        yolo_confidence REAL NOT NULL,
        nir_confidence REAL,
        nir_ripeness TEXT,
        nir_quality_score REAL,
        ripeness_agreement INTEGER,
        ripeness_confidence REAL NOT NULL,
        bbox_x1 REAL NOT NULL,
        bbox_y1 REAL NOT NULL,
        bbox_x2 REAL NOT NULL,
        bbox_y2 REAL NOT NULL,
        fusion_method TEXT NOT NULL,
        UNIQUE (scan_id, position)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_fruits_scan_id ON fruits(scan_id)",
];

/// PostgreSQL schema (idempotent)
pub const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS scans (
        id TEXT PRIMARY KEY,
        image_path TEXT NOT NULL,
        annotated_image_path TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        total_fruits BIGINT NOT NULL DEFAULT 0,
        fruit_counts TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_scans_created_at ON scans(created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS fruits (
        id BIGSERIAL PRIMARY KEY,
        scan_id TEXT NOT NULL REFERENCES scans(id) ON DELETE CASCADE,
        position BIGINT NOT NULL,
        fruit_type TEXT NOT NULL,
        class_id BIGINT NOT NULL,
        class_name TEXT NOT NULL,
        quality_status TEXT NOT NULL,
        ripeness TEXT NOT NULL,
        confidence DOUBLE PRECISION NOT NULL,
        yolo_confidence DOUBLE PRECISION NOT NULL,
        nir_confidence DOUBLE PRECISION,
        nir_ripeness TEXT,
        nir_quality_score DOUBLE PRECISION,
        ripeness_agreement BOOLEAN,
        ripeness_confidence DOUBLE PRECISION NOT NULL,
        bbox_x1 DOUBLE PRECISION NOT NULL,
        bbox_y1 DOUBLE PRECISION NOT NULL,
        bbox_x2 DOUBLE PRECISION NOT NULL,
        bbox_y2 DOUBLE PRECISION NOT NULL,
        fusion_method TEXT NOT NULL,
        UNIQUE (scan_id, position)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_fruits_scan_id ON fruits(scan_id)",
];

/// Columns selected for a scan row, in `ScanRow` order
pub const SCAN_COLUMNS: &str =
    "id, image_path, annotated_image_path, created_at, total_fruits, fruit_counts";

/// Columns selected for a fruit row, in `FruitRow` order
pub const FRUIT_COLUMNS: &str = "fruit_type, class_id, class_name, quality_status, ripeness, \
     confidence, yolo_confidence, nir_confidence, nir_ripeness, nir_quality_score, \
     ripeness_agreement, ripeness_confidence, bbox_x1, bbox_y1, bbox_x2, bbox_y2, fusion_method";
