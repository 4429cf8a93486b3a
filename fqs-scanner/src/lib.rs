//! fqs-scanner library - fruit quality scanner service
//!
//! Upload an image, detect fruits, fuse each detection with a NIR reading
//! of the same region, persist the scan, and serve results and exports.

use axum::Router;
use chrono::{DateTime, Utc};
use fqs_common::config::ScannerConfig;
use fqs_common::db::ScanStore;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod annotate;
pub mod api;
pub mod detector;
pub mod error;
pub mod export;
pub mod fusion;
pub mod nir;
pub mod pagination;
pub mod pipeline;

pub use crate::error::{ApiError, ApiResult};

use crate::detector::Detector;
use crate::fusion::FusionEngine;
use crate::nir::NirSensor;
use crate::pipeline::{PROCESSED_URL, UPLOADS_URL};

/// Application state shared across HTTP handlers
///
/// Built once at startup; everything inside is read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ScannerConfig>,
    /// `None` when no model could be loaded
    pub detector: Option<Arc<dyn Detector>>,
    /// `None` when the sensor is disabled by configuration
    pub sensor: Option<Arc<dyn NirSensor>>,
    pub fusion: FusionEngine,
    pub store: Arc<dyn ScanStore>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: ScannerConfig,
        detector: Option<Arc<dyn Detector>>,
        sensor: Option<Arc<dyn NirSensor>>,
        fusion: FusionEngine,
        store: Arc<dyn ScanStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            detector,
            sensor,
            fusion,
            store,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload.upload_dir);
    let processed = ServeDir::new(&state.config.upload.processed_dir);
    let max_upload_bytes = state.config.upload.max_upload_bytes;

    Router::new()
        // HTML pages
        .merge(api::ui_routes())
        // JSON / CSV API
        .merge(api::scan_routes(max_upload_bytes))
        .merge(api::health_routes())
        // Stored images
        .nest_service(UPLOADS_URL, uploads)
        .nest_service(PROCESSED_URL, processed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
