//! HTTP API and web UI routes

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub mod detect;
pub mod export;
pub mod health;
pub mod scans;
pub mod ui;

pub use detect::detect;
pub use export::export_scan;
pub use health::health_routes;
pub use scans::{delete_scan, get_scan, get_statistics, list_scans};
pub use ui::ui_routes;

/// Room for multipart boundaries and headers on top of the file itself
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build JSON / CSV routes
///
/// The request body limit on `/api/detect` sits just above the upload
/// limit, so oversized files are still answered with a JSON 413.
pub fn scan_routes(max_upload_bytes: usize) -> Router<AppState> {
    let body_limit = max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/api/detect", post(detect).layer(DefaultBodyLimit::max(body_limit)))
        .route("/api/export/:scan_id", get(export_scan))
        .route("/api/scans", get(list_scans))
        .route("/api/scans/:scan_id", get(get_scan).delete(delete_scan))
        .route("/api/statistics", get(get_statistics))
}
