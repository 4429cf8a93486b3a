//! Scan listing, lookup, deletion and statistics

use axum::extract::{Path, Query, State};
use axum::Json;
use fqs_common::models::{Scan, ScanDetail, ScanStatistics};
use fqs_common::uuid_utils;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pagination::calculate_pagination;
use crate::AppState;

/// Query parameters for GET /api/scans
#[derive(Debug, Default, Deserialize)]
pub struct ListScansParams {
    #[serde(default = "default_page")]
    pub page: i64,
    pub page_size: Option<i64>,
}

fn default_page() -> i64 {
    1
}

/// Page of scans, newest first
#[derive(Debug, Serialize)]
pub struct ListScansResponse {
    pub success: bool,
    pub scans: Vec<Scan>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// One scan with its fruits
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    #[serde(flatten)]
    pub detail: ScanDetail,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub scan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub statistics: ScanStatistics,
}

/// Malformed ids are reported the same as unknown ones
pub(crate) fn parse_scan_id(raw: &str) -> ApiResult<Uuid> {
    uuid_utils::parse(raw).map_err(|_| ApiError::NotFound("Scan not found".to_string()))
}

/// GET /api/scans?page=&page_size=
pub async fn list_scans(
    State(state): State<AppState>,
    Query(params): Query<ListScansParams>,
) -> ApiResult<Json<ListScansResponse>> {
    let total = state.store.count_scans().await?;
    let pagination = calculate_pagination(total, params.page, params.page_size);
    let scans = state.store.list_scans(pagination.page_request()).await?;

    Ok(Json(ListScansResponse {
        success: true,
        scans,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
        total_pages: pagination.total_pages,
    }))
}

/// GET /api/scans/:scan_id
pub async fn get_scan(State(state): State<AppState>, Path(scan_id): Path<String>) -> ApiResult<Json<ScanResponse>> {
    let scan_id = parse_scan_id(&scan_id)?;
    let detail = state.store.get_scan(scan_id).await?;
    Ok(Json(ScanResponse { success: true, detail }))
}

/// DELETE /api/scans/:scan_id
///
/// Removes the scan, its fruits and its stored images.
pub async fn delete_scan(State(state): State<AppState>, Path(scan_id): Path<String>) -> ApiResult<Json<DeleteResponse>> {
    let scan_id = parse_scan_id(&scan_id)?;
    let detail = state.store.get_scan(scan_id).await?;
    state.store.delete_scan(scan_id).await?;

    let files = std::iter::once(detail.scan.image_path.as_str()).chain(detail.scan.annotated_image_path.as_deref());
    for file in files {
        if let Err(e) = tokio::fs::remove_file(file).await {
            tracing::warn!("Scan {}: could not remove {}: {}", scan_id, file, e);
        }
    }

    info!("Deleted scan {}", scan_id);
    Ok(Json(DeleteResponse { success: true, scan_id }))
}

/// GET /api/statistics
pub async fn get_statistics(State(state): State<AppState>) -> ApiResult<Json<StatisticsResponse>> {
    let statistics = state.store.get_statistics().await?;
    Ok(Json(StatisticsResponse { success: true, statistics }))
}
