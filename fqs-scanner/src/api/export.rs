//! CSV export endpoint

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::scans::parse_scan_id;
use crate::error::ApiResult;
use crate::export::{export_file_name, fruits_to_csv};
use crate::AppState;

/// GET /api/export/:scan_id
///
/// Downloads the fruits of a scan as CSV. Unknown ids give a 404 JSON error.
pub async fn export_scan(State(state): State<AppState>, Path(scan_id): Path<String>) -> ApiResult<Response> {
    let scan_id = parse_scan_id(&scan_id)?;
    let detail = state.store.get_scan(scan_id).await?;

    let body = fruits_to_csv(&detail.fruits)?;
    debug!("Exporting {} fruits for scan {}", detail.fruits.len(), scan_id);

    let disposition = format!("attachment; filename=\"{}\"", export_file_name(&scan_id));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
