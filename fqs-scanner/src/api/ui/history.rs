//! History page handler - most recent scans

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use fqs_common::models::{PageRequest, ScanDetail};
use std::fmt::Write;
use tracing::error;

use super::{error_page, escape_html, layout};
use crate::error::ApiResult;
use crate::fusion::FusionEngine;
use crate::AppState;

/// Scans shown on the history page
pub const HISTORY_LIMIT: i64 = 50;

/// GET /history
pub async fn history_page(State(state): State<AppState>) -> Response {
    match load_history(&state).await {
        Ok((details, total_scans, total_fruits)) => {
            let content = render_history(&state.fusion, &details, total_scans, total_fruits);
            Html(layout("History", &content)).into_response()
        }
        Err(e) => {
            error!("History page failed: {}", e);
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Could not load scan history")
        }
    }
}

async fn load_history(state: &AppState) -> ApiResult<(Vec<ScanDetail>, i64, i64)> {
    let scans = state.store.list_scans(PageRequest::new(1, HISTORY_LIMIT)).await?;
    let statistics = state.store.get_statistics().await?;

    let mut details = Vec::with_capacity(scans.len());
    for scan in scans {
        details.push(state.store.get_scan(scan.scan_id).await?);
    }
    Ok((details, statistics.total_scans, statistics.total_fruits))
}

fn render_history(fusion: &FusionEngine, details: &[ScanDetail], total_scans: i64, total_fruits: i64) -> String {
    let latest = details
        .first()
        .map(|d| d.scan.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut rows = String::new();
    for detail in details {
        let scan = &detail.scan;
        if detail.fruits.is_empty() {
            let _ = write!(
                rows,
                r#"
                <tr>
                    <td><a href="/results/{id}">{created}</a></td>
                    <td colspan="4" class="muted">No fruit detected</td>
                </tr>"#,
                id = scan.scan_id,
                created = scan.created_at.format("%Y-%m-%d %H:%M"),
            );
            continue;
        }
        for fruit in &detail.fruits {
            let _ = write!(
                rows,
                r#"
                <tr>
                    <td><a href="/results/{id}">{created}</a></td>
                    <td>{fruit_type}</td>
                    <td><span class="badge badge-{status}">{status}</span></td>
                    <td>{ripeness}</td>
                    <td>{freshness:.1}%</td>
                </tr>"#,
                id = scan.scan_id,
                created = scan.created_at.format("%Y-%m-%d %H:%M"),
                fruit_type = escape_html(&fruit.fruit_type),
                status = fruit.quality_status.as_str(),
                ripeness = fruit.ripeness.as_str(),
                freshness = fusion.freshness_percent(fruit),
            );
        }
    }

    let table = if details.is_empty() {
        r#"<p class="notice">No scans yet. <a href="/">Scan some fruit</a>.</p>"#.to_string()
    } else {
        format!(
            r#"<table class="results-table">
                <thead>
                    <tr><th>Scanned</th><th>Fruit</th><th>Quality</th><th>Ripeness</th><th>Freshness</th></tr>
                </thead>
                <tbody>{rows}
                </tbody>
            </table>"#,
            rows = rows
        )
    };

    format!(
        r#"        <section class="card">
            <h2>Scan history</h2>
            <div class="counts">
                <div class="count"><span class="count-value">{total_scans}</span><span class="count-label">scans</span></div>
                <div class="count"><span class="count-value">{total_fruits}</span><span class="count-label">fruits</span></div>
                <div class="count"><span class="count-value small">{latest}</span><span class="count-label">latest scan</span></div>
            </div>
            {table}
        </section>"#,
        total_scans = total_scans,
        total_fruits = total_fruits,
        latest = latest,
        table = table,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::FusionWeights;

    #[test]
    fn test_render_empty_history() {
        let html = render_history(&FusionEngine::new(FusionWeights::default()), &[], 0, 0);
        assert!(html.contains("No scans yet"));
    }
}
