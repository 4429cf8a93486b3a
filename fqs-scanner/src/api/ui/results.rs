//! Results page handler - one scan with its fruits

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use fqs_common::models::{FruitResult, QualityStatus, ScanDetail};
use std::fmt::Write;
use tracing::error;

use super::{error_page, escape_html, layout};
use crate::error::ApiError;
use crate::pipeline::{image_url, PROCESSED_URL, UPLOADS_URL};
use crate::AppState;

/// GET /results/:scan_id
///
/// Unknown or malformed ids render a 404 page.
pub async fn results_page(State(state): State<AppState>, Path(scan_id): Path<String>) -> Response {
    let scan_id = match uuid::Uuid::parse_str(&scan_id) {
        Ok(id) => id,
        Err(_) => return error_page(StatusCode::NOT_FOUND, "Scan not found"),
    };

    match state.store.get_scan(scan_id).await.map_err(ApiError::from) {
        Ok(detail) => Html(layout("Results", &render_results(&detail))).into_response(),
        Err(ApiError::NotFound(msg)) => error_page(StatusCode::NOT_FOUND, &msg),
        Err(e) => {
            error!("Results page for scan {} failed: {}", scan_id, e);
            error_page(e.status(), "Could not load scan results")
        }
    }
}

/// Number of fruits per quality status, in display order
fn status_counts(fruits: &[FruitResult]) -> Vec<(QualityStatus, usize)> {
    [
        QualityStatus::Fresh,
        QualityStatus::Ripe,
        QualityStatus::Unripe,
        QualityStatus::Overripe,
        QualityStatus::Rotten,
        QualityStatus::Unknown,
    ]
    .into_iter()
    .map(|status| (status, fruits.iter().filter(|f| f.quality_status == status).count()))
    .collect()
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "-".to_string(),
    }
}

pub(crate) fn render_results(detail: &ScanDetail) -> String {
    let scan = &detail.scan;
    let image = scan
        .annotated_image_path
        .as_deref()
        .and_then(|p| image_url(PROCESSED_URL, p))
        .or_else(|| image_url(UPLOADS_URL, &scan.image_path))
        .unwrap_or_default();

    let mut counts = String::new();
    for (status, count) in status_counts(&detail.fruits) {
        // Only the three headline buckets are always shown
        let always = matches!(status, QualityStatus::Fresh | QualityStatus::Ripe | QualityStatus::Unripe);
        if always || count > 0 {
            let _ = write!(
                counts,
                r#"<div class="count count-{s}"><span class="count-value">{count}</span><span class="count-label">{s}</span></div>"#,
                s = status.as_str(),
                count = count,
            );
        }
    }

    let mut rows = String::new();
    for (i, fruit) in detail.fruits.iter().enumerate() {
        let _ = write!(
            rows,
            r#"
                <tr>
                    <td>{n}</td>
                    <td>{fruit_type}</td>
                    <td><span class="badge badge-{status}">{status}</span></td>
                    <td>{ripeness}</td>
                    <td>{confidence}</td>
                    <td>{yolo}</td>
                    <td>{nir}</td>
                    <td>{agreement}</td>
                    <td>{method}</td>
                </tr>"#,
            n = i + 1,
            fruit_type = escape_html(&fruit.fruit_type),
            status = fruit.quality_status.as_str(),
            ripeness = fruit.ripeness.as_str(),
            confidence = percent(Some(fruit.confidence)),
            yolo = percent(Some(fruit.yolo_confidence)),
            nir = percent(fruit.nir_confidence),
            agreement = match fruit.ripeness_agreement {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            },
            method = fruit.fusion_method.as_str(),
        );
    }

    let table = if detail.fruits.is_empty() {
        r#"<p class="notice">No fruit was detected in this image.</p>"#.to_string()
    } else {
        format!(
            r#"<table class="results-table">
                <thead>
                    <tr><th>#</th><th>Fruit</th><th>Quality</th><th>Ripeness</th><th>Confidence</th><th>Detector</th><th>NIR</th><th>Agreement</th><th>Method</th></tr>
                </thead>
                <tbody>{rows}
                </tbody>
            </table>"#,
            rows = rows
        )
    };

    format!(
        r#"        <section class="card">
            <h2>Scan results</h2>
            <p class="subtitle">Scan {id} &middot; {created} &middot; {total} fruit(s)</p>
            <img class="scan-image" src="{image}" alt="Scanned image">
            <div class="counts">{counts}</div>
            {table}
            <p class="actions">
                <a class="button" href="/api/export/{id}">Export CSV</a>
                <a class="button secondary" href="/">Scan another</a>
            </p>
        </section>"#,
        id = scan.scan_id,
        created = scan.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        total = detail.fruits.len(),
        image = escape_html(&image),
        counts = counts,
        table = table,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fqs_common::models::{BoundingBox, FusionMethod, Ripeness, Scan};
    use std::collections::BTreeMap;

    fn fruit(fruit_type: &str, status: QualityStatus) -> FruitResult {
        FruitResult {
            fruit_type: fruit_type.to_string(),
            class_id: 0,
            class_name: format!("{} Ripe", fruit_type),
            quality_status: status,
            ripeness: Ripeness::Ripe,
            confidence: 0.83,
            yolo_confidence: 0.85,
            nir_confidence: Some(0.8),
            nir_ripeness: Some(Ripeness::Ripe),
            nir_quality_score: Some(0.7),
            ripeness_agreement: Some(true),
            ripeness_confidence: 0.92,
            bbox: BoundingBox::new(1.0, 2.0, 30.0, 40.0),
            fusion_method: FusionMethod::WeightedAverage,
        }
    }

    #[test]
    fn test_status_counts() {
        let fruits = vec![
            fruit("Banana", QualityStatus::Ripe),
            fruit("Mango", QualityStatus::Ripe),
            fruit("Apple", QualityStatus::Rotten),
        ];
        let counts = status_counts(&fruits);
        assert!(counts.contains(&(QualityStatus::Ripe, 2)));
        assert!(counts.contains(&(QualityStatus::Rotten, 1)));
        assert!(counts.contains(&(QualityStatus::Fresh, 0)));
    }

    #[test]
    fn test_render_escapes_fruit_type() {
        let detail = ScanDetail {
            scan: Scan {
                scan_id: uuid::Uuid::new_v4(),
                image_path: "uploads/a.png".to_string(),
                annotated_image_path: None,
                created_at: Utc::now(),
                total_fruits: 1,
                fruit_counts: BTreeMap::new(),
            },
            fruits: vec![fruit("<Kiwi>", QualityStatus::Fresh)],
        };
        let html = render_results(&detail);
        assert!(html.contains("&lt;Kiwi&gt;"));
        assert!(html.contains("/static/images/uploads/a.png"));
        assert!(html.contains("83.0%"));
    }
}
