//! Settings page handler - configuration and component status

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use tracing::warn;

use super::{escape_html, layout};
use crate::AppState;

fn status_cell(ok: bool, detail: &str) -> String {
    format!(
        r#"<span class="badge {class}">{label}</span> <span class="muted">{detail}</span>"#,
        class = if ok { "badge-fresh" } else { "badge-rotten" },
        label = if ok { "ready" } else { "unavailable" },
        detail = escape_html(detail),
    )
}

/// GET /settings
pub async fn settings_page(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;

    let detector = match &state.detector {
        Some(d) => status_cell(true, d.backend()),
        None => status_cell(false, "no model loaded"),
    };
    let sensor = match &state.sensor {
        Some(s) => status_cell(s.is_connected(), s.kind()),
        None => status_cell(false, "disabled"),
    };
    let weights = state.fusion.weights();
    let fusion = status_cell(true, &format!("detector {:.2} / NIR {:.2}", weights.yolo(), weights.nir()));
    let database = match state.store.ping().await {
        Ok(()) => status_cell(true, state.store.backend()),
        Err(e) => {
            warn!("Database ping failed: {}", e);
            status_cell(false, state.store.backend())
        }
    };

    let content = format!(
        r#"        <section class="card">
            <h2>Component status</h2>
            <table class="settings-table">
                <tr><th>Detector</th><td>{detector}</td></tr>
                <tr><th>NIR sensor</th><td>{sensor}</td></tr>
                <tr><th>Fusion</th><td>{fusion}</td></tr>
                <tr><th>Database</th><td>{database}</td></tr>
            </table>
        </section>
        <section class="card">
            <h2>Detection</h2>
            <table class="settings-table">
                <tr><th>Inference backend</th><td>{backend}</td></tr>
                <tr><th>Model</th><td>{model}</td></tr>
                <tr><th>Class list</th><td>{classes}</td></tr>
                <tr><th>Confidence threshold</th><td>{conf:.2}</td></tr>
                <tr><th>IoU threshold</th><td>{iou:.2}</td></tr>
                <tr><th>Input size</th><td>{input_size}</td></tr>
            </table>
        </section>
        <section class="card">
            <h2>NIR sensor</h2>
            <table class="settings-table">
                <tr><th>Enabled</th><td>{nir_enabled}</td></tr>
                <tr><th>Mock mode</th><td>{mock_mode}</td></tr>
                <tr><th>Device</th><td>{device}</td></tr>
            </table>
        </section>
        <section class="card">
            <h2>Storage</h2>
            <table class="settings-table">
                <tr><th>Database</th><td>{storage}</td></tr>
                <tr><th>Uploads</th><td>{upload_dir}</td></tr>
                <tr><th>Annotated images</th><td>{processed_dir}</td></tr>
                <tr><th>Upload limit</th><td>{limit} bytes</td></tr>
                <tr><th>Allowed types</th><td>{types}</td></tr>
            </table>
        </section>"#,
        detector = detector,
        sensor = sensor,
        fusion = fusion,
        database = database,
        backend = env!("INFERENCE_BACKEND"),
        model = escape_html(&config.detector.model_path.display().to_string()),
        classes = escape_html(&config.detector.class_list_path.display().to_string()),
        conf = config.detector.confidence_threshold,
        iou = config.detector.iou_threshold,
        input_size = config.detector.input_size,
        nir_enabled = config.nir.enabled,
        mock_mode = config.nir.mock_mode,
        device = escape_html(config.nir.device_id.as_deref().unwrap_or("-")),
        storage = escape_html(&config.storage_description()),
        upload_dir = escape_html(&config.upload.upload_dir.display().to_string()),
        processed_dir = escape_html(&config.upload.processed_dir.display().to_string()),
        limit = config.upload.max_upload_bytes,
        types = escape_html(&config.upload.allowed_extensions.join(", ")),
    );

    Html(layout("Settings", &content))
}
