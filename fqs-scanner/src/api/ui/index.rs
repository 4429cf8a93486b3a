//! Index page handler - image upload form

use axum::extract::State;
use axum::response::{Html, IntoResponse};

use super::{escape_html, layout};
use crate::AppState;

/// GET /
pub async fn index_page(State(state): State<AppState>) -> impl IntoResponse {
    let upload = &state.config.upload;
    let accept = upload
        .allowed_extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");
    let limit_mib = upload.max_upload_bytes as f64 / (1024.0 * 1024.0);

    let notice = if state.detector.is_none() {
        r#"
            <p class="notice warning">No detection model is loaded. Uploads will be rejected.</p>"#
    } else {
        ""
    };

    let content = format!(
        r#"        <section class="card">
            <h2>Scan fruit</h2>
            <p class="subtitle">Upload a photo ({types}, up to {limit:.0} MiB). Each detected fruit is checked with the NIR sensor.</p>{notice}
            <form id="upload-form" enctype="multipart/form-data">
                <input type="file" id="image-input" name="image" accept="{accept}" required>
                <img id="preview" class="preview hidden" alt="Selected image">
                <button type="submit" id="submit-button">Analyze</button>
            </form>
            <p id="upload-status" class="status"></p>
        </section>
        <script src="/static/upload.js"></script>"#,
        types = escape_html(&upload.allowed_extensions.join(", ")),
        limit = limit_mib,
        notice = notice,
        accept = escape_html(&accept),
    );

    Html(layout("Scan", &content))
}
