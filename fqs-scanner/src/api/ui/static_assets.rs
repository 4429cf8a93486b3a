//! Static asset handlers for the scanner UI
//!
//! Embeds and serves CSS/JS files at compile time

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

const FQS_UI_CSS: &str = include_str!("../../../static/fqs-ui.css");
const UPLOAD_JS: &str = include_str!("../../../static/upload.js");

/// GET /static/fqs-ui.css
pub async fn serve_fqs_ui_css() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "text/css"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        FQS_UI_CSS,
    )
        .into_response()
}

/// GET /static/upload.js
///
/// Posts the selected image to /api/detect and opens the results page
pub async fn serve_upload_js() -> Response {
    (
        StatusCode::OK,
        [
            ("content-type", "application/javascript"),
            ("cache-control", "no-cache, no-store, must-revalidate"),
        ],
        UPLOAD_JS,
    )
        .into_response()
}
