//! UI Routes - HTML pages for the scanner web interface
//!
//! # Structure
//! - **Static Assets** (`static_assets`): CSS/JS file serving
//! - **Index Page** (`index`): image upload form
//! - **Results Page** (`results`): annotated image and per-fruit table
//! - **History Page** (`history`): most recent scans
//! - **Settings Page** (`settings`): configuration and component status

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, Router};

use crate::AppState;

mod history;
mod index;
mod results;
mod settings;
mod static_assets;

use history::history_page;
use index::index_page;
use results::results_page;
use settings::settings_page;
use static_assets::{serve_fqs_ui_css, serve_upload_js};

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        // Page routes
        .route("/", get(index_page))
        .route("/results/:scan_id", get(results_page))
        .route("/history", get(history_page))
        .route("/settings", get(settings_page))
        // Static assets
        .route("/static/fqs-ui.css", get(serve_fqs_ui_css))
        .route("/static/upload.js", get(serve_upload_js))
}

/// Escape text for an HTML body or attribute
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap page content in the shared header and navigation
pub(crate) fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Fruit Quality Scanner</title>
    <link rel="stylesheet" href="/static/fqs-ui.css">
</head>
<body>
    <header>
        <div class="header-content">
            <div class="header-left">
                <h1>Fruit Quality Scanner</h1>
                <nav>
                    <a href="/">Scan</a>
                    <a href="/history">History</a>
                    <a href="/settings">Settings</a>
                </nav>
            </div>
            <div class="header-right">
                <div class="build-info-line">v{version} [{git_hash}]</div>
                <div class="build-info-line">{build_timestamp} ({build_profile})</div>
            </div>
        </div>
    </header>
    <main class="container">
{content}
    </main>
</body>
</html>
"#,
        title = escape_html(title),
        content = content,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_timestamp = env!("BUILD_TIMESTAMP"),
        build_profile = env!("BUILD_PROFILE"),
    )
}

/// Rendered error page with the given status
pub(crate) fn error_page(status: StatusCode, message: &str) -> Response {
    let content = format!(
        r#"        <section class="card error-card">
            <h2>{code}</h2>
            <p>{message}</p>
            <p><a href="/">Back to scanner</a></p>
        </section>"#,
        code = status.as_u16(),
        message = escape_html(message),
    );
    (status, Html(layout("Error", &content))).into_response()
}
