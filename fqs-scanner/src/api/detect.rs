//! Upload endpoint

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use fqs_common::models::FruitResult;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::{image_url, process_upload, UploadedImage, PROCESSED_URL, UPLOADS_URL};
use crate::AppState;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// One fruit in the detection response
#[derive(Debug, Serialize)]
pub struct FruitResponse {
    #[serde(flatten)]
    pub fruit: FruitResult,
    pub yolo_weight: f64,
    pub nir_weight: f64,
}

/// Successful detection response
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub success: bool,
    pub scan_id: Uuid,
    pub total_fruits: usize,
    pub fruit_counts: BTreeMap<String, i64>,
    pub image_url: Option<String>,
    pub annotated_image_url: Option<String>,
    pub results: Vec<FruitResponse>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File too large".to_string())
    } else {
        ApiError::BadRequest(format!("Invalid multipart request: {}", err.body_text()))
    }
}

/// POST /api/detect
///
/// Multipart form with an `image` file field. Returns the scan id and the
/// fused per-fruit results.
pub async fn detect(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<DetectResponse>> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some(UploadedImage {
            file_name,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No image file provided".to_string()))?;
    let outcome = process_upload(&state, upload).await?;

    let weights = state.fusion.weights();
    let results = outcome
        .fruits
        .into_iter()
        .map(|fruit| FruitResponse {
            fruit,
            yolo_weight: weights.yolo(),
            nir_weight: weights.nir(),
        })
        .collect::<Vec<_>>();

    Ok(Json(DetectResponse {
        success: true,
        scan_id: outcome.scan_id,
        total_fruits: results.len(),
        fruit_counts: outcome.fruit_counts,
        image_url: image_url(UPLOADS_URL, &outcome.image_path.to_string_lossy()),
        annotated_image_url: outcome
            .annotated_image_path
            .and_then(|p| image_url(PROCESSED_URL, &p.to_string_lossy())),
        results,
    }))
}
