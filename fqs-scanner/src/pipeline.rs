//! Upload processing
//!
//! validate -> store upload -> detect -> per detection NIR scan -> fuse
//! -> annotate -> persist. The scan is written in one transaction at the
//! end; any failure before that removes the files written so far and
//! leaves the database untouched.

use fqs_common::config::{file_extension, UploadConfig};
use fqs_common::models::{fruit_counts, FruitResult, NewScan};
use fqs_common::uuid_utils;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::annotate::{annotate_image, processed_file_name};
use crate::detector::Detection;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// URL prefix under which uploads are served
pub const UPLOADS_URL: &str = "/static/images/uploads";
/// URL prefix under which annotated images are served
pub const PROCESSED_URL: &str = "/static/images/processed";

/// Image received from the client
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Result of one processed upload
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan_id: Uuid,
    pub image_path: PathBuf,
    pub annotated_image_path: Option<PathBuf>,
    pub fruits: Vec<FruitResult>,
    pub fruit_counts: BTreeMap<String, i64>,
}

/// Check an upload before any work is done; returns its lowercase extension
pub fn validate_upload(config: &UploadConfig, upload: &UploadedImage) -> ApiResult<String> {
    if upload.file_name.trim().is_empty() {
        return Err(ApiError::BadRequest("No file selected".to_string()));
    }

    let extension = match file_extension(&upload.file_name) {
        Some(ext) if config.is_allowed_file(&upload.file_name) => ext,
        _ => {
            return Err(ApiError::BadRequest(format!(
                "Invalid file type. Allowed types: {}",
                config.allowed_extensions.join(", ")
            )))
        }
    };

    if upload.bytes.len() > config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "File too large: {} bytes (limit {} bytes)",
            upload.bytes.len(),
            config.max_upload_bytes
        )));
    }

    if upload.bytes.is_empty() || !infer::is_image(&upload.bytes) {
        return Err(ApiError::BadRequest("File content is not an image".to_string()));
    }

    Ok(extension)
}

/// Public URL of a stored image, from its file name
pub fn image_url(prefix: &str, path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .map(|name| format!("{}/{}", prefix, name.to_string_lossy()))
}

/// Files written for a scan that is not yet persisted
#[derive(Default)]
struct PendingFiles(Vec<PathBuf>);

impl PendingFiles {
    fn push(&mut self, path: PathBuf) {
        self.0.push(path);
    }

    async fn discard(self) {
        for path in self.0 {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Run the complete scan pipeline for one upload
pub async fn process_upload(state: &AppState, upload: UploadedImage) -> ApiResult<ScanOutcome> {
    let config = &state.config.upload;
    let extension = validate_upload(config, &upload)?;

    let detector = state
        .detector
        .clone()
        .ok_or_else(|| ApiError::ModelUnavailable("No detection model loaded".to_string()))?;

    let scan_id = uuid_utils::generate();
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.processed_dir).await?;

    let image_path = config.upload_dir.join(format!("{}.{}", scan_id, extension));
    tokio::fs::write(&image_path, &upload.bytes).await?;
    info!(
        "Scan {}: stored upload '{}' ({} bytes)",
        scan_id,
        upload.file_name,
        upload.bytes.len()
    );

    let mut pending = PendingFiles::default();
    pending.push(image_path.clone());

    match run_stages(state, detector, scan_id, &image_path, &mut pending).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            warn!("Scan {} failed, discarding files: {}", scan_id, e);
            pending.discard().await;
            Err(e)
        }
    }
}

async fn run_stages(
    state: &AppState,
    detector: Arc<dyn crate::detector::Detector>,
    scan_id: Uuid,
    image_path: &Path,
    pending: &mut PendingFiles,
) -> ApiResult<ScanOutcome> {
    // Detection (CPU-bound)
    let detect_path = image_path.to_path_buf();
    let detections = tokio::task::spawn_blocking(move || detector.detect(&detect_path))
        .await
        .map_err(|e| ApiError::Internal(format!("Detection task failed: {}", e)))??;

    let detections: Vec<Detection> = detections
        .into_iter()
        .filter(|d| {
            let valid = d.is_valid();
            if !valid {
                warn!("Scan {}: dropping invalid detection {:?}", scan_id, d);
            }
            valid
        })
        .collect();
    debug!("Scan {}: {} detections", scan_id, detections.len());

    // Sensor + fusion
    let mut fruits = Vec::with_capacity(detections.len());
    for detection in &detections {
        let fruit = match &state.sensor {
            Some(sensor) => {
                let spectrum = sensor.scan_region(image_path, &detection.bbox).await?;
                let reading = sensor.analyze_ripeness(&spectrum)?;
                state.fusion.fuse(detection, &reading)
            }
            None => state.fusion.detector_only(detection),
        };
        fruits.push(fruit);
    }

    // Annotated copy; a failure here does not fail the scan
    let processed_path = state
        .config
        .upload
        .processed_dir
        .join(processed_file_name(&scan_id));
    let annotated_image_path = {
        let (source, dest, boxes) = (image_path.to_path_buf(), processed_path.clone(), fruits.clone());
        match tokio::task::spawn_blocking(move || annotate_image(&source, &dest, &boxes)).await {
            Ok(Ok(())) => {
                pending.push(processed_path.clone());
                Some(processed_path)
            }
            Ok(Err(e)) => {
                warn!("Scan {}: annotation failed: {}", scan_id, e);
                None
            }
            Err(e) => {
                warn!("Scan {}: annotation task failed: {}", scan_id, e);
                None
            }
        }
    };

    let new_scan = NewScan::new(
        scan_id,
        image_path.to_string_lossy(),
        annotated_image_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
    );
    state.store.save_scan(&new_scan, &fruits).await?;

    info!("Scan {} complete: {} fruits", scan_id, fruits.len());

    Ok(ScanOutcome {
        scan_id,
        image_path: image_path.to_path_buf(),
        annotated_image_path,
        fruit_counts: fruit_counts(&fruits),
        fruits,
    })
}
