//! Fruit detector
//!
//! The pretrained YOLO model is wrapped behind the [`Detector`] trait.
//! Inference is CPU-bound and synchronous; callers run it on the blocking
//! thread pool. A detector is loaded once at startup and shared read-only.

pub mod class_list;
pub mod labels;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod yolo;

pub use class_list::ClassList;
pub use labels::{fruit_type, parse_label};

use fqs_common::config::DetectorConfig;
use fqs_common::models::BoundingBox;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Detector errors
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Weights missing or unloadable, or no inference backend compiled in
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Inference failed for one image (unreadable or corrupt file)
    #[error("Detection failed: {0}")]
    Detection(String),

    /// Class list file could not be used
    #[error("Class list error: {0}")]
    ClassList(String),
}

/// One detected object
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: i64,
    pub class_name: String,
    /// 0.0-1.0
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Confidence within [0, 1] and a non-degenerate box
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence) && self.bbox.is_valid()
    }
}

/// Object detector over image files
pub trait Detector: Send + Sync {
    /// Detect fruits in the image at `image_path`
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectorError>;

    /// Backend name for logs and the settings page
    fn backend(&self) -> &'static str;
}

/// Load the configured detector
///
/// Without the `onnx` feature there is no backend and this always returns
/// [`DetectorError::ModelUnavailable`].
pub fn load_detector(config: &DetectorConfig) -> Result<Arc<dyn Detector>, DetectorError> {
    let classes = ClassList::load_or_builtin(&config.class_list_path);

    #[cfg(feature = "onnx")]
    {
        let detector = onnx::OnnxYoloDetector::load(config, classes)?;
        Ok(Arc::new(detector))
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = classes;
        Err(DetectorError::ModelUnavailable(format!(
            "no inference backend compiled in (rebuild with --features onnx to load {})",
            config.model_path.display()
        )))
    }
}

/// Greedy per-class non-maximum suppression
///
/// Keeps the highest-confidence box of each overlapping group (IoU above
/// `iou_threshold`). Output is ordered by descending confidence.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f64) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let overlaps = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: i64, confidence: f64, x: f64) -> Detection {
        Detection {
            class_id,
            class_name: format!("Class_{}", class_id),
            confidence,
            bbox: BoundingBox::new(x, 0.0, x + 10.0, 10.0),
        }
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let kept = non_max_suppression(vec![det(0, 0.6, 1.0), det(0, 0.9, 0.0), det(0, 0.5, 50.0)], 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.5);
    }

    #[test]
    fn test_nms_keeps_other_classes() {
        let kept = non_max_suppression(vec![det(0, 0.9, 0.0), det(1, 0.8, 0.0)], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_detection_validity() {
        assert!(det(0, 0.5, 0.0).is_valid());
        assert!(!det(0, 1.5, 0.0).is_valid());
        let mut flat = det(0, 0.5, 0.0);
        flat.bbox.y2 = flat.bbox.y1;
        assert!(!flat.is_valid());
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_no_backend_is_model_unavailable() {
        let result = load_detector(&DetectorConfig::default());
        assert!(matches!(result, Err(DetectorError::ModelUnavailable(_))));
    }
}
