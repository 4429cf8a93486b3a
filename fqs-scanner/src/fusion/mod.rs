//! Detector / NIR fusion
//!
//! One detection and one sensor reading of the same region become one
//! [`FruitResult`]. Confidence is a weighted average; quality status and
//! ripeness always come from the detector label, the sensor only votes on
//! agreement.

use fqs_common::config::FusionConfig;
use fqs_common::models::{FruitResult, FusionMethod, Ripeness};
use serde::Serialize;
use thiserror::Error;

use crate::detector::{fruit_type, parse_label, Detection};
use crate::nir::NirReading;

/// Confidence score (0.0-1.0)
pub type Confidence = f64;

/// Allowed deviation of the weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Bonus added to the mean confidence when both ripeness labels agree
const AGREEMENT_BONUS: f64 = 0.1;

#[derive(Debug, Error, PartialEq)]
pub enum FusionError {
    #[error("Invalid fusion weights: yolo={yolo}, nir={nir} (must be non-negative and sum to 1.0)")]
    InvalidWeights { yolo: f64, nir: f64 },
}

/// Validated detector/sensor weight pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionWeights {
    yolo: f64,
    nir: f64,
}

impl FusionWeights {
    pub fn new(yolo: f64, nir: f64) -> Result<Self, FusionError> {
        let valid = yolo.is_finite()
            && nir.is_finite()
            && yolo >= 0.0
            && nir >= 0.0
            && (yolo + nir - 1.0).abs() <= WEIGHT_SUM_TOLERANCE;
        if !valid {
            return Err(FusionError::InvalidWeights { yolo, nir });
        }
        Ok(Self { yolo, nir })
    }

    pub fn yolo(&self) -> f64 {
        self.yolo
    }

    pub fn nir(&self) -> f64 {
        self.nir
    }
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { yolo: 0.6, nir: 0.4 }
    }
}

impl TryFrom<FusionConfig> for FusionWeights {
    type Error = FusionError;

    fn try_from(config: FusionConfig) -> Result<Self, Self::Error> {
        Self::new(config.yolo_weight, config.nir_weight)
    }
}

/// Weighted sum of both confidences, clamped to [0, 1]
pub fn fused_confidence(detector: Confidence, nir: Confidence, weights: FusionWeights) -> Confidence {
    (detector * weights.yolo + nir * weights.nir).clamp(0.0, 1.0)
}

/// Equal or adjacent on `unripe < half-ripe < ripe < overripe`
///
/// Unknown never agrees.
pub fn ripeness_agrees(detector: Ripeness, nir: Ripeness) -> bool {
    match (detector.scale_index(), nir.scale_index()) {
        (Some(a), Some(b)) => a.abs_diff(b) <= 1,
        _ => false,
    }
}

pub fn ripeness_confidence(detector: Confidence, nir: Confidence, agreement: bool) -> Confidence {
    let mean = (detector + nir) / 2.0;
    if agreement {
        (mean + AGREEMENT_BONUS).min(1.0)
    } else {
        mean
    }
}

/// Fusion engine, immutable after startup
#[derive(Debug, Clone, Copy, Default)]
pub struct FusionEngine {
    weights: FusionWeights,
}

impl FusionEngine {
    pub fn new(weights: FusionWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// Combine one detection with the sensor reading of its region
    pub fn fuse(&self, detection: &Detection, reading: &NirReading) -> FruitResult {
        let (quality_status, ripeness) = parse_label(&detection.class_name);
        let agreement = ripeness_agrees(ripeness, reading.ripeness);

        FruitResult {
            fruit_type: fruit_type(&detection.class_name),
            class_id: detection.class_id,
            class_name: detection.class_name.clone(),
            quality_status,
            ripeness,
            confidence: fused_confidence(detection.confidence, reading.confidence, self.weights),
            yolo_confidence: detection.confidence,
            nir_confidence: Some(reading.confidence),
            nir_ripeness: Some(reading.ripeness),
            nir_quality_score: Some(reading.quality_score),
            ripeness_agreement: Some(agreement),
            ripeness_confidence: ripeness_confidence(detection.confidence, reading.confidence, agreement),
            bbox: detection.bbox,
            fusion_method: FusionMethod::WeightedAverage,
        }
    }

    /// Record for a detection when the sensor is disabled
    pub fn detector_only(&self, detection: &Detection) -> FruitResult {
        let (quality_status, ripeness) = parse_label(&detection.class_name);
        let confidence = detection.confidence.clamp(0.0, 1.0);

        FruitResult {
            fruit_type: fruit_type(&detection.class_name),
            class_id: detection.class_id,
            class_name: detection.class_name.clone(),
            quality_status,
            ripeness,
            confidence,
            yolo_confidence: detection.confidence,
            nir_confidence: None,
            nir_ripeness: None,
            nir_quality_score: None,
            ripeness_agreement: None,
            ripeness_confidence: confidence,
            bbox: detection.bbox,
            fusion_method: FusionMethod::YoloOnly,
        }
    }

    /// Freshness percentage shown on the history page
    ///
    /// Always the weighted sum; a record without a NIR reading counts its
    /// NIR share as zero.
    pub fn freshness_percent(&self, fruit: &FruitResult) -> f64 {
        let nir = fruit.nir_confidence.unwrap_or(0.0);
        fused_confidence(fruit.yolo_confidence, nir, self.weights) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fqs_common::models::{BoundingBox, QualityStatus};

    fn detection(class_name: &str, confidence: f64) -> Detection {
        Detection {
            class_id: 1,
            class_name: class_name.to_string(),
            confidence,
            bbox: BoundingBox::new(10.0, 10.0, 60.0, 70.0),
        }
    }

    fn reading(ripeness: Ripeness, confidence: f64) -> NirReading {
        NirReading {
            ripeness_score: 0.7,
            ripeness,
            quality_score: 0.85,
            sugar_content: 14.0,
            moisture_content: 80.0,
            mean_reflectance: 0.5,
            std_reflectance: 0.05,
            confidence,
        }
    }

    #[test]
    fn test_weights_validation() {
        assert!(FusionWeights::new(0.6, 0.4).is_ok());
        assert!(FusionWeights::new(1.0, 0.0).is_ok());
        assert!(FusionWeights::new(0.6, 0.4000001).is_ok());
        assert_eq!(
            FusionWeights::new(0.7, 0.4),
            Err(FusionError::InvalidWeights { yolo: 0.7, nir: 0.4 })
        );
        assert!(FusionWeights::new(1.2, -0.2).is_err());
        assert!(FusionWeights::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_fused_confidence_exact_weighted_sum() {
        let c = fused_confidence(0.85, 0.80, FusionWeights::default());
        assert!((c - 0.83).abs() < 1e-12);
    }

    #[test]
    fn test_fused_confidence_stays_in_unit_interval() {
        let w = FusionWeights::default();
        for det in [0.0, 0.25, 0.5, 1.0] {
            for nir in [0.0, 0.3, 0.95, 1.0] {
                let c = fused_confidence(det, nir, w);
                assert!((0.0..=1.0).contains(&c));
            }
        }
    }

    #[test]
    fn test_agreement_buckets() {
        assert!(ripeness_agrees(Ripeness::Ripe, Ripeness::Ripe));
        assert!(ripeness_agrees(Ripeness::Ripe, Ripeness::Overripe));
        assert!(ripeness_agrees(Ripeness::HalfRipe, Ripeness::Unripe));
        assert!(!ripeness_agrees(Ripeness::Unripe, Ripeness::Ripe));
        assert!(!ripeness_agrees(Ripeness::Unripe, Ripeness::Overripe));
        assert!(!ripeness_agrees(Ripeness::Unknown, Ripeness::Ripe));
    }

    #[test]
    fn test_fuse_detector_label_wins() {
        let engine = FusionEngine::default();
        let fruit = engine.fuse(&detection("Banana Unripe", 0.85), &reading(Ripeness::Overripe, 0.80));

        assert_eq!(fruit.fruit_type, "Banana");
        assert_eq!(fruit.quality_status, QualityStatus::Unripe);
        assert_eq!(fruit.ripeness, Ripeness::Unripe);
        assert_eq!(fruit.nir_ripeness, Some(Ripeness::Overripe));
        assert_eq!(fruit.ripeness_agreement, Some(false));
        assert!((fruit.ripeness_confidence - 0.825).abs() < 1e-12);
        assert!((fruit.confidence - 0.83).abs() < 1e-12);
        assert_eq!(fruit.fusion_method, FusionMethod::WeightedAverage);
    }

    #[test]
    fn test_fuse_agreement_bonus_capped() {
        let engine = FusionEngine::default();
        let fruit = engine.fuse(&detection("Mango Ripe", 0.98), &reading(Ripeness::Ripe, 0.95));
        assert_eq!(fruit.ripeness_agreement, Some(true));
        assert_eq!(fruit.ripeness_confidence, 1.0);
    }

    #[test]
    fn test_detector_only_record() {
        let engine = FusionEngine::default();
        let fruit = engine.detector_only(&detection("Cacao Overripe", 0.72));
        assert_eq!(fruit.fusion_method, FusionMethod::YoloOnly);
        assert_eq!(fruit.confidence, 0.72);
        assert_eq!(fruit.nir_confidence, None);
        assert_eq!(fruit.ripeness_agreement, None);
        assert_eq!(fruit.quality_status, QualityStatus::Overripe);
        assert!((engine.freshness_percent(&fruit) - 72.0 * 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_freshness_percent() {
        let engine = FusionEngine::default();

        let fused = engine.fuse(&detection("Banana Ripe", 0.85), &reading(Ripeness::Ripe, 0.8));
        assert!((engine.freshness_percent(&fused) - 83.0).abs() < 1e-9);

        let detector_only = engine.detector_only(&detection("Banana Ripe", 0.85));
        assert!((engine.freshness_percent(&detector_only) - 51.0).abs() < 1e-9);
    }
}
