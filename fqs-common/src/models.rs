//! Scan and fruit data model
//!
//! A [`Scan`] is one upload event; it exclusively owns the ordered list of
//! [`FruitResult`]s detected in that upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Quality status derived from the detector class label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Fresh,
    Ripe,
    Unripe,
    Overripe,
    Rotten,
    Unknown,
}

impl QualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityStatus::Fresh => "fresh",
            QualityStatus::Ripe => "ripe",
            QualityStatus::Unripe => "unripe",
            QualityStatus::Overripe => "overripe",
            QualityStatus::Rotten => "rotten",
            QualityStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fresh" => Ok(QualityStatus::Fresh),
            "ripe" => Ok(QualityStatus::Ripe),
            "unripe" => Ok(QualityStatus::Unripe),
            "overripe" => Ok(QualityStatus::Overripe),
            "rotten" => Ok(QualityStatus::Rotten),
            "unknown" => Ok(QualityStatus::Unknown),
            other => Err(Error::Corrupt(format!("Unknown quality status: {}", other))),
        }
    }
}

/// Ripeness category
///
/// Serialized with the capitalized labels shown to users ("Half-Ripe").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ripeness {
    #[serde(rename = "Unripe")]
    Unripe,
    #[serde(rename = "Half-Ripe")]
    HalfRipe,
    #[serde(rename = "Ripe")]
    Ripe,
    #[serde(rename = "Overripe")]
    Overripe,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Ripeness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ripeness::Unripe => "Unripe",
            Ripeness::HalfRipe => "Half-Ripe",
            Ripeness::Ripe => "Ripe",
            Ripeness::Overripe => "Overripe",
            Ripeness::Unknown => "Unknown",
        }
    }

    /// Position on the ripening scale `unripe < half-ripe < ripe < overripe`
    ///
    /// `None` for [`Ripeness::Unknown`].
    pub fn scale_index(&self) -> Option<u8> {
        match self {
            Ripeness::Unripe => Some(0),
            Ripeness::HalfRipe => Some(1),
            Ripeness::Ripe => Some(2),
            Ripeness::Overripe => Some(3),
            Ripeness::Unknown => None,
        }
    }
}

impl fmt::Display for Ripeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ripeness {
    type Err = Error;

    /// Keyword-based, so free-form sensor labels ("under-ripe", "over ripe")
    /// land in the same buckets as detector labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.contains("unripe") || lower.contains("underripe") || lower.contains("under-ripe") {
            Ok(Ripeness::Unripe)
        } else if lower.contains("half-ripe") || lower.contains("half ripe") {
            Ok(Ripeness::HalfRipe)
        } else if lower.contains("overripe") || lower.contains("over-ripe") || lower.contains("over ripe") {
            Ok(Ripeness::Overripe)
        } else if lower.contains("ripe") {
            Ok(Ripeness::Ripe)
        } else if lower == "unknown" {
            Ok(Ripeness::Unknown)
        } else {
            Err(Error::Corrupt(format!("Unknown ripeness: {}", s)))
        }
    }
}

/// How a fruit record was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    /// Detector and sensor confidences blended with the configured weights
    WeightedAverage,
    /// Sensor disabled, detector result passed through
    YoloOnly,
}

impl FusionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMethod::WeightedAverage => "weighted_average",
            FusionMethod::YoloOnly => "yolo_only",
        }
    }
}

impl FromStr for FusionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weighted_average" => Ok(FusionMethod::WeightedAverage),
            "yolo_only" => Ok(FusionMethod::YoloOnly),
            other => Err(Error::Corrupt(format!("Unknown fusion method: {}", other))),
        }
    }
}

/// Axis-aligned box in pixel space, origin top-left
///
/// Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// `x1 < x2` and `y1 < y2`
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One detected fruit within a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FruitResult {
    /// Fruit name with the ripeness keyword stripped ("Banana")
    pub fruit_type: String,
    pub class_id: i64,
    /// Full detector class label ("Banana Ripe")
    pub class_name: String,
    pub quality_status: QualityStatus,
    pub ripeness: Ripeness,
    /// Fused confidence (0.0-1.0)
    pub confidence: f64,
    pub yolo_confidence: f64,
    pub nir_confidence: Option<f64>,
    pub nir_ripeness: Option<Ripeness>,
    pub nir_quality_score: Option<f64>,
    /// Whether detector and sensor ripeness buckets agree (equal or adjacent)
    pub ripeness_agreement: Option<bool>,
    pub ripeness_confidence: f64,
    pub bbox: BoundingBox,
    pub fusion_method: FusionMethod,
}

/// Scan metadata supplied by the pipeline when persisting
#[derive(Debug, Clone)]
pub struct NewScan {
    pub id: Uuid,
    pub image_path: String,
    pub annotated_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewScan {
    pub fn new(id: Uuid, image_path: impl Into<String>, annotated_image_path: Option<String>) -> Self {
        Self {
            id,
            image_path: image_path.into(),
            annotated_image_path,
            created_at: Utc::now(),
        }
    }
}

/// Persisted scan row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub scan_id: Uuid,
    pub image_path: String,
    pub annotated_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub total_fruits: i64,
    /// Summary counts per fruit type
    pub fruit_counts: BTreeMap<String, i64>,
}

/// Scan with its fruits in detection order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanDetail {
    #[serde(flatten)]
    pub scan: Scan,
    pub fruits: Vec<FruitResult>,
}

/// Aggregate counts across all scans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total_scans: i64,
    pub total_fruits: i64,
    pub fruit_type_counts: BTreeMap<String, i64>,
    pub quality_status_counts: BTreeMap<String, i64>,
}

/// Page of scans to list (1-indexed page)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 100)
    }
}

/// Count fruits per fruit type
pub fn fruit_counts(fruits: &[FruitResult]) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for fruit in fruits {
        *counts.entry(fruit.fruit_type.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_status_serde_lowercase() {
        let json = serde_json::to_string(&QualityStatus::Rotten).unwrap();
        assert_eq!(json, "\"rotten\"");
        assert_eq!("FRESH".parse::<QualityStatus>().unwrap(), QualityStatus::Fresh);
    }

    #[test]
    fn test_ripeness_labels() {
        assert_eq!(serde_json::to_string(&Ripeness::HalfRipe).unwrap(), "\"Half-Ripe\"");
        assert_eq!("half ripe".parse::<Ripeness>().unwrap(), Ripeness::HalfRipe);
        assert_eq!("Over-ripe".parse::<Ripeness>().unwrap(), Ripeness::Overripe);
        assert_eq!("Unripe".parse::<Ripeness>().unwrap(), Ripeness::Unripe);
        assert_eq!("Ripe".parse::<Ripeness>().unwrap(), Ripeness::Ripe);
        assert!("banana".parse::<Ripeness>().is_err());
    }

    #[test]
    fn test_bbox_serializes_as_array() {
        let b = BoundingBox::new(1.0, 2.0, 30.0, 40.0);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,30.0,40.0]");
        let back: BoundingBox = serde_json::from_str("[1.0,2.0,30.0,40.0]").unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_bbox_iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-9);
        assert_eq!(a.iou(&BoundingBox::new(20.0, 20.0, 30.0, 30.0)), 0.0);
        assert!(a.is_valid());
        assert!(!BoundingBox::new(10.0, 0.0, 10.0, 5.0).is_valid());
    }

    #[test]
    fn test_page_request_clamps() {
        let p = PageRequest::new(0, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 1);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }
}
