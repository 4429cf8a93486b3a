//! YOLO pre/post-processing math
//!
//! Backend-independent: letterbox geometry and decoding of the raw
//! `[1, 4+C, N]` / `[1, N, 4+C]` prediction tensor into detections.

use fqs_common::models::BoundingBox;

use super::{ClassList, Detection, DetectorError};

/// Gray used for letterbox padding (114/255)
pub const PAD_VALUE: f32 = 114.0 / 255.0;

/// Scale-and-pad transform from an image into the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
    pub new_w: u32,
    pub new_h: u32,
}

impl Letterbox {
    pub fn fit(orig_w: u32, orig_h: u32, input_size: u32) -> Self {
        let scale = (input_size as f32 / orig_w.max(1) as f32).min(input_size as f32 / orig_h.max(1) as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, input_size);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, input_size);
        Self {
            scale,
            pad_x: (input_size - new_w) as f32 / 2.0,
            pad_y: (input_size - new_h) as f32 / 2.0,
            orig_w,
            orig_h,
            new_w,
            new_h,
        }
    }

    /// Map a center-format box in model space back to image pixels
    pub fn to_original(&self, cx: f32, cy: f32, w: f32, h: f32) -> BoundingBox {
        let unmap_x = |v: f32| ((v - self.pad_x) / self.scale).clamp(0.0, self.orig_w as f32) as f64;
        let unmap_y = |v: f32| ((v - self.pad_y) / self.scale).clamp(0.0, self.orig_h as f32) as f64;
        BoundingBox::new(
            unmap_x(cx - w / 2.0),
            unmap_y(cy - h / 2.0),
            unmap_x(cx + w / 2.0),
            unmap_y(cy + h / 2.0),
        )
    }
}

/// Decode raw predictions above `confidence_threshold` (before NMS)
///
/// The orientation is inferred from the shape: the feature axis holds 4 box
/// values plus one score per known class. When neither axis matches the
/// class list, the shorter axis is taken as the feature axis.
pub fn decode_predictions(
    shape: &[usize],
    data: &[f32],
    letterbox: &Letterbox,
    confidence_threshold: f32,
    classes: &ClassList,
) -> Result<Vec<Detection>, DetectorError> {
    let (rows, cols) = match shape {
        [1, rows, cols] => (*rows, *cols),
        [rows, cols] => (*rows, *cols),
        other => {
            return Err(DetectorError::Detection(format!(
                "Unexpected output shape {:?}",
                other
            )))
        }
    };
    if rows.checked_mul(cols) != Some(data.len()) {
        return Err(DetectorError::Detection(format!(
            "Output shape {:?} does not match {} values",
            shape,
            data.len()
        )));
    }

    let expected_features = 4 + classes.len();
    let features_first = if rows == expected_features {
        true
    } else if cols == expected_features {
        false
    } else {
        rows <= cols
    };
    let (features, anchors) = if features_first { (rows, cols) } else { (cols, rows) };
    if features <= 4 {
        return Err(DetectorError::Detection(format!(
            "Output has no class scores (shape {:?})",
            shape
        )));
    }

    let value = |feature: usize, anchor: usize| {
        if features_first {
            data[feature * anchors + anchor]
        } else {
            data[anchor * features + feature]
        }
    };

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let (best_class, best_score) = (4..features)
            .map(|f| (f - 4, value(f, anchor)))
            .fold((0usize, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !best_score.is_finite() || best_score < confidence_threshold {
            continue;
        }

        let bbox = letterbox.to_original(
            value(0, anchor),
            value(1, anchor),
            value(2, anchor),
            value(3, anchor),
        );
        if !bbox.is_valid() {
            continue;
        }

        let class_id = best_class as i64;
        detections.push(Detection {
            class_id,
            class_name: classes.name(class_id),
            confidence: best_score.clamp(0.0, 1.0) as f64,
            bbox,
        });
    }
    Ok(detections)
}
