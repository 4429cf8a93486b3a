//! ONNX Runtime YOLO backend (feature `onnx`)

use fqs_common::config::DetectorConfig;
use image::imageops::FilterType;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

use super::yolo::{decode_predictions, Letterbox, PAD_VALUE};
use super::{non_max_suppression, ClassList, Detection, Detector, DetectorError};

/// YOLO model exported to ONNX
///
/// `Session::run` needs exclusive access, so concurrent requests take
/// turns on the mutex.
pub struct OnnxYoloDetector {
    session: Mutex<Session>,
    output_name: String,
    classes: ClassList,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl OnnxYoloDetector {
    pub fn load(config: &DetectorConfig, classes: ClassList) -> Result<Self, DetectorError> {
        if !config.model_path.exists() {
            return Err(DetectorError::ModelUnavailable(format!(
                "Model weights not found: {}",
                config.model_path.display()
            )));
        }

        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(&config.model_path))
            .map_err(|e| {
                DetectorError::ModelUnavailable(format!(
                    "Failed to load {}: {}",
                    config.model_path.display(),
                    e
                ))
            })?;

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| DetectorError::ModelUnavailable("Model has no outputs".to_string()))?;

        info!(
            "YOLO model loaded from {} ({} classes, input {}px)",
            config.model_path.display(),
            classes.len(),
            config.input_size
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            classes,
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        })
    }

    /// Decode and letterbox into a CHW float buffer
    fn preprocess(&self, image_path: &Path) -> Result<(Vec<f32>, Letterbox), DetectorError> {
        let img = image::open(image_path).map_err(|e| {
            DetectorError::Detection(format!("Cannot decode {}: {}", image_path.display(), e))
        })?;

        let size = self.input_size as usize;
        let letterbox = Letterbox::fit(img.width(), img.height(), self.input_size);
        let rgb = img
            .resize_exact(letterbox.new_w, letterbox.new_h, FilterType::Triangle)
            .to_rgb8();

        let mut chw = vec![PAD_VALUE; 3 * size * size];
        let offset_x = letterbox.pad_x.floor() as usize;
        let offset_y = letterbox.pad_y.floor() as usize;
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (px, py) = (offset_x + x as usize, offset_y + y as usize);
            if px >= size || py >= size {
                continue;
            }
            for channel in 0..3 {
                chw[channel * size * size + py * size + px] = pixel[channel] as f32 / 255.0;
            }
        }

        Ok((chw, letterbox))
    }

    fn infer(&self, input: Vec<f32>) -> Result<(Vec<usize>, Vec<f32>), DetectorError> {
        let size = self.input_size as usize;
        let tensor = Tensor::from_array(([1usize, 3, size, size], input))
            .map_err(|e| DetectorError::Detection(format!("Failed to build input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectorError::Detection("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| DetectorError::Detection(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| DetectorError::Detection(format!("Missing output '{}'", self.output_name)))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::Detection(format!("Unexpected output tensor: {}", e)))?;

        let dims = shape.iter().map(|&d| d.max(0) as usize).collect();
        Ok((dims, data.to_vec()))
    }
}

impl Detector for OnnxYoloDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectorError> {
        let started = Instant::now();

        let (input, letterbox) = self.preprocess(image_path)?;
        let (shape, data) = self.infer(input)?;
        let candidates = decode_predictions(
            &shape,
            &data,
            &letterbox,
            self.confidence_threshold,
            &self.classes,
        )?;
        let candidate_count = candidates.len();
        let detections = non_max_suppression(candidates, self.iou_threshold as f64);

        debug!(
            "Detected {} objects ({} candidates) in {} ms",
            detections.len(),
            candidate_count,
            started.elapsed().as_millis()
        );
        Ok(detections)
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }
}
