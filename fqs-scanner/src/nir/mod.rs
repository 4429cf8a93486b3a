//! Near-infrared sensor
//!
//! A sensor takes a reflectance spectrum of one image region
//! ([`NirSensor::scan_region`]) and interprets it as a ripeness reading
//! ([`NirSensor::analyze_ripeness`]). Two implementations are chosen by
//! configuration:
//! - [`MockNirSensor`]: synthesized spectra, always available
//! - [`HardwareNirSensor`]: device placeholder, no driver bundled

pub mod hardware;
pub mod mock;

pub use hardware::HardwareNirSensor;
pub use mock::MockNirSensor;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fqs_common::config::NirConfig;
use fqs_common::models::{BoundingBox, Ripeness};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Number of spectral bands per scan
pub const BAND_COUNT: usize = 100;
/// First band wavelength (nm)
pub const WAVELENGTH_MIN_NM: f64 = 700.0;
/// Last band wavelength (nm)
pub const WAVELENGTH_MAX_NM: f64 = 2500.0;

/// Sensor errors
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("NIR sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Invalid spectrum: {0}")]
    InvalidSpectrum(String),
}

/// Raw reflectance spectrum of one region
#[derive(Debug, Clone, Serialize)]
pub struct NirSpectrum {
    pub wavelengths: Vec<f64>,
    /// Reflectance per band, 0.0-1.0
    pub reflectance: Vec<f64>,
    pub region: BoundingBox,
    pub captured_at: DateTime<Utc>,
}

/// Ripeness interpretation of a spectrum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NirReading {
    /// Latent ripeness score (0.3-0.9 for the mock sensor)
    pub ripeness_score: f64,
    pub ripeness: Ripeness,
    pub quality_score: f64,
    /// Percent
    pub sugar_content: f64,
    /// Percent
    pub moisture_content: f64,
    pub mean_reflectance: f64,
    pub std_reflectance: f64,
    /// 0.0-1.0
    pub confidence: f64,
}

/// Sensor capability set
#[async_trait]
pub trait NirSensor: Send + Sync {
    /// Open the sensor; scanning fails until this has succeeded
    async fn connect(&self) -> Result<(), SensorError>;

    /// Release the sensor; scanning fails again until the next connect
    async fn disconnect(&self) -> Result<(), SensorError>;

    fn is_connected(&self) -> bool;

    /// Capture a spectrum of `region` within the image at `image_path`
    async fn scan_region(&self, image_path: &Path, region: &BoundingBox) -> Result<NirSpectrum, SensorError>;

    /// Interpret a captured spectrum
    fn analyze_ripeness(&self, spectrum: &NirSpectrum) -> Result<NirReading, SensorError>;

    /// "mock" or "hardware"
    fn kind(&self) -> &'static str;
}

/// Band center wavelengths, evenly spaced over the NIR range
pub fn band_wavelengths() -> Vec<f64> {
    let step = (WAVELENGTH_MAX_NM - WAVELENGTH_MIN_NM) / (BAND_COUNT - 1) as f64;
    (0..BAND_COUNT)
        .map(|i| WAVELENGTH_MIN_NM + step * i as f64)
        .collect()
}

/// Ripeness bucket and quality score for a latent ripeness score
pub fn classify_score(score: f64) -> (Ripeness, f64) {
    if score < 0.4 {
        (Ripeness::Unripe, 0.3)
    } else if score < 0.6 {
        (Ripeness::HalfRipe, 0.6)
    } else if score < 0.8 {
        (Ripeness::Ripe, 0.85)
    } else {
        (Ripeness::Overripe, 0.5)
    }
}

/// Build the configured sensor, `None` when the sensor is disabled
pub fn create_sensor(config: &NirConfig) -> Option<Arc<dyn NirSensor>> {
    if !config.enabled {
        info!("NIR sensor disabled; fusion falls back to detector-only results");
        return None;
    }

    if config.mock_mode {
        info!("Using mock NIR sensor");
        Some(Arc::new(MockNirSensor::new(config.seed)))
    } else {
        info!("Using hardware NIR sensor");
        Some(Arc::new(HardwareNirSensor::new(
            config.device_id.clone(),
            config.api_url.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_wavelengths() {
        let bands = band_wavelengths();
        assert_eq!(bands.len(), BAND_COUNT);
        assert_eq!(bands[0], 700.0);
        assert!((bands[BAND_COUNT - 1] - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_classify_score_thresholds() {
        assert_eq!(classify_score(0.3), (Ripeness::Unripe, 0.3));
        assert_eq!(classify_score(0.4), (Ripeness::HalfRipe, 0.6));
        assert_eq!(classify_score(0.79), (Ripeness::Ripe, 0.85));
        assert_eq!(classify_score(0.8), (Ripeness::Overripe, 0.5));
    }

    #[test]
    fn test_create_sensor_by_config() {
        let mut config = NirConfig::default();
        assert_eq!(create_sensor(&config).map(|s| s.kind()), Some("mock"));

        config.mock_mode = false;
        assert_eq!(create_sensor(&config).map(|s| s.kind()), Some("hardware"));

        config.enabled = false;
        assert!(create_sensor(&config).is_none());
    }
}
