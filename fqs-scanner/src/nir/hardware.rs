//! Hardware NIR sensor placeholder
//!
//! Holds the device address; no device driver ships with the scanner, so
//! scanning always reports the sensor as unavailable.

use async_trait::async_trait;
use fqs_common::models::BoundingBox;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

use super::{NirReading, NirSensor, NirSpectrum, SensorError};

pub struct HardwareNirSensor {
    device_id: Option<String>,
    api_url: Option<String>,
    connected: AtomicBool,
}

impl HardwareNirSensor {
    pub fn new(device_id: Option<String>, api_url: Option<String>) -> Self {
        Self {
            device_id,
            api_url,
            connected: AtomicBool::new(false),
        }
    }

    fn address(&self) -> Option<&str> {
        self.device_id.as_deref().or(self.api_url.as_deref())
    }
}

#[async_trait]
impl NirSensor for HardwareNirSensor {
    async fn connect(&self) -> Result<(), SensorError> {
        let Some(address) = self.address() else {
            error!("NIR hardware sensor: no device_id or api_url configured");
            return Err(SensorError::SensorUnavailable(
                "no device_id or api_url configured".to_string(),
            ));
        };

        info!("NIR hardware sensor registered at {}", address);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SensorError> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("NIR hardware sensor released ({})", self.address().unwrap_or("unknown"));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn scan_region(&self, _image_path: &Path, _region: &BoundingBox) -> Result<NirSpectrum, SensorError> {
        if !self.is_connected() {
            return Err(SensorError::SensorUnavailable("sensor not connected".to_string()));
        }
        Err(SensorError::SensorUnavailable(format!(
            "no driver available for device {}",
            self.address().unwrap_or("unknown")
        )))
    }

    fn analyze_ripeness(&self, _spectrum: &NirSpectrum) -> Result<NirReading, SensorError> {
        Err(SensorError::SensorUnavailable(
            "hardware ripeness analysis not available".to_string(),
        ))
    }

    fn kind(&self) -> &'static str {
        "hardware"
    }
}
