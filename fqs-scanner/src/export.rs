//! CSV export of a scan's fruits

use fqs_common::models::FruitResult;
use uuid::Uuid;

use crate::error::ApiError;

pub const CSV_HEADER: [&str; 4] = ["Fruit Type", "Quality Status", "Ripeness", "Confidence (%)"];

/// Attachment name offered to the browser
pub fn export_file_name(scan_id: &Uuid) -> String {
    format!("fruit_scan_{}.csv", scan_id)
}

/// One row per fruit in detection order, fused confidence as a percentage
pub fn fruits_to_csv(fruits: &[FruitResult]) -> Result<String, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let csv_err = |e: csv::Error| ApiError::Internal(format!("CSV export failed: {}", e));

    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for fruit in fruits {
        let confidence = format!("{:.1}", fruit.confidence * 100.0);
        writer
            .write_record([
                fruit.fruit_type.as_str(),
                fruit.quality_status.as_str(),
                fruit.ripeness.as_str(),
                confidence.as_str(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))
}
