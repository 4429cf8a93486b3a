//! Error types for the scanner HTTP surface
//!
//! Every API failure is answered with the envelope
//! `{"success": false, "error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::detector::DetectorError;
use crate::nir::SensorError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid upload, bad parameters (400)
    #[error("{0}")]
    BadRequest(String),

    /// Upload above the configured limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Unknown scan (404)
    #[error("{0}")]
    NotFound(String),

    /// No usable detection model (500)
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// NIR sensor not reachable (500)
    #[error("NIR sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// Inference failed for this image (500)
    #[error("Detection failed: {0}")]
    Detection(String),

    /// Storage failure (500)
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error (500)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ModelUnavailable(_)
            | ApiError::SensorUnavailable(_)
            | ApiError::Detection(_)
            | ApiError::Database(_)
            | ApiError::Internal(_)
            | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<fqs_common::Error> for ApiError {
    fn from(err: fqs_common::Error) -> Self {
        match err {
            fqs_common::Error::ScanNotFound(id) => ApiError::NotFound(format!("Scan {} not found", id)),
            fqs_common::Error::Io(e) => ApiError::Io(e),
            fqs_common::Error::Database(e) => ApiError::Database(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DetectorError> for ApiError {
    fn from(err: DetectorError) -> Self {
        match err {
            DetectorError::ModelUnavailable(msg) => ApiError::ModelUnavailable(msg),
            DetectorError::Detection(msg) => ApiError::Detection(msg),
            DetectorError::ClassList(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<SensorError> for ApiError {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::SensorUnavailable(msg) => ApiError::SensorUnavailable(msg),
            SensorError::InvalidSpectrum(msg) => ApiError::Internal(format!("Invalid spectrum: {}", msg)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::PayloadTooLarge("x".into()).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(DetectorError::ModelUnavailable("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_common_not_found_maps_to_404() {
        let id = uuid::Uuid::nil();
        let err = ApiError::from(fqs_common::Error::ScanNotFound(id));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), format!("Scan {} not found", id));
    }
}
