use crate::services::upload_service::UploadError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));

        (self.status, body).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match &err {
            UploadError::InvalidExtension(_) => {
                warn!("Rejected upload: {}", err);
                AppError::bad_request("Only .bin files are allowed")
            }
            UploadError::InvalidFileName(_) => {
                warn!("Rejected upload: {}", err);
                AppError::bad_request("Invalid file name")
            }
            UploadError::Save { .. } => {
                error!("Upload failed: {}", err);
                AppError::internal("Failed to save the file")
            }
            UploadError::Read { .. } => {
                error!("Upload failed: {}", err);
                AppError::internal("Failed to read the file")
            }
            UploadError::Publish(_) => {
                error!("Upload failed: {}", err);
                AppError::internal("Failed to publish to MQTT")
            }
        }
    }
}
