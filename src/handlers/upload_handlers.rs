//! HTTP handler for `POST /upload`.
//! Pulls the `file` part out of a multipart form and hands it to
//! `UploadService`; every failure is rendered as a JSON `{"error": ...}` body.

use crate::{
    errors::AppError,
    models::upload::{Upload, UploadResponse},
    services::upload_service::UploadService,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

/// Name of the form field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

/// Upload a `.bin` file and publish its bytes.
pub async fn upload_file(
    State(service): State<UploadService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let upload = read_file_field(multipart).await.map_err(|reason| {
        warn!("Rejected upload: {}", reason);
        AppError::bad_request("Failed to get the file")
    })?;

    service.relay(upload).await?;

    Ok((StatusCode::OK, Json(UploadResponse::published())))
}

/// Find the first `file` part that carries a filename and buffer its content.
/// Other fields, and `file` parts sent as plain values, are skipped.
async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Upload, String> {
    let mut multipart = multipart.map_err(|e| e.to_string())?;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };

        let content = field.bytes().await.map_err(|e| e.to_string())?;
        return Ok(Upload::new(filename, content));
    }

    Err(format!("form has no `{}` field with a filename", FILE_FIELD))
}
