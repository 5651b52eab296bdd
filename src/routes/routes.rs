//! Defines the single upload route.
//!
//! - `POST /upload` — multipart form with a `file` field; the file's bytes are
//!   published to the configured MQTT topic.

use crate::{handlers::upload_handlers::upload_file, services::upload_service::UploadService};
use axum::{Router, extract::DefaultBodyLimit, routing::post};

/// Build and return the router.
///
/// The router carries shared state (`UploadService`) to the handler. Request
/// bodies larger than `max_upload_bytes` fail while the form is being read.
pub fn routes(max_upload_bytes: usize) -> Router<UploadService> {
    Router::new()
        .route("/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
