//! Represents a file received on the upload endpoint.

use bytes::Bytes;
use serde::Serialize;

/// A single uploaded file, held in memory for the lifetime of one request.
#[derive(Clone, Debug)]
pub struct Upload {
    /// Filename as sent by the client in the multipart part header.
    pub filename: String,

    /// Raw file content.
    pub content: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Success body returned by `POST /upload`.
#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub message: String,
}

impl UploadResponse {
    pub fn published() -> Self {
        Self {
            message: "File uploaded and published to MQTT".into(),
        }
    }
}
