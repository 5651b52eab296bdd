//! src/services/upload_service.rs
//!
//! UploadService — validates an uploaded `.bin` file, optionally spools it
//! through local disk, publishes its bytes on the configured topic and cleans
//! up after itself. Spool files are named `<uuid>-<filename>` beneath
//! `storage_dir` so concurrent uploads never share a path.

use crate::{
    models::upload::Upload,
    services::mqtt_publisher::{PublishError, Publisher},
};
use bytes::Bytes;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The only accepted file extension.
pub const ALLOWED_EXTENSION: &str = ".bin";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("filename `{0}` does not end in .bin")]
    InvalidExtension(String),
    #[error("filename `{0}` is not a plain file name")]
    InvalidFileName(String),
    #[error("could not save `{path}`: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Publish(#[from] PublishError),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Shared per-process upload pipeline, cloned into every request.
#[derive(Clone)]
pub struct UploadService {
    /// Bus connection borrowed by every request.
    pub publisher: Arc<dyn Publisher>,

    /// Topic every upload is published to.
    pub topic: String,

    /// Directory where uploads are spooled before publishing.
    pub storage_dir: PathBuf,

    /// Round-trip uploads through `storage_dir` before publishing.
    pub spool_to_disk: bool,
}

impl UploadService {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        topic: impl Into<String>,
        storage_dir: impl Into<PathBuf>,
        spool_to_disk: bool,
    ) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            storage_dir: storage_dir.into(),
            spool_to_disk,
        }
    }

    /// Validate, spool, publish and clean up a single upload.
    pub async fn relay(&self, upload: Upload) -> UploadResult<()> {
        ensure_allowed_extension(&upload.filename)?;
        ensure_plain_file_name(&upload.filename)?;

        let size = upload.content.len();
        if self.spool_to_disk {
            self.relay_spooled(&upload.filename, upload.content).await?;
        } else {
            self.publisher.publish(&self.topic, upload.content).await?;
        }

        info!(
            filename = %upload.filename,
            size,
            topic = %self.topic,
            "Published upload"
        );
        Ok(())
    }

    async fn relay_spooled(&self, filename: &str, content: Bytes) -> UploadResult<()> {
        let path = self.spool_path(filename);

        fs::write(&path, &content)
            .await
            .map_err(|source| UploadError::Save {
                path: path.clone(),
                source,
            })?;
        debug!("Spooled {} bytes to {}", content.len(), path.display());

        let result = match fs::read(&path).await {
            Ok(bytes) => self
                .publisher
                .publish(&self.topic, Bytes::from(bytes))
                .await
                .map_err(UploadError::from),
            Err(source) => Err(UploadError::Read {
                path: path.clone(),
                source,
            }),
        };

        // Best-effort cleanup; the caller never sees a removal error.
        if let Err(err) = fs::remove_file(&path).await {
            warn!("Failed to remove spool file {}: {}", path.display(), err);
        }

        result
    }

    fn spool_path(&self, filename: &str) -> PathBuf {
        let name = format!("{}-{}", Uuid::new_v4(), filename);
        self.storage_dir.join(name)
    }
}

/// Accept only names ending in `.bin`. Names shorter than the extension are
/// rejected rather than sliced.
pub fn ensure_allowed_extension(filename: &str) -> UploadResult<()> {
    if filename.ends_with(ALLOWED_EXTENSION) {
        Ok(())
    } else {
        Err(UploadError::InvalidExtension(filename.to_string()))
    }
}

/// Reject anything that is not a single path component.
///
/// The client-supplied name ends up in a filesystem path, so separators and
/// control bytes are refused outright. Dots are fine: the name is always
/// joined behind a `<uuid>-` prefix, so it can never resolve to `.` or `..`.
pub fn ensure_plain_file_name(filename: &str) -> UploadResult<()> {
    let invalid = filename.is_empty()
        || filename
            .bytes()
            .any(|b| b == b'/' || b == b'\\' || b.is_ascii_control());

    if invalid {
        Err(UploadError::InvalidFileName(filename.to_string()))
    } else {
        Ok(())
    }
}
