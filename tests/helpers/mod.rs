#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use bin_relay::{
    routes::routes::routes,
    services::{
        mqtt_publisher::{PublishError, PublishResult, Publisher},
        upload_service::UploadService,
    },
};
use bytes::Bytes;
use serde_json::Value;
use std::{path::PathBuf, sync::Arc, sync::Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

pub const TOPIC: &str = "file/bin";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// In-memory publisher that records every payload, or fails every call.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(String, Bytes)>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn published(&self) -> Vec<(String, Bytes)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> PublishResult<()> {
        if self.fail {
            return Err(PublishError::ConnectionLost("simulated broker error".into()));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }
}

/// Test application state
pub struct TestApp {
    pub router: Router,
    pub publisher: Arc<RecordingPublisher>,
    pub storage_dir: TempDir,
}

impl TestApp {
    /// Send a request through the router and decode the JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    /// Whether the spool directory holds no files.
    pub fn storage_is_empty(&self) -> bool {
        std::fs::read_dir(self.storage_dir.path())
            .unwrap()
            .next()
            .is_none()
    }
}

pub struct TestAppBuilder {
    publisher: RecordingPublisher,
    spool_to_disk: bool,
    max_upload_bytes: usize,
    storage_subdir: Option<PathBuf>,
}

impl TestAppBuilder {
    pub fn failing_publisher(mut self) -> Self {
        self.publisher = RecordingPublisher::failing();
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.spool_to_disk = false;
        self
    }

    pub fn max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    /// Spool into a path under the temp dir that is never created.
    pub fn missing_storage_dir(mut self) -> Self {
        self.storage_subdir = Some(PathBuf::from("missing"));
        self
    }

    pub fn build(self) -> TestApp {
        let storage_dir = TempDir::new().unwrap();
        let publisher = Arc::new(self.publisher);

        let spool_dir = match self.storage_subdir {
            Some(sub) => storage_dir.path().join(sub),
            None => storage_dir.path().to_path_buf(),
        };
        let service = UploadService::new(publisher.clone(), TOPIC, spool_dir, self.spool_to_disk);
        let router = routes(self.max_upload_bytes).with_state(service);

        TestApp {
            router,
            publisher,
            storage_dir,
        }
    }
}

pub fn test_app() -> TestAppBuilder {
    TestAppBuilder {
        publisher: RecordingPublisher::default(),
        spool_to_disk: true,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        storage_subdir: None,
    }
}

/// Setup a test application with a recording publisher and a fresh spool dir
pub fn setup_test_app() -> TestApp {
    test_app().build()
}
