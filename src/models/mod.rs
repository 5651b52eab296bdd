//! Data models for the upload relay.
//!
//! Uploads are transient: they live for one request and are never persisted
//! beyond the spool file removed at the end of the handler.

pub mod upload;
