//! Relay `.bin` uploads received over HTTP onto an MQTT topic.
//!
//! The binary in `main.rs` wires these modules together; integration tests
//! build the same router around a fake `Publisher`.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
