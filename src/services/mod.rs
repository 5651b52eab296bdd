pub mod mqtt_publisher;
pub mod upload_service;
