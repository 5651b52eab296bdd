pub mod upload_handlers;
