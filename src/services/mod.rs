/// Remote folder layout of archived sessions.
pub mod archive_layout;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Session lifecycle: start, read-back, end and clip uploads.
pub mod session_service;
/// WebSocket connection and telemetry message handling.
pub mod telemetry_service;
