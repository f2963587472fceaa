use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the free-throw telemetry backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::start_session,
        crate::routes::session::get_session,
        crate::routes::session::end_session,
        crate::routes::session::upload_clip,
        crate::routes::telemetry::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::session::StartSessionRequest,
            crate::dto::session::StartSessionResponse,
            crate::dto::session::SessionDocument,
            crate::dto::session::SessionSummary,
            crate::dto::session::AttemptSummary,
            crate::dto::session::EndSessionResponse,
            crate::dto::session::ClipUploadResponse,
            crate::dto::telemetry::TelemetryInboundMessage,
            crate::dto::telemetry::AttemptAck,
            crate::dto::telemetry::TelemetryErrorReply,
            crate::state::session::Outcome,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Session lifecycle and archive uploads"),
        (name = "telemetry", description = "WebSocket stream for attempts, pose samples and outcomes"),
    )
)]
pub struct ApiDoc;
