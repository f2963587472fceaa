use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State, rejection::FormRejection},
    http::{HeaderMap, header::CONTENT_TYPE},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::session::{
        ClipUploadResponse, EndSessionResponse, SessionSummary, StartSessionRequest,
        StartSessionResponse,
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Largest clip accepted by the upload route.
pub(crate) const MAX_CLIP_BYTES: usize = 64 * 1024 * 1024;

/// Routes driving the session lifecycle and its archive uploads.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session/start", post(start_session))
        .route("/session/{id}", get(get_session))
        .route("/session/{id}/end", post(end_session))
        .route(
            "/session/{id}/attempts/{attempt_id}/clip",
            post(upload_clip).layer(DefaultBodyLimit::max(MAX_CLIP_BYTES)),
        )
}

/// Start a session and create its archive folder.
#[utoipa::path(
    post,
    path = "/session/start",
    tag = "session",
    request_body(
        content = StartSessionRequest,
        content_type = "application/x-www-form-urlencoded"
    ),
    responses(
        (status = 200, description = "Session started", body = StartSessionResponse),
        (status = 400, description = "Invalid session identifier"),
        (status = 503, description = "Archive unavailable")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    payload: Result<Form<StartSessionRequest>, FormRejection>,
) -> Result<Json<StartSessionResponse>, AppError> {
    let Form(payload) = payload?;
    payload.validate()?;
    let response = session_service::start_session(&state, payload).await?;
    Ok(Json(response))
}

/// Return the in-memory view of a session.
#[utoipa::path(
    get,
    path = "/session/{id}",
    tag = "session",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session state", body = SessionSummary),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    Ok(Json(session_service::get_session(&state, &id)?))
}

/// Close a session and archive attempts and pose samples.
#[utoipa::path(
    post,
    path = "/session/{id}/end",
    tag = "session",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session archived", body = EndSessionResponse),
        (status = 404, description = "Unknown session"),
        (status = 503, description = "Archive unavailable")
    )
)]
pub async fn end_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<EndSessionResponse>, AppError> {
    Ok(Json(session_service::end_session(&state, &id).await?))
}

/// Upload the recorded video of an attempt.
#[utoipa::path(
    post,
    path = "/session/{id}/attempts/{attempt_id}/clip",
    tag = "session",
    params(
        ("id" = String, Path, description = "Session identifier"),
        ("attempt_id" = String, Path, description = "Attempt identifier")
    ),
    request_body(content = Vec<u8>, content_type = "video/webm"),
    responses(
        (status = 200, description = "Clip archived", body = ClipUploadResponse),
        (status = 400, description = "Empty body"),
        (status = 404, description = "Unknown session or attempt"),
        (status = 503, description = "Archive unavailable")
    )
)]
pub async fn upload_clip(
    State(state): State<SharedState>,
    Path((id, attempt_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ClipUploadResponse>, AppError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let response =
        session_service::upload_clip(&state, &id, &attempt_id, content_type, body.to_vec())
            .await?;
    Ok(Json(response))
}
