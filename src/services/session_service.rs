use tracing::{info, warn};

use crate::{
    dao::archive::{ArchiveStore, upload_json},
    dto::session::{
        AttemptSummary, ClipUploadResponse, EndSessionResponse, PoseDocument, SessionDocument,
        SessionSummary, StartSessionRequest, StartSessionResponse,
    },
    error::ServiceError,
    services::archive_layout::{
        self, ATTEMPTS_FILE, DEFAULT_CLIP_MIME, POSE_FILE, SESSION_FILE, attempt_folder,
        session_folder,
    },
    state::SharedState,
};

/// Start (or restart) a session in memory and create its archive folder.
///
/// Restarting an existing identifier discards every attempt recorded so far.
pub async fn start_session(
    state: &SharedState,
    request: StartSessionRequest,
) -> Result<StartSessionResponse, ServiceError> {
    let session_id = request.session_id;
    if state.sessions().get_session(&session_id).is_some() {
        warn!(session_id = %session_id, "restarting session; previous attempts are discarded");
    }

    let _archive_guard = state.lock_session_archive(&session_id).await;
    let session = state.sessions().start_session(&session_id);
    let folder = session_folder(state, &session_id).await?;
    upload_json(
        state.archive(),
        SESSION_FILE,
        &SessionDocument::from(&session),
        &folder,
    )
    .await?;

    info!(session_id = %session_id, folder = %folder, "session started");
    Ok(StartSessionResponse { ok: true })
}

/// Current view of a session.
pub fn get_session(state: &SharedState, session_id: &str) -> Result<SessionSummary, ServiceError> {
    state
        .sessions()
        .get_session(session_id)
        .map(|session| SessionSummary::from(&session))
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))
}

/// Mark the session as finished and archive its aggregate artifacts.
///
/// Uploads `session.json` and `attempts.json` to the session folder, then one
/// `pose.json` per attempt that received pose samples.
pub async fn end_session(
    state: &SharedState,
    session_id: &str,
) -> Result<EndSessionResponse, ServiceError> {
    let _archive_guard = state.lock_session_archive(session_id).await;
    let session = state.sessions().end_session(session_id)?;
    let folder = session_folder(state, session_id).await?;

    upload_json(
        state.archive(),
        SESSION_FILE,
        &SessionDocument::from(&session),
        &folder,
    )
    .await?;

    let attempts = session
        .attempts
        .iter()
        .map(|(id, attempt)| AttemptSummary::new(id, attempt))
        .collect::<Vec<_>>();
    upload_json(state.archive(), ATTEMPTS_FILE, &attempts, &folder).await?;

    let mut pose_frames_archived = 0;
    for (attempt_id, attempt) in session.attempts.iter().filter(|(_, a)| !a.pose.is_empty()) {
        let pose_folder = attempt_folder(state, session_id, attempt_id).await?;
        let document = PoseDocument {
            attempt_id,
            frames: &attempt.pose,
        };
        upload_json(state.archive(), POSE_FILE, &document, &pose_folder).await?;
        pose_frames_archived += attempt.pose.len();
    }

    info!(
        session_id = %session_id,
        attempts = attempts.len(),
        pose_frames = pose_frames_archived,
        "session archived"
    );

    Ok(EndSessionResponse {
        session_id: session.id,
        attempts: attempts.len(),
        pose_frames_archived,
        scoreboard: session.scoreboard,
    })
}

/// Store a recorded clip of an attempt next to its metadata.
pub async fn upload_clip(
    state: &SharedState,
    session_id: &str,
    attempt_id: &str,
    content_type: Option<&str>,
    content: Vec<u8>,
) -> Result<ClipUploadResponse, ServiceError> {
    if content.is_empty() {
        return Err(ServiceError::InvalidInput("clip body must not be empty".into()));
    }
    state.sessions().attempt(session_id, attempt_id)?;

    let mime = content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CLIP_MIME)
        .to_string();
    let name = archive_layout::clip_file_name(&mime);
    let size = content.len();

    let folder = attempt_folder(state, session_id, attempt_id).await?;
    let file_id = state
        .archive()
        .upload_file(name.clone(), content, mime, folder)
        .await?;

    info!(session_id = %session_id, attempt_id = %attempt_id, file = %name, bytes = size, "clip archived");
    Ok(ClipUploadResponse { name, file_id })
}
