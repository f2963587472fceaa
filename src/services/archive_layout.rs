//! Folder and file names of the remote session archive.
//!
//! ```text
//! <root>/<session_id>/session.json
//!                    /scoreboard.json
//!                    /attempts.json
//!                    /attempts/<attempt_id>/metadata.json
//!                                          /pose.json
//!                                          /clip.<ext>
//! ```

use crate::{
    dao::{
        archive::{ArchiveStore, FolderId},
        storage::StorageResult,
    },
    state::SharedState,
};

pub const SESSION_FILE: &str = "session.json";
pub const SCOREBOARD_FILE: &str = "scoreboard.json";
pub const ATTEMPTS_FILE: &str = "attempts.json";
pub const ATTEMPTS_FOLDER: &str = "attempts";
pub const METADATA_FILE: &str = "metadata.json";
pub const POSE_FILE: &str = "pose.json";
pub const CLIP_STEM: &str = "clip";
pub const DEFAULT_CLIP_MIME: &str = "video/webm";

/// Folder holding every artifact of `session_id`.
pub async fn session_folder(state: &SharedState, session_id: &str) -> StorageResult<FolderId> {
    state
        .archive()
        .get_or_create_folder(session_id.to_string(), Some(state.root_folder().clone()))
        .await
}

/// Folder holding the artifacts of a single attempt, creating intermediate folders.
pub async fn attempt_folder(
    state: &SharedState,
    session_id: &str,
    attempt_id: &str,
) -> StorageResult<FolderId> {
    let session = session_folder(state, session_id).await?;
    let attempts = state
        .archive()
        .get_or_create_folder(ATTEMPTS_FOLDER.to_string(), Some(session))
        .await?;
    state
        .archive()
        .get_or_create_folder(attempt_id.to_string(), Some(attempts))
        .await
}

/// File name for an attempt clip with the given MIME type.
pub fn clip_file_name(mime: &str) -> String {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    let extension = match essence {
        "video/webm" | "audio/webm" => "webm".to_string(),
        "video/mp4" => "mp4".to_string(),
        "video/quicktime" => "mov".to_string(),
        "application/octet-stream" => "bin".to_string(),
        other => other
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .filter(|subtype| {
                !subtype.is_empty()
                    && subtype
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
            .unwrap_or("bin")
            .to_ascii_lowercase(),
    };
    format!("{CLIP_STEM}.{extension}")
}
