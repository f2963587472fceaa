use tracing::warn;

use crate::{dao::archive::ArchiveStore, dto::health::HealthResponse, state::SharedState};

/// Probe the archive and report it together with the number of live sessions.
///
/// A failing archive never turns into an error here; it only degrades the status.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let reachable = match state.archive().health_check().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "archive health check failed");
            false
        }
    };
    HealthResponse::new(reachable, state.sessions().len())
}
