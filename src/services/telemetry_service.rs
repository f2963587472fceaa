use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{archive::upload_json, storage::StorageError},
    dto::{
        session::AttemptSummary,
        telemetry::{AttemptAck, DecodeError, TelemetryCommand, TelemetryErrorReply},
    },
    services::archive_layout::{METADATA_FILE, SCOREBOARD_FILE, attempt_folder, session_folder},
    state::{
        SharedState,
        session::{Attempt, SessionError},
    },
};

/// Internal error type for telemetry frame handling.
///
/// Every variant is reported back to the client; none of them closes the connection.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Frame could not be decoded or failed validation.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Frame referenced missing state or broke an attempt invariant.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// State was updated but archiving it failed.
    #[error("archive update failed: {0}")]
    Storage(#[from] StorageError),
}

/// Handle the full lifecycle of a telemetry WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    info!(%connection_id, "telemetry client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(%connection_id, payload = %text, "received telemetry frame");
                let reply = match handle_frame(&state, &text).await {
                    Ok(Some(ack)) => serde_json::to_string(&ack),
                    Ok(None) => continue,
                    Err(err) => {
                        warn!(%connection_id, error = %err, "telemetry frame rejected");
                        serde_json::to_string(&TelemetryErrorReply {
                            error: err.to_string(),
                        })
                    }
                };
                match reply {
                    Ok(payload) => {
                        if outbound_tx.send(Message::Text(payload.into())).is_err() {
                            info!(%connection_id, "writer closed, terminating");
                            break;
                        }
                    }
                    Err(err) => warn!(%connection_id, error = %err, "failed to serialize reply"),
                }
            }
            Ok(Message::Close(frame)) => {
                info!(%connection_id, "telemetry client closed");
                if outbound_tx.send(Message::Close(frame)).is_err() {
                    debug!(%connection_id, "writer already closed");
                }
                break;
            }
            // Pings are answered by the websocket layer itself.
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    info!(%connection_id, "telemetry client disconnected");
    finalize(writer_task, outbound_tx).await;
}

/// Decode one text frame and apply it.
pub async fn handle_frame(
    state: &SharedState,
    text: &str,
) -> Result<Option<AttemptAck>, TelemetryError> {
    let command = TelemetryCommand::from_json_str(text)?;
    handle_command(state, command).await
}

/// Apply a decoded command to the session store and archive the affected artifacts.
///
/// Returns the acknowledgement to send back, if the command produces one.
pub async fn handle_command(
    state: &SharedState,
    command: TelemetryCommand,
) -> Result<Option<AttemptAck>, TelemetryError> {
    match command {
        TelemetryCommand::Attempt {
            session_id,
            team,
            player_id,
        } => {
            let attempt_id = Uuid::new_v4().simple().to_string();
            let attempt = state
                .sessions()
                .new_attempt(&session_id, &attempt_id, &team, &player_id)?;

            // An attempt is only kept once its id can be acknowledged.
            if let Err(err) = archive_attempt(state, &session_id, &attempt_id, &attempt).await {
                state.sessions().discard_attempt(&session_id, &attempt_id);
                return Err(err.into());
            }

            info!(
                session_id = %session_id,
                attempt_id = %attempt_id,
                team = %team,
                player_id = %player_id,
                "attempt recorded"
            );
            Ok(Some(AttemptAck { attempt_id }))
        }
        TelemetryCommand::Pose {
            session_id,
            attempt_id,
            pose,
        } => {
            let frames = state
                .sessions()
                .append_pose(&session_id, &attempt_id, pose)?;
            debug!(session_id = %session_id, attempt_id = %attempt_id, frames, "pose sample stored");
            Ok(None)
        }
        TelemetryCommand::Resolution {
            session_id,
            attempt_id,
            outcome,
        } => {
            let _archive_guard = state.lock_session_archive(&session_id).await;
            let resolution = state
                .sessions()
                .resolve_attempt(&session_id, &attempt_id, outcome)?;

            let folder = session_folder(state, &session_id).await?;
            upload_json(state.archive(), SCOREBOARD_FILE, &resolution.scoreboard, &folder).await?;

            info!(
                session_id = %session_id,
                attempt_id = %attempt_id,
                team = %resolution.team,
                outcome = ?resolution.outcome,
                scoreboard = ?resolution.scoreboard,
                "attempt resolved"
            );
            Ok(None)
        }
    }
}

async fn archive_attempt(
    state: &SharedState,
    session_id: &str,
    attempt_id: &str,
    attempt: &Attempt,
) -> Result<(), StorageError> {
    let folder = attempt_folder(state, session_id, attempt_id).await?;
    upload_json(
        state.archive(),
        METADATA_FILE,
        &AttemptSummary::new(attempt_id, attempt),
        &folder,
    )
    .await?;
    Ok(())
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
