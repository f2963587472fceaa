use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{dto::validation::validate_identifier, state::session::Outcome};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Frames accepted from telemetry WebSocket clients, as they appear on the wire.
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TelemetryInboundMessage {
    /// A shot has started.
    Attempt {
        session_id: String,
        team: String,
        player_id: String,
    },
    /// One pose sample for a running attempt.
    Pose {
        session_id: String,
        attempt_id: String,
        #[schema(value_type = Object)]
        pose: Value,
    },
    /// The attempt went in.
    Made {
        session_id: String,
        attempt_id: String,
    },
    /// The attempt missed.
    Miss {
        session_id: String,
        attempt_id: String,
    },
}

/// Decoded and validated telemetry command.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryCommand {
    Attempt {
        session_id: String,
        team: String,
        player_id: String,
    },
    Pose {
        session_id: String,
        attempt_id: String,
        pose: Value,
    },
    Resolution {
        session_id: String,
        attempt_id: String,
        outcome: Outcome,
    },
}

/// Reasons a telemetry frame is rejected before touching any state.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed telemetry message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("field `pose` must not be null")]
    NullPose,
}

impl TelemetryCommand {
    /// Parse a text frame and check every required field.
    pub fn from_json_str(text: &str) -> Result<Self, DecodeError> {
        let message = serde_json::from_str::<TelemetryInboundMessage>(text)?;
        Self::try_from(message)
    }
}

impl TryFrom<TelemetryInboundMessage> for TelemetryCommand {
    type Error = DecodeError;

    fn try_from(message: TelemetryInboundMessage) -> Result<Self, Self::Error> {
        match message {
            TelemetryInboundMessage::Attempt {
                session_id,
                team,
                player_id,
            } => {
                check_identifier("session_id", &session_id)?;
                check_not_blank("team", &team)?;
                check_not_blank("player_id", &player_id)?;
                Ok(Self::Attempt {
                    session_id,
                    team,
                    player_id,
                })
            }
            TelemetryInboundMessage::Pose {
                session_id,
                attempt_id,
                pose,
            } => {
                check_identifier("session_id", &session_id)?;
                check_identifier("attempt_id", &attempt_id)?;
                if pose.is_null() {
                    return Err(DecodeError::NullPose);
                }
                Ok(Self::Pose {
                    session_id,
                    attempt_id,
                    pose,
                })
            }
            TelemetryInboundMessage::Made {
                session_id,
                attempt_id,
            } => resolution(session_id, attempt_id, Outcome::Made),
            TelemetryInboundMessage::Miss {
                session_id,
                attempt_id,
            } => resolution(session_id, attempt_id, Outcome::Miss),
        }
    }
}

fn resolution(
    session_id: String,
    attempt_id: String,
    outcome: Outcome,
) -> Result<TelemetryCommand, DecodeError> {
    check_identifier("session_id", &session_id)?;
    check_identifier("attempt_id", &attempt_id)?;
    Ok(TelemetryCommand::Resolution {
        session_id,
        attempt_id,
        outcome,
    })
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), DecodeError> {
    validate_identifier(value).map_err(|err| DecodeError::InvalidField {
        field,
        reason: err
            .message
            .map(|message| message.into_owned())
            .unwrap_or_else(|| err.code.into_owned()),
    })
}

fn check_not_blank(field: &'static str, value: &str) -> Result<(), DecodeError> {
    if value.trim().is_empty() {
        return Err(DecodeError::InvalidField {
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Reply sent after an `attempt` frame has been recorded and archived.
pub struct AttemptAck {
    pub attempt_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Reply sent when a frame could not be processed.
pub struct TelemetryErrorReply {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn attempt_frame_decodes() {
        let command = TelemetryCommand::from_json_str(
            r#"{"type":"attempt","session_id":"g1","team":"A","player_id":"p1"}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            TelemetryCommand::Attempt {
                session_id: "g1".into(),
                team: "A".into(),
                player_id: "p1".into(),
            }
        );
    }

    #[test]
    fn made_and_miss_become_resolutions() {
        let made = TelemetryCommand::from_json_str(
            r#"{"type":"made","session_id":"g1","attempt_id":"x"}"#,
        )
        .unwrap();
        let miss = TelemetryCommand::from_json_str(
            r#"{"type":"miss","session_id":"g1","attempt_id":"x"}"#,
        )
        .unwrap();

        assert!(matches!(
            made,
            TelemetryCommand::Resolution {
                outcome: Outcome::Made,
                ..
            }
        ));
        assert!(matches!(
            miss,
            TelemetryCommand::Resolution {
                outcome: Outcome::Miss,
                ..
            }
        ));
    }

    #[test]
    fn pose_payload_is_kept_verbatim() {
        let command = TelemetryCommand::from_json_str(
            r#"{"type":"pose","session_id":"g1","attempt_id":"x","pose":{"t_ms":12.5,"wrist":{"x":0.1,"y":0.2}}}"#,
        )
        .unwrap();
        let TelemetryCommand::Pose { pose, .. } = command else {
            panic!("expected pose command");
        };
        assert_eq!(pose, json!({"t_ms": 12.5, "wrist": {"x": 0.1, "y": 0.2}}));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let err = TelemetryCommand::from_json_str(r#"{"type":"attempt","session_id":"g1"}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));

        let err = TelemetryCommand::from_json_str(
            r#"{"type":"pose","session_id":"g1","attempt_id":"x"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn unknown_type_and_malformed_json_are_rejected() {
        assert!(matches!(
            TelemetryCommand::from_json_str(r#"{"type":"dunk","session_id":"g1"}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            TelemetryCommand::from_json_str("not json"),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let err = TelemetryCommand::from_json_str(
            r#"{"type":"attempt","session_id":"g1","team":" ","player_id":"p1"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "team", .. }));

        let err = TelemetryCommand::from_json_str(
            r#"{"type":"made","session_id":"","attempt_id":"x"}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidField {
                field: "session_id",
                ..
            }
        ));
    }

    #[test]
    fn null_pose_is_rejected() {
        let err = TelemetryCommand::from_json_str(
            r#"{"type":"pose","session_id":"g1","attempt_id":"x","pose":null}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::NullPose));
    }

    #[test]
    fn ack_serializes_attempt_id_only() {
        let text = serde_json::to_string(&AttemptAck {
            attempt_id: "abc".into(),
        })
        .unwrap();
        assert_eq!(text, r#"{"attempt_id":"abc"}"#);
    }
}
