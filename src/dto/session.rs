use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::archive::FileId,
    dto::{format_system_time, validation::validate_identifier},
    state::session::{Attempt, Outcome, Scoreboard, Session},
};

/// Form payload accepted by `POST /session/start`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartSessionRequest {
    #[validate(custom(function = "validate_identifier"))]
    pub session_id: String,
}

/// Acknowledgement returned once the session exists locally and remotely.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartSessionResponse {
    pub ok: bool,
}

/// Contents of `session.json`.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionDocument {
    pub session_id: String,
    pub created_at: String,
    pub ended_at: Option<String>,
    #[schema(value_type = Object)]
    pub scoreboard: Scoreboard,
    pub attempts: usize,
}

impl From<&Session> for SessionDocument {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            created_at: format_system_time(session.created_at),
            ended_at: session.ended_at.map(format_system_time),
            scoreboard: session.scoreboard.clone(),
            attempts: session.attempts.len(),
        }
    }
}

/// Per-attempt description used by `metadata.json`, `attempts.json` and read-back.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttemptSummary {
    pub attempt_id: String,
    pub team: String,
    pub player_id: String,
    /// Outcome of the shot (`unknown`, `made` or `miss`).
    #[serde(rename = "made")]
    pub outcome: Outcome,
    pub created_at: String,
    pub resolved_at: Option<String>,
    pub pose_frames: usize,
}

impl AttemptSummary {
    pub fn new(attempt_id: &str, attempt: &Attempt) -> Self {
        Self {
            attempt_id: attempt_id.to_string(),
            team: attempt.team.clone(),
            player_id: attempt.player_id.clone(),
            outcome: attempt.outcome,
            created_at: format_system_time(attempt.created_at),
            resolved_at: attempt.resolved_at.map(format_system_time),
            pose_frames: attempt.pose.len(),
        }
    }
}

/// Contents of an attempt's `pose.json`.
#[derive(Debug, Serialize)]
pub struct PoseDocument<'a> {
    pub attempt_id: &'a str,
    pub frames: &'a [Value],
}

/// Full view of a session returned by `GET /session/{id}`.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: String,
    pub ended_at: Option<String>,
    #[schema(value_type = Object)]
    pub scoreboard: Scoreboard,
    pub attempts: Vec<AttemptSummary>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            created_at: format_system_time(session.created_at),
            ended_at: session.ended_at.map(format_system_time),
            scoreboard: session.scoreboard.clone(),
            attempts: session
                .attempts
                .iter()
                .map(|(id, attempt)| AttemptSummary::new(id, attempt))
                .collect(),
        }
    }
}

/// Result of archiving a finished session.
#[derive(Debug, Serialize, ToSchema)]
pub struct EndSessionResponse {
    pub session_id: String,
    pub attempts: usize,
    pub pose_frames_archived: usize,
    #[schema(value_type = Object)]
    pub scoreboard: Scoreboard,
}

/// Identifier of an uploaded attempt clip.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClipUploadResponse {
    pub name: String,
    #[schema(value_type = String)]
    pub file_id: FileId,
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use indexmap::IndexMap;
    use serde_json::json;

    use super::*;

    fn sample_session() -> Session {
        let created_at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let mut attempts = IndexMap::new();
        attempts.insert(
            "a1".to_string(),
            Attempt {
                team: "A".into(),
                player_id: "p1".into(),
                outcome: Outcome::Made,
                created_at,
                resolved_at: Some(created_at + Duration::from_secs(3)),
                pose: vec![json!({"t_ms": 1}), json!({"t_ms": 2})],
            },
        );
        Session {
            id: "g1".into(),
            created_at,
            ended_at: None,
            scoreboard: [("A".to_string(), 1), ("B".to_string(), 0)]
                .into_iter()
                .collect(),
            attempts,
        }
    }

    #[test]
    fn session_document_omits_missing_end_time() {
        let value = serde_json::to_value(SessionDocument::from(&sample_session())).unwrap();
        assert_eq!(value["session_id"], "g1");
        assert_eq!(value["created_at"], "2023-11-14T22:13:20Z");
        assert_eq!(value["scoreboard"], json!({"A": 1, "B": 0}));
        assert_eq!(value["attempts"], 1);
        assert!(value.get("ended_at").is_none());
    }

    #[test]
    fn attempt_summary_reports_outcome_as_made_field() {
        let session = sample_session();
        let value =
            serde_json::to_value(AttemptSummary::new("a1", &session.attempts["a1"])).unwrap();
        assert_eq!(value["made"], "made");
        assert_eq!(value["pose_frames"], 2);
        assert_eq!(value["resolved_at"], "2023-11-14T22:13:23Z");
    }

    #[test]
    fn scoreboard_keeps_team_order() {
        let text = serde_json::to_string(&SessionSummary::from(&sample_session()).scoreboard)
            .unwrap();
        assert_eq!(text, r#"{"A":1,"B":0}"#);
    }

    #[test]
    fn start_request_rejects_invalid_identifier() {
        assert!(StartSessionRequest {
            session_id: "g1".into()
        }
        .validate()
        .is_ok());
        assert!(StartSessionRequest {
            session_id: "a/b".into()
        }
        .validate()
        .is_err());
    }
}
