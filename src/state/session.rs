use std::time::SystemTime;

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

/// Per-team count of made attempts, in team declaration order.
pub type Scoreboard = IndexMap<String, u32>;

/// Result of a free throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Unknown,
    Made,
    Miss,
}

impl Outcome {
    /// Whether the attempt has already been resolved.
    pub fn is_resolved(self) -> bool {
        !matches!(self, Outcome::Unknown)
    }
}

/// One shot taken during a session.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Team label the shooter belongs to.
    pub team: String,
    /// Identifier of the shooter.
    pub player_id: String,
    /// Current outcome; `Unknown` until resolved.
    pub outcome: Outcome,
    pub created_at: SystemTime,
    pub resolved_at: Option<SystemTime>,
    /// Pose samples in arrival order.
    pub pose: Vec<Value>,
}

/// In-memory record of a practice or game session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: SystemTime,
    pub ended_at: Option<SystemTime>,
    pub scoreboard: Scoreboard,
    /// Attempts keyed by identifier, in creation order.
    pub attempts: IndexMap<String, Attempt>,
}

impl Session {
    fn new(id: String, teams: &[String]) -> Self {
        Self {
            id,
            created_at: SystemTime::now(),
            ended_at: None,
            scoreboard: teams.iter().map(|team| (team.clone(), 0)).collect(),
            attempts: IndexMap::new(),
        }
    }
}

/// Snapshot returned after an attempt has been resolved.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub team: String,
    pub outcome: Outcome,
    pub scoreboard: Scoreboard,
}

/// Failures raised by [`SessionStore`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session `{0}` not found")]
    UnknownSession(String),
    #[error("attempt `{attempt_id}` not found in session `{session_id}`")]
    UnknownAttempt {
        session_id: String,
        attempt_id: String,
    },
    #[error("attempt `{0}` already exists")]
    DuplicateAttempt(String),
    #[error("attempt `{attempt_id}` already resolved as {outcome:?}")]
    AlreadyResolved { attempt_id: String, outcome: Outcome },
    #[error("an attempt can only be resolved as made or miss")]
    InvalidOutcome,
}

/// Process-wide registry of sessions keyed by identifier.
///
/// Each session lives in its own map entry, so mutations on one session are
/// serialized while different sessions proceed independently.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    teams: Vec<String>,
}

impl SessionStore {
    /// Create an empty store whose new scoreboards are seeded with `teams`.
    pub fn new(teams: Vec<String>) -> Self {
        Self {
            sessions: DashMap::new(),
            teams,
        }
    }

    /// Create a fresh session, discarding any previous record with the same identifier.
    pub fn start_session(&self, id: &str) -> Session {
        let session = Session::new(id.to_string(), &self.teams);
        self.sessions.insert(id.to_string(), session.clone());
        session
    }

    /// Snapshot of the session, if it exists.
    pub fn get_session(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Snapshot of a single attempt.
    pub fn attempt(&self, session_id: &str, attempt_id: &str) -> Result<Attempt, SessionError> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        session
            .attempts
            .get(attempt_id)
            .cloned()
            .ok_or_else(|| unknown_attempt(session_id, attempt_id))
    }

    /// Register a new unresolved attempt with an empty pose sequence.
    pub fn new_attempt(
        &self,
        session_id: &str,
        attempt_id: &str,
        team: &str,
        player_id: &str,
    ) -> Result<Attempt, SessionError> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;

        if session.attempts.contains_key(attempt_id) {
            return Err(SessionError::DuplicateAttempt(attempt_id.to_string()));
        }

        let attempt = Attempt {
            team: team.to_string(),
            player_id: player_id.to_string(),
            outcome: Outcome::Unknown,
            created_at: SystemTime::now(),
            resolved_at: None,
            pose: Vec::new(),
        };
        session
            .attempts
            .insert(attempt_id.to_string(), attempt.clone());
        Ok(attempt)
    }

    /// Drop an attempt that could not be announced to its client.
    ///
    /// Returns whether the attempt existed.
    pub fn discard_attempt(&self, session_id: &str, attempt_id: &str) -> bool {
        self.sessions
            .get_mut(session_id)
            .is_some_and(|mut session| session.attempts.shift_remove(attempt_id).is_some())
    }

    /// Append one pose sample and return the new length of the sequence.
    pub fn append_pose(
        &self,
        session_id: &str,
        attempt_id: &str,
        pose: Value,
    ) -> Result<usize, SessionError> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        let attempt = session
            .attempts
            .get_mut(attempt_id)
            .ok_or_else(|| unknown_attempt(session_id, attempt_id))?;
        attempt.pose.push(pose);
        Ok(attempt.pose.len())
    }

    /// Record the outcome of an attempt, crediting the team when it was made.
    ///
    /// An attempt resolves exactly once; later resolutions are rejected and leave
    /// both the attempt and the scoreboard untouched.
    pub fn resolve_attempt(
        &self,
        session_id: &str,
        attempt_id: &str,
        outcome: Outcome,
    ) -> Result<Resolution, SessionError> {
        if !outcome.is_resolved() {
            return Err(SessionError::InvalidOutcome);
        }

        let mut guard = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
        let session = &mut *guard;
        let attempt = session
            .attempts
            .get_mut(attempt_id)
            .ok_or_else(|| unknown_attempt(session_id, attempt_id))?;

        if attempt.outcome.is_resolved() {
            return Err(SessionError::AlreadyResolved {
                attempt_id: attempt_id.to_string(),
                outcome: attempt.outcome,
            });
        }

        attempt.outcome = outcome;
        attempt.resolved_at = Some(SystemTime::now());
        if outcome == Outcome::Made {
            *session.scoreboard.entry(attempt.team.clone()).or_insert(0) += 1;
        }

        Ok(Resolution {
            team: attempt.team.clone(),
            outcome,
            scoreboard: session.scoreboard.clone(),
        })
    }

    /// Stamp the end of a session and return its final snapshot.
    pub fn end_session(&self, id: &str) -> Result<Session, SessionError> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        session.ended_at = Some(SystemTime::now());
        Ok(session.clone())
    }

    /// Number of sessions currently tracked.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session has been started yet.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn unknown_attempt(session_id: &str, attempt_id: &str) -> SessionError {
    SessionError::UnknownAttempt {
        session_id: session_id.to_string(),
        attempt_id: attempt_id.to_string(),
    }
}
