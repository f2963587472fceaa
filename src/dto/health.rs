use serde::Serialize;
use utoipa::ToSchema;

/// Reachability of the remote archive as seen by the health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Sessions currently held in memory.
    pub active_sessions: usize,
}

impl HealthResponse {
    pub fn new(archive_reachable: bool, active_sessions: usize) -> Self {
        let status = if archive_reachable {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            active_sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let value = serde_json::to_value(HealthResponse::new(false, 2)).unwrap();
        assert_eq!(value, json!({"status": "degraded", "active_sessions": 2}));
    }
}
