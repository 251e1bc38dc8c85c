use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Processing,
    Error,
}

impl WorkerState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Processing => "processing",
            WorkerState::Error => "error",
        }
    }
}

impl std::str::FromStr for WorkerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(WorkerState::Idle),
            "processing" => Ok(WorkerState::Processing),
            "error" => Ok(WorkerState::Error),
            other => Err(format!("unknown worker state '{other}'")),
        }
    }
}

/// Last reported liveness of a collection worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHeartbeat {
    pub worker_id: String,
    pub state: WorkerState,
    pub active_task_id: Option<Uuid>,
    pub last_heartbeat_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl WorkerHeartbeat {
    /// Healthy when the heartbeat is younger than `freshness` and the worker
    /// is not in the error state. A paused worker is indistinguishable from a
    /// dead one.
    #[must_use]
    pub fn is_healthy(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        self.state != WorkerState::Error && now - self.last_heartbeat_at < freshness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat(state: WorkerState, age_secs: i64, now: DateTime<Utc>) -> WorkerHeartbeat {
        WorkerHeartbeat {
            worker_id: "w1".into(),
            state,
            active_task_id: None,
            last_heartbeat_at: now - Duration::seconds(age_secs),
            last_error: None,
        }
    }

    #[test]
    fn fresh_idle_worker_is_healthy() {
        let now = Utc::now();
        assert!(beat(WorkerState::Idle, 5, now).is_healthy(now, Duration::seconds(60)));
    }

    #[test]
    fn stale_worker_is_unhealthy() {
        let now = Utc::now();
        assert!(!beat(WorkerState::Processing, 61, now).is_healthy(now, Duration::seconds(60)));
    }

    #[test]
    fn error_state_is_unhealthy_even_when_fresh() {
        let now = Utc::now();
        assert!(!beat(WorkerState::Error, 0, now).is_healthy(now, Duration::seconds(60)));
    }
}
