#![allow(missing_docs)]

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SessionId;

/// Message sent by the session ticker; applied by the timer's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTick {
    pub session_id: SessionId,
}

/// Final values of a session, produced when it ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub table_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(with = "duration_seconds")]
    pub elapsed: Duration,
    pub total_cost: f64,
    pub carambolas: u32,
    pub entry_count: u32,
}

/// Read-only copy of everything a display needs about the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Option<SessionId>,
    pub table_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub elapsed: Duration,
    pub elapsed_display: String,
    pub total_cost: f64,
    pub cost_display: String,
    pub price_per_minute: f64,
    pub carambolas: u32,
    pub entry_count: u32,
}

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(seconds))
    }
}
