//! Immutable time records.
//!
//! A record captures one finished run: stop, reset, or natural
//! completion. A pomodoro run produces a single record spanning the
//! whole cycle, never one per phase. Records are append-only; edits and
//! deletion belong to review tooling, not the engine.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Timer,
    Manual,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Timer => "timer",
            RecordSource::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRecord {
    pub id: Uuid,
    pub task_name: String,
    /// Calendar day the run started, in local time.
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub category_id: Option<String>,
    pub source: RecordSource,
}

impl TimeRecord {
    pub fn new(
        task_name: impl Into<String>,
        category_id: Option<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        source: RecordSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_name: task_name.into(),
            date: started_at.with_timezone(&Local).date_naive(),
            started_at,
            ended_at,
            category_id,
            source,
        }
    }

    /// Start time on a local clock face.
    pub fn start_clock(&self) -> String {
        self.started_at
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string()
    }

    /// End time on a local clock face.
    pub fn end_clock(&self) -> String {
        self.ended_at
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string()
    }

    pub fn duration_secs(&self) -> u64 {
        (self.ended_at - self.started_at).num_seconds().max(0) as u64
    }

    pub fn duration_minutes(&self) -> u64 {
        self.duration_secs() / 60
    }
}
