//! Active-run snapshot persistence.
//!
//! One JSON document per timer context in the kv table, written on
//! every state-changing operation and deleted when the run ends. The
//! wire format is the long-lived one older data files already use, so
//! field names stay camelCase and durations keep their historical
//! units: `startTimestamp` and `runStartedAt` are epoch milliseconds,
//! `pausedAt` and `totalDuration` are seconds, and the pomodoro config
//! is minutes.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::store::database::Database;
use crate::timer::{PomodoroConfig, PomodoroPhase, RunStatus, TimerContext, TimerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPomodoroConfig {
    pub work_duration: u64,
    pub break_duration: u64,
    pub rounds: u32,
    pub long_break_duration: u64,
}

impl From<PomodoroConfig> for SnapshotPomodoroConfig {
    fn from(config: PomodoroConfig) -> Self {
        Self {
            work_duration: config.work_minutes,
            break_duration: config.break_minutes,
            rounds: config.rounds_before_long_break,
            long_break_duration: config.long_break_minutes,
        }
    }
}

impl From<SnapshotPomodoroConfig> for PomodoroConfig {
    fn from(config: SnapshotPomodoroConfig) -> Self {
        Self {
            work_minutes: config.work_duration,
            break_minutes: config.break_duration,
            rounds_before_long_break: config.rounds,
            long_break_minutes: config.long_break_duration,
        }
    }
}

/// Persisted form of an active run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub active_timer_id: Option<String>,
    pub timer_mode: TimerMode,
    /// Anchor of the current phase, epoch milliseconds. None while paused.
    pub start_timestamp: Option<u64>,
    /// Seconds remaining (countdown/pomodoro) or elapsed (count-up).
    /// Mutually exclusive with `startTimestamp`.
    pub paused_at: Option<u64>,
    /// Current phase length in seconds; 0 for count-up.
    pub total_duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pomodoro_config: Option<SnapshotPomodoroConfig>,
    #[serde(default = "default_round")]
    pub current_pomodoro_round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pomodoro_phase: Option<PomodoroPhase>,
    pub status: RunStatus,
    pub task_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// When the whole run began, epoch milliseconds. Survives phase
    /// re-anchoring so the finishing record can span the full run.
    pub run_started_at: u64,
}

fn default_round() -> u32 {
    1
}

/// Snapshot slot for one timer context.
///
/// Owns the database handle; record inserts and kv traffic for the
/// engine go through the same connection.
pub struct SnapshotStore {
    db: Database,
    key: String,
}

impl SnapshotStore {
    pub fn new(db: Database, context: TimerContext) -> Self {
        Self {
            db,
            key: format!("timer/{context}"),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Load the persisted run, if any.
    ///
    /// A snapshot that fails to decode is treated as no active run; the
    /// engine must never refuse to start because of a corrupt leftover.
    pub fn load(&self) -> Option<TimerSnapshot> {
        let raw = match self.db.kv_get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "snapshot read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "snapshot corrupt, ignoring");
                None
            }
        }
    }

    pub fn save(&self, snapshot: &TimerSnapshot) -> Result<(), CoreError> {
        let json = serde_json::to_string(snapshot)?;
        self.db.kv_set(&self.key, &json)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CoreError> {
        self.db.kv_delete(&self.key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SnapshotStore {
        SnapshotStore::new(Database::open_memory().unwrap(), TimerContext::Focus)
    }

    fn running_snapshot() -> TimerSnapshot {
        TimerSnapshot {
            active_timer_id: Some("task-1".into()),
            timer_mode: TimerMode::Pomodoro,
            start_timestamp: Some(1_700_000_000_000),
            paused_at: None,
            total_duration: 1500,
            pomodoro_config: Some(PomodoroConfig::default().into()),
            current_pomodoro_round: 2,
            pomodoro_phase: Some(PomodoroPhase::Work),
            status: RunStatus::Running,
            task_name: "write report".into(),
            category_id: None,
            run_started_at: 1_699_998_000_000,
        }
    }

    #[test]
    fn round_trips_through_the_kv_table() {
        let store = store();
        assert!(store.load().is_none());

        let snapshot = running_snapshot();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap(), snapshot);

        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn wire_field_names_are_stable() {
        let json = serde_json::to_string(&running_snapshot()).unwrap();
        for field in [
            "\"activeTimerId\"",
            "\"timerMode\":\"pomodoro\"",
            "\"startTimestamp\"",
            "\"pausedAt\"",
            "\"totalDuration\"",
            "\"pomodoroConfig\"",
            "\"workDuration\"",
            "\"breakDuration\"",
            "\"rounds\"",
            "\"longBreakDuration\"",
            "\"currentPomodoroRound\"",
            "\"pomodoroPhase\":\"work\"",
            "\"status\":\"running\"",
            "\"runStartedAt\"",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
    }

    #[test]
    fn corrupt_snapshot_reads_as_no_run() {
        let store = store();
        store.db.kv_set("timer/focus", "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn contexts_do_not_share_slots() {
        let db = Database::open_memory().unwrap();
        let focus = SnapshotStore::new(db, TimerContext::Focus);
        focus.save(&running_snapshot()).unwrap();

        // Same file, different context key.
        assert!(focus.db.kv_get("timer/plan").unwrap().is_none());
        assert!(focus.db.kv_get("timer/focus").unwrap().is_some());
    }
}
