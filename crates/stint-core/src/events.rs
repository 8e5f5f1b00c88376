use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::TimeRecord;
use crate::timer::{PomodoroPhase, RunStatus, TimerMode};

/// Why a run was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// The countdown or pomodoro cycle ran out on its own.
    Completed,
    Stopped,
    Reset,
    /// Completion discovered while restoring a persisted run.
    Recovered,
}

/// Every state change in the engine produces an Event.
/// Callers poll operations for events; the CLI renders them as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    RunStarted {
        task_name: String,
        mode: TimerMode,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    RunPaused {
        remaining_secs: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    RunResumed {
        remaining_secs: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// A pomodoro phase ended, by completion or by skip, and the run
    /// continues in `next_phase`.
    PhaseEnded {
        phase: PomodoroPhase,
        next_phase: PomodoroPhase,
        round: u32,
        skipped: bool,
        at: DateTime<Utc>,
    },
    /// The run is over; the record has already been written.
    RunFinished {
        reason: FinishReason,
        record: TimeRecord,
        at: DateTime<Utc>,
    },
    /// A persisted run was restored into memory, same anchor, no jump.
    RunRecovered {
        status: RunStatus,
        mode: TimerMode,
        remaining_secs: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: RunStatus,
        mode: Option<TimerMode>,
        task_name: Option<String>,
        remaining_secs: u64,
        elapsed_secs: u64,
        pomodoro_phase: Option<PomodoroPhase>,
        pomodoro_round: Option<u32>,
        at: DateTime<Utc>,
    },
}
