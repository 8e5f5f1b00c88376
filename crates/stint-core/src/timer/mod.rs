mod engine;
mod mode;
mod phase;

pub use engine::{AlarmPolicy, RunSpec, RunStatus, TimerEngine};
pub use mode::{PomodoroConfig, PomodoroPhase, PomodoroRun, TimerMode};
pub use phase::{compute_phase, PhaseTiming};

use serde::{Deserialize, Serialize};

/// Which timer surface an engine instance belongs to. Each context
/// keeps its own persisted snapshot; runs in different contexts never
/// see each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerContext {
    Focus,
    Plan,
}

impl TimerContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerContext::Focus => "focus",
            TimerContext::Plan => "plan",
        }
    }
}

impl std::fmt::Display for TimerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
