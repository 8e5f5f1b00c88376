use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Countdown,
    CountUp,
    Pomodoro,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Countdown => "countdown",
            TimerMode::CountUp => "countup",
            TimerMode::Pomodoro => "pomodoro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PomodoroPhase {
    Work,
    Break,
    LongBreak,
}

impl PomodoroPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PomodoroPhase::Work => "work",
            PomodoroPhase::Break => "break",
            PomodoroPhase::LongBreak => "longBreak",
        }
    }
}

/// Durations and cycle length for a pomodoro run.
///
/// Captured once at start time; editing settings never changes a run
/// already in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroConfig {
    pub work_minutes: u64,
    pub break_minutes: u64,
    pub rounds_before_long_break: u32,
    pub long_break_minutes: u64,
}

impl PomodoroConfig {
    /// Phase length in seconds. Zero-length phases are clamped to one minute.
    pub fn duration_secs(&self, phase: PomodoroPhase) -> u64 {
        let minutes = match phase {
            PomodoroPhase::Work => self.work_minutes,
            PomodoroPhase::Break => self.break_minutes,
            PomodoroPhase::LongBreak => self.long_break_minutes,
        };
        minutes.max(1).saturating_mul(60)
    }

    pub fn rounds(&self) -> u32 {
        self.rounds_before_long_break.max(1)
    }
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
            rounds_before_long_break: 4,
            long_break_minutes: 15,
        }
    }
}

/// Position within a pomodoro cycle: current phase plus the 1-based
/// round counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroRun {
    pub config: PomodoroConfig,
    pub phase: PomodoroPhase,
    pub round: u32,
}

impl PomodoroRun {
    pub fn new(config: PomodoroConfig) -> Self {
        Self {
            config,
            phase: PomodoroPhase::Work,
            round: 1,
        }
    }

    /// Length of the current phase in seconds.
    pub fn phase_secs(&self) -> u64 {
        self.config.duration_secs(self.phase)
    }

    /// The phase and round that follow the current phase's completion,
    /// or `None` when completing the long break ends the whole run.
    ///
    /// Work leads to Break until the round counter reaches the cycle
    /// length, then to LongBreak with the counter reset to 1. Break
    /// leads back to Work and increments the counter.
    pub fn next(&self) -> Option<(PomodoroPhase, u32)> {
        match self.phase {
            PomodoroPhase::Work => {
                if self.round >= self.config.rounds() {
                    Some((PomodoroPhase::LongBreak, 1))
                } else {
                    Some((PomodoroPhase::Break, self.round))
                }
            }
            PomodoroPhase::Break => Some((PomodoroPhase::Work, self.round + 1)),
            PomodoroPhase::LongBreak => None,
        }
    }
}
