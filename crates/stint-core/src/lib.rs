//! # Stint Core Library
//!
//! This library provides the timer engine behind Stint: count-up,
//! countdown, and pomodoro runs that stay accurate across pauses and
//! process restarts, ring at phase boundaries, and leave one immutable
//! time record per finished run. All operations are available through
//! the standalone CLI binary; any GUI is a thin layer over the same
//! core library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine that requires
//!   the caller to periodically invoke `tick()` for progress updates.
//!   Remaining time is derived from an anchor timestamp, never counted
//!   down, so delayed ticks self-correct.
//! - **Storage**: SQLite-based record storage with a key-value table
//!   for the active-run snapshot, and TOML-based configuration
//! - **Alarm**: Audible device behind a trait, with an unlock gate and
//!   looping playback that auto-stops
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine, one per [`TimerContext`]
//! - [`Database`]: Record and statistics persistence
//! - [`Config`]: Application configuration management
//! - [`Clock`]: Injectable wall-clock source

pub mod alarm;
pub mod clock;
pub mod error;
pub mod events;
pub mod format;
pub mod record;
pub mod store;
pub mod timer;

pub use alarm::{AlarmDevice, ChimeAlarm, NullAlarm};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StoreError};
pub use events::{Event, FinishReason};
pub use format::format_clock;
pub use record::{RecordSource, TimeRecord};
pub use store::{Config, Database, RecordStats, SnapshotStore, TimerSnapshot};
pub use timer::{
    AlarmPolicy, PomodoroConfig, PomodoroPhase, RunSpec, RunStatus, TimerContext, TimerEngine,
    TimerMode,
};
