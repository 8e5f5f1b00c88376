//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically. Elapsed and remaining time are re-derived from the
//! anchor timestamp on every tick, so a late, missed, or duplicated tick
//! can never accumulate drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Idle
//! ```
//!
//! Every state-changing operation writes the active run through to the
//! snapshot store; finishing a run deletes the snapshot and emits an
//! immutable time record. A crashed process picks the run back up via
//! [`TimerEngine::recover`].
//!
//! ## Usage
//!
//! ```ignore
//! let store = SnapshotStore::new(Database::open()?, TimerContext::Focus);
//! let mut engine = TimerEngine::new(TimerContext::Focus, store);
//! engine.recover();
//! engine.start(None, "deep work", None, RunSpec::Countdown { minutes: 25 });
//! // In a loop:
//! engine.tick(); // Returns Some(Event) at phase boundaries
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmDevice, ChimeAlarm};
use crate::clock::{Clock, SystemClock};
use crate::events::{Event, FinishReason};
use crate::record::{RecordSource, TimeRecord};
use crate::store::snapshot::{SnapshotStore, TimerSnapshot};
use crate::timer::mode::{PomodoroConfig, PomodoroPhase, PomodoroRun, TimerMode};
use crate::timer::phase::{compute_phase, PhaseTiming};
use crate::timer::TimerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
        }
    }
}

/// What a new run should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSpec {
    Countdown { minutes: u64 },
    CountUp,
    Pomodoro(PomodoroConfig),
}

impl RunSpec {
    pub fn mode(&self) -> TimerMode {
        match self {
            RunSpec::Countdown { .. } => TimerMode::Countdown,
            RunSpec::CountUp => TimerMode::CountUp,
            RunSpec::Pomodoro(_) => TimerMode::Pomodoro,
        }
    }
}

/// How the engine rings at phase boundaries.
#[derive(Debug, Clone, Copy)]
pub struct AlarmPolicy {
    /// Ring length before the device's auto-stop, in milliseconds.
    pub ring_ms: u64,
    /// Whether a user-initiated skip rings like a natural completion.
    /// A skip that ends the whole run always rings.
    pub ring_on_skip: bool,
}

impl Default for AlarmPolicy {
    fn default() -> Self {
        Self {
            ring_ms: 10_000,
            ring_on_skip: false,
        }
    }
}

/// Live state of an active run. `None` on the engine means Idle.
#[derive(Debug, Clone)]
struct RunState {
    /// Running or Paused; Idle is represented by the absence of a run.
    status: RunStatus,
    mode: TimerMode,
    task_id: Option<String>,
    task_name: String,
    category_id: Option<String>,
    /// Wall-clock anchor of the current phase, epoch ms. Set iff Running.
    anchor_ms: Option<u64>,
    /// Frozen seconds at pause time: remaining for countdown/pomodoro,
    /// elapsed for count-up. Set iff Paused.
    paused_secs: Option<u64>,
    /// Current phase length in seconds; 0 for count-up.
    total_secs: u64,
    /// When the whole run began, epoch ms. Phase transitions re-anchor
    /// `anchor_ms` but never this.
    run_started_ms: u64,
    pomodoro: Option<PomodoroRun>,
}

/// Core timer engine.
///
/// Operates on wall-clock anchors -- no internal thread. The caller is
/// responsible for calling `tick()` periodically. One engine instance
/// per [`TimerContext`]; each holds at most one active run.
pub struct TimerEngine {
    context: TimerContext,
    store: SnapshotStore,
    clock: Box<dyn Clock>,
    alarm: Box<dyn AlarmDevice>,
    policy: AlarmPolicy,
    run: Option<RunState>,
}

impl TimerEngine {
    /// Create an idle engine over the given snapshot store.
    ///
    /// Uses the system clock and the terminal chime; swap either with
    /// [`with_clock`](Self::with_clock) / [`with_alarm`](Self::with_alarm).
    pub fn new(context: TimerContext, store: SnapshotStore) -> Self {
        Self {
            context,
            store,
            clock: Box::new(SystemClock),
            alarm: Box::new(ChimeAlarm::new()),
            policy: AlarmPolicy::default(),
            run: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_alarm(mut self, alarm: impl AlarmDevice + 'static) -> Self {
        self.alarm = Box::new(alarm);
        self
    }

    pub fn with_policy(mut self, policy: AlarmPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn context(&self) -> TimerContext {
        self.context
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn status(&self) -> RunStatus {
        self.run.as_ref().map(|r| r.status).unwrap_or(RunStatus::Idle)
    }

    pub fn mode(&self) -> Option<TimerMode> {
        self.run.as_ref().map(|r| r.mode)
    }

    pub fn task_name(&self) -> Option<&str> {
        self.run.as_ref().map(|r| r.task_name.as_str())
    }

    pub fn pomodoro_phase(&self) -> Option<PomodoroPhase> {
        self.run.as_ref().and_then(|r| r.pomodoro).map(|p| p.phase)
    }

    pub fn pomodoro_round(&self) -> Option<u32> {
        self.run.as_ref().and_then(|r| r.pomodoro).map(|p| p.round)
    }

    /// Seconds left in the current phase, derived from the anchor.
    /// Zero when idle and always zero for count-up.
    pub fn remaining_secs(&self) -> u64 {
        self.run
            .as_ref()
            .map(|run| self.run_timing(run).remaining_secs)
            .unwrap_or(0)
    }

    /// Seconds elapsed in the current phase, derived from the anchor.
    pub fn elapsed_secs(&self) -> u64 {
        self.run
            .as_ref()
            .map(|run| self.run_timing(run).elapsed_secs)
            .unwrap_or(0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot_event(&self) -> Event {
        let timing = self
            .run
            .as_ref()
            .map(|run| self.run_timing(run))
            .unwrap_or(PhaseTiming {
                elapsed_secs: 0,
                remaining_secs: 0,
                is_complete: false,
            });
        Event::StateSnapshot {
            status: self.status(),
            mode: self.mode(),
            task_name: self.run.as_ref().map(|r| r.task_name.clone()),
            remaining_secs: timing.remaining_secs,
            elapsed_secs: timing.elapsed_secs,
            pomodoro_phase: self.pomodoro_phase(),
            pomodoro_round: self.pomodoro_round(),
            at: self.clock.now(),
        }
    }

    /// Arm the alarm device. The surrounding app calls this once on its
    /// first user interaction; ringing before that is refused by the
    /// device.
    pub fn unlock_alarm(&self) {
        self.alarm.unlock();
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a run. Requires Idle; starting over an active run is a
    /// no-op and the caller must stop it first.
    pub fn start(
        &mut self,
        task_id: Option<String>,
        task_name: &str,
        category_id: Option<String>,
        spec: RunSpec,
    ) -> Option<Event> {
        if self.run.is_some() {
            tracing::debug!(context = %self.context, "start ignored, run already active");
            return None;
        }

        let (total_secs, pomodoro) = match spec {
            RunSpec::Countdown { minutes } => {
                if minutes == 0 {
                    return None;
                }
                (minutes.saturating_mul(60), None)
            }
            RunSpec::CountUp => (0, None),
            RunSpec::Pomodoro(config) => {
                let run = PomodoroRun::new(config);
                (run.phase_secs(), Some(run))
            }
        };

        let now = self.clock.now_ms();
        let mode = spec.mode();
        self.run = Some(RunState {
            status: RunStatus::Running,
            mode,
            task_id,
            task_name: task_name.to_string(),
            category_id,
            anchor_ms: Some(now),
            paused_secs: None,
            total_secs,
            run_started_ms: now,
            pomodoro,
        });
        self.persist();

        tracing::debug!(context = %self.context, mode = mode.as_str(), total_secs, "run started");
        Some(Event::RunStarted {
            task_name: task_name.to_string(),
            mode,
            total_secs,
            at: self.clock.now(),
        })
    }

    /// Freeze the current phase. Requires Running.
    pub fn pause(&mut self) -> Option<Event> {
        let now_ms = self.clock.now_ms();
        let run = self.run.as_mut()?;
        if run.status != RunStatus::Running {
            return None;
        }

        let timing = timing_of(run, now_ms);
        run.status = RunStatus::Paused;
        run.anchor_ms = None;
        run.paused_secs = Some(match run.mode {
            TimerMode::CountUp => timing.elapsed_secs,
            TimerMode::Countdown | TimerMode::Pomodoro => timing.remaining_secs,
        });
        self.persist();

        Some(Event::RunPaused {
            remaining_secs: timing.remaining_secs,
            elapsed_secs: timing.elapsed_secs,
            at: self.clock.now(),
        })
    }

    /// Thaw a paused run by computing a fresh anchor, so time spent
    /// paused never counts against the phase. Requires Paused.
    pub fn resume(&mut self) -> Option<Event> {
        let now_ms = self.clock.now_ms();
        let run = self.run.as_mut()?;
        if run.status != RunStatus::Paused {
            return None;
        }

        let elapsed_secs = match run.mode {
            TimerMode::CountUp => run.paused_secs.unwrap_or(0),
            TimerMode::Countdown | TimerMode::Pomodoro => {
                run.total_secs.saturating_sub(run.paused_secs.unwrap_or(0))
            }
        };
        run.status = RunStatus::Running;
        run.anchor_ms = Some(now_ms.saturating_sub(elapsed_secs.saturating_mul(1000)));
        run.paused_secs = None;
        let timing = timing_of(run, now_ms);
        self.persist();

        Some(Event::RunResumed {
            remaining_secs: timing.remaining_secs,
            elapsed_secs: timing.elapsed_secs,
            at: self.clock.now(),
        })
    }

    /// End the run deliberately and record it. Requires Running or Paused.
    pub fn stop(&mut self) -> Option<Event> {
        self.alarm.stop();
        let end_ms = self.clock.now_ms();
        self.finalize(FinishReason::Stopped, end_ms)
    }

    /// Same finalization as [`stop`](Self::stop); kept separate so
    /// callers can express intent and readers of the event log can tell
    /// the two apart.
    pub fn reset(&mut self) -> Option<Event> {
        self.alarm.stop();
        let end_ms = self.clock.now_ms();
        self.finalize(FinishReason::Reset, end_ms)
    }

    /// Force the pomodoro phase transition without waiting for the
    /// clock. Pomodoro only; accepted while Running or Paused, and the
    /// run continues Running in the next phase.
    pub fn skip_phase(&mut self) -> Option<Event> {
        let now_ms = self.clock.now_ms();
        let run = self.run.as_mut()?;
        if run.mode != TimerMode::Pomodoro {
            return None;
        }
        let pomodoro = run.pomodoro?;

        match pomodoro.next() {
            Some((next_phase, round)) => {
                if self.policy.ring_on_skip {
                    self.alarm.play(self.policy.ring_ms);
                }
                let from = pomodoro.phase;
                let run = self.run.as_mut()?;
                run.pomodoro = Some(PomodoroRun {
                    config: pomodoro.config,
                    phase: next_phase,
                    round,
                });
                run.total_secs = pomodoro.config.duration_secs(next_phase);
                run.status = RunStatus::Running;
                run.anchor_ms = Some(now_ms);
                run.paused_secs = None;
                self.persist();

                Some(Event::PhaseEnded {
                    phase: from,
                    next_phase,
                    round,
                    skipped: true,
                    at: self.clock.now(),
                })
            }
            None => {
                // Skipping the long break ends the cycle; that always rings.
                self.alarm.play(self.policy.ring_ms);
                self.finalize(FinishReason::Completed, now_ms)
            }
        }
    }

    /// Call periodically while a run is active. Detects phase
    /// completion, rings, applies the pomodoro transition, finalizes
    /// finished runs. A tick that changes nothing persists nothing:
    /// remaining time is derived, not stored.
    pub fn tick(&mut self) -> Option<Event> {
        let now_ms = self.clock.now_ms();
        let run = self.run.as_mut()?;
        if run.status != RunStatus::Running {
            return None;
        }

        let timing = timing_of(run, now_ms);
        if !timing.is_complete {
            return None;
        }

        // The phase actually ended at its boundary, not when we noticed.
        let boundary_ms = run
            .anchor_ms
            .unwrap_or(now_ms)
            .saturating_add(run.total_secs.saturating_mul(1000));

        match run.mode {
            TimerMode::Countdown => {
                self.alarm.play(self.policy.ring_ms);
                self.finalize(FinishReason::Completed, boundary_ms)
            }
            TimerMode::Pomodoro => {
                let pomodoro = run.pomodoro?;
                match pomodoro.next() {
                    Some((next_phase, round)) => {
                        self.alarm.play(self.policy.ring_ms);
                        let run = self.run.as_mut()?;
                        run.pomodoro = Some(PomodoroRun {
                            config: pomodoro.config,
                            phase: next_phase,
                            round,
                        });
                        run.total_secs = pomodoro.config.duration_secs(next_phase);
                        run.anchor_ms = Some(now_ms);
                        self.persist();

                        tracing::debug!(
                            context = %self.context,
                            from = pomodoro.phase.as_str(),
                            to = next_phase.as_str(),
                            round,
                            "pomodoro phase ended"
                        );
                        Some(Event::PhaseEnded {
                            phase: pomodoro.phase,
                            next_phase,
                            round,
                            skipped: false,
                            at: self.clock.now(),
                        })
                    }
                    None => {
                        self.alarm.play(self.policy.ring_ms);
                        self.finalize(FinishReason::Completed, boundary_ms)
                    }
                }
            }
            // Count-up never completes on its own.
            TimerMode::CountUp => None,
        }
    }

    /// Restore a persisted run after process restart. Call once on an
    /// idle engine; anything else is a no-op.
    ///
    /// A run whose phase already finished while the process was away is
    /// finalized exactly as a natural completion would have been: ring,
    /// record, snapshot deleted. Otherwise the run resumes with its
    /// original anchor so ticking continues with no visible jump.
    pub fn recover(&mut self) -> Option<Event> {
        if self.run.is_some() {
            return None;
        }
        let snapshot = self.store.load()?;

        let restored = match restore_run(&snapshot) {
            Some(run) => run,
            None => {
                // Idle or unusable leftovers have no run to restore.
                if let Err(e) = self.store.clear() {
                    tracing::warn!(context = %self.context, error = %e, "failed to clear stale snapshot");
                }
                return None;
            }
        };

        if restored.status == RunStatus::Running {
            let now_ms = self.clock.now_ms();
            let timing = timing_of(&restored, now_ms);
            if timing.is_complete {
                let boundary_ms = restored
                    .anchor_ms
                    .unwrap_or(now_ms)
                    .saturating_add(restored.total_secs.saturating_mul(1000));
                self.alarm.play(self.policy.ring_ms);
                self.run = Some(restored);
                return self.finalize(FinishReason::Recovered, boundary_ms);
            }
        }

        let timing = self.run_timing(&restored);
        let event = Event::RunRecovered {
            status: restored.status,
            mode: restored.mode,
            remaining_secs: timing.remaining_secs,
            elapsed_secs: timing.elapsed_secs,
            at: self.clock.now(),
        };
        tracing::debug!(context = %self.context, status = ?restored.status, "run recovered");
        self.run = Some(restored);
        Some(event)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Derived timing for a run in any status.
    fn run_timing(&self, run: &RunState) -> PhaseTiming {
        timing_of(run, self.clock.now_ms())
    }

    /// End the run: emit the record, drop the snapshot, go Idle.
    fn finalize(&mut self, reason: FinishReason, end_ms: u64) -> Option<Event> {
        let run = self.run.take()?;

        let record = TimeRecord::new(
            run.task_name,
            run.category_id,
            ms_to_datetime(run.run_started_ms),
            ms_to_datetime(end_ms),
            RecordSource::Timer,
        );
        if let Err(e) = self.store.database().insert_record(&record) {
            tracing::warn!(context = %self.context, error = %e, "failed to write time record");
        }
        if let Err(e) = self.store.clear() {
            tracing::warn!(context = %self.context, error = %e, "failed to clear snapshot");
        }

        tracing::debug!(context = %self.context, reason = ?reason, "run finished");
        Some(Event::RunFinished {
            reason,
            record,
            at: self.clock.now(),
        })
    }

    /// Write the active run through to the store. Failure is logged and
    /// swallowed; in-memory state stays authoritative either way.
    fn persist(&self) {
        let Some(run) = self.run.as_ref() else {
            return;
        };
        let snapshot = TimerSnapshot {
            active_timer_id: run.task_id.clone(),
            timer_mode: run.mode,
            start_timestamp: run.anchor_ms,
            paused_at: run.paused_secs,
            total_duration: run.total_secs,
            pomodoro_config: run.pomodoro.map(|p| p.config.into()),
            current_pomodoro_round: run.pomodoro.map(|p| p.round).unwrap_or(1),
            pomodoro_phase: run.pomodoro.map(|p| p.phase),
            status: run.status,
            task_name: run.task_name.clone(),
            category_id: run.category_id.clone(),
            run_started_at: run.run_started_ms,
        };
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!(context = %self.context, error = %e, "failed to persist snapshot");
        }
    }
}

/// Timing for a run at `now_ms`, whatever its status.
fn timing_of(run: &RunState, now_ms: u64) -> PhaseTiming {
    match run.status {
        RunStatus::Running => {
            let anchor = run.anchor_ms.unwrap_or(now_ms);
            compute_phase(anchor, run.total_secs, run.mode, now_ms)
        }
        RunStatus::Paused | RunStatus::Idle => {
            let frozen = run.paused_secs.unwrap_or(0);
            match run.mode {
                TimerMode::CountUp => PhaseTiming {
                    elapsed_secs: frozen,
                    remaining_secs: 0,
                    is_complete: false,
                },
                TimerMode::Countdown | TimerMode::Pomodoro => PhaseTiming {
                    elapsed_secs: run.total_secs.saturating_sub(frozen),
                    remaining_secs: frozen,
                    is_complete: false,
                },
            }
        }
    }
}

/// Rebuild live state from a snapshot. `None` for snapshots that do not
/// describe a restorable run (idle status, or a running run with no
/// anchor).
fn restore_run(snapshot: &TimerSnapshot) -> Option<RunState> {
    let status = match snapshot.status {
        RunStatus::Idle => return None,
        status => status,
    };
    if status == RunStatus::Running && snapshot.start_timestamp.is_none() {
        tracing::warn!("running snapshot without an anchor, discarding");
        return None;
    }

    let pomodoro = match snapshot.timer_mode {
        TimerMode::Pomodoro => {
            let config: PomodoroConfig = snapshot
                .pomodoro_config
                .map(Into::into)
                .unwrap_or_default();
            Some(PomodoroRun {
                config,
                phase: snapshot.pomodoro_phase.unwrap_or(PomodoroPhase::Work),
                round: snapshot.current_pomodoro_round,
            })
        }
        _ => None,
    };

    Some(RunState {
        status,
        mode: snapshot.timer_mode,
        task_id: snapshot.active_timer_id.clone(),
        task_name: snapshot.task_name.clone(),
        category_id: snapshot.category_id.clone(),
        anchor_ms: snapshot.start_timestamp,
        paused_secs: snapshot.paused_at,
        total_secs: snapshot.total_duration,
        run_started_ms: snapshot.run_started_at,
        pomodoro,
    })
}

fn ms_to_datetime(ms: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms as i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::database::Database;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingAlarm {
        plays: Arc<Mutex<Vec<u64>>>,
        playing: Arc<AtomicBool>,
    }

    impl RecordingAlarm {
        fn play_count(&self) -> usize {
            self.plays.lock().unwrap().len()
        }
    }

    impl AlarmDevice for RecordingAlarm {
        fn unlock(&self) {}
        fn play(&self, duration_ms: u64) {
            self.plays.lock().unwrap().push(duration_ms);
            self.playing.store(true, Ordering::SeqCst);
        }
        fn stop(&self) {
            self.playing.store(false, Ordering::SeqCst);
        }
        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    const T0: u64 = 1_700_000_000_000;

    fn engine_at(ms: u64) -> (TimerEngine, ManualClock, RecordingAlarm) {
        let clock = ManualClock::at_ms(ms);
        let alarm = RecordingAlarm::default();
        let store = SnapshotStore::new(Database::open_memory().unwrap(), TimerContext::Focus);
        let engine = TimerEngine::new(TimerContext::Focus, store)
            .with_clock(clock.clone())
            .with_alarm(alarm.clone());
        (engine, clock, alarm)
    }

    #[test]
    fn countdown_runs_to_completion() {
        let (mut engine, clock, alarm) = engine_at(T0);

        let started = engine.start(None, "deep work", None, RunSpec::Countdown { minutes: 25 });
        assert!(matches!(started, Some(Event::RunStarted { total_secs: 1500, .. })));
        assert_eq!(engine.status(), RunStatus::Running);

        clock.advance_secs(600);
        assert!(engine.tick().is_none());
        assert_eq!(engine.remaining_secs(), 900);
        assert_eq!(engine.elapsed_secs(), 600);

        clock.advance_secs(900);
        let finished = engine.tick();
        let Some(Event::RunFinished { reason, record, .. }) = finished else {
            panic!("expected RunFinished, got {finished:?}");
        };
        assert_eq!(reason, FinishReason::Completed);
        assert_eq!(record.duration_secs(), 1500);
        assert_eq!(record.task_name, "deep work");
        assert_eq!(alarm.play_count(), 1);

        assert_eq!(engine.status(), RunStatus::Idle);
        assert!(engine.store().load().is_none());
        let saved = engine.store().database().recent_records(10).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, record.id);
    }

    #[test]
    fn late_tick_still_records_the_boundary() {
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "focus", None, RunSpec::Countdown { minutes: 25 });

        // Noticed 83 seconds after the countdown actually ran out.
        clock.advance_secs(1583);
        let Some(Event::RunFinished { record, .. }) = engine.tick() else {
            panic!("expected RunFinished");
        };
        assert_eq!(record.duration_secs(), 1500);
    }

    #[test]
    fn start_is_rejected_while_a_run_is_active() {
        let (mut engine, _clock, _alarm) = engine_at(T0);
        assert!(engine.start(None, "one", None, RunSpec::CountUp).is_some());
        assert!(engine.start(None, "two", None, RunSpec::CountUp).is_none());
        assert_eq!(engine.task_name(), Some("one"));
    }

    #[test]
    fn zero_minute_countdown_is_rejected() {
        let (mut engine, _clock, _alarm) = engine_at(T0);
        assert!(engine
            .start(None, "zero", None, RunSpec::Countdown { minutes: 0 })
            .is_none());
        assert_eq!(engine.status(), RunStatus::Idle);
    }

    #[test]
    fn pause_excludes_paused_time_from_the_phase() {
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "focus", None, RunSpec::Countdown { minutes: 25 });

        clock.advance_secs(600);
        let paused = engine.pause();
        assert!(matches!(paused, Some(Event::RunPaused { remaining_secs: 900, .. })));
        assert_eq!(engine.status(), RunStatus::Paused);

        // A very long lunch.
        clock.advance_secs(10_000);
        assert_eq!(engine.remaining_secs(), 900);
        assert!(engine.tick().is_none());

        let resumed = engine.resume();
        assert!(matches!(resumed, Some(Event::RunResumed { remaining_secs: 900, .. })));

        clock.advance_secs(899);
        assert!(engine.tick().is_none());
        assert_eq!(engine.remaining_secs(), 1);

        clock.advance_secs(1);
        assert!(matches!(engine.tick(), Some(Event::RunFinished { .. })));
    }

    #[test]
    fn invalid_transitions_are_noops() {
        let (mut engine, _clock, _alarm) = engine_at(T0);

        assert!(engine.pause().is_none());
        assert!(engine.resume().is_none());
        assert!(engine.stop().is_none());
        assert!(engine.skip_phase().is_none());
        assert!(engine.tick().is_none());

        engine.start(None, "focus", None, RunSpec::Countdown { minutes: 25 });
        assert!(engine.resume().is_none()); // running, not paused
        engine.pause();
        assert!(engine.pause().is_none()); // already paused
        assert!(engine.skip_phase().is_none()); // not a pomodoro
    }

    #[test]
    fn countup_counts_until_stopped() {
        let (mut engine, clock, alarm) = engine_at(T0);
        engine.start(None, "open end", None, RunSpec::CountUp);

        clock.advance_secs(3661);
        assert!(engine.tick().is_none());
        assert_eq!(engine.elapsed_secs(), 3661);
        assert_eq!(engine.remaining_secs(), 0);

        let Some(Event::RunFinished { reason, record, .. }) = engine.stop() else {
            panic!("expected RunFinished");
        };
        assert_eq!(reason, FinishReason::Stopped);
        assert_eq!(record.duration_secs(), 3661);
        assert_eq!(alarm.play_count(), 0);
        assert!(engine.store().load().is_none());
    }

    #[test]
    fn countup_pause_freezes_elapsed() {
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "open end", None, RunSpec::CountUp);

        clock.advance_secs(120);
        engine.pause();
        clock.advance_secs(500);
        assert_eq!(engine.elapsed_secs(), 120);

        engine.resume();
        clock.advance_secs(30);
        assert_eq!(engine.elapsed_secs(), 150);
    }

    #[test]
    fn pomodoro_cycles_into_the_long_break() {
        let config = PomodoroConfig {
            work_minutes: 25,
            break_minutes: 5,
            rounds_before_long_break: 2,
            long_break_minutes: 15,
        };
        let (mut engine, clock, alarm) = engine_at(T0);
        engine.start(None, "study", None, RunSpec::Pomodoro(config));
        assert_eq!(engine.pomodoro_phase(), Some(PomodoroPhase::Work));
        assert_eq!(engine.pomodoro_round(), Some(1));

        clock.advance_secs(1500);
        let ended = engine.tick();
        assert!(matches!(
            ended,
            Some(Event::PhaseEnded {
                phase: PomodoroPhase::Work,
                next_phase: PomodoroPhase::Break,
                round: 1,
                skipped: false,
                ..
            })
        ));
        assert_eq!(engine.remaining_secs(), 300);

        clock.advance_secs(300);
        assert!(matches!(
            engine.tick(),
            Some(Event::PhaseEnded {
                next_phase: PomodoroPhase::Work,
                round: 2,
                ..
            })
        ));

        // Round two of two: the next boundary is the long break, not a
        // plain break.
        clock.advance_secs(1500);
        let ended = engine.tick();
        assert!(matches!(
            ended,
            Some(Event::PhaseEnded {
                phase: PomodoroPhase::Work,
                next_phase: PomodoroPhase::LongBreak,
                round: 1,
                ..
            })
        ));
        assert_eq!(engine.remaining_secs(), 900);

        clock.advance_secs(900);
        let Some(Event::RunFinished { reason, record, .. }) = engine.tick() else {
            panic!("expected RunFinished");
        };
        assert_eq!(reason, FinishReason::Completed);
        // One record for the whole cycle, not one per phase.
        assert_eq!(record.duration_secs(), 1500 + 300 + 1500 + 900);
        assert_eq!(alarm.play_count(), 4);
        assert_eq!(
            engine.store().database().recent_records(10).unwrap().len(),
            1
        );
    }

    #[test]
    fn skip_is_silent_by_default_but_final_skip_rings() {
        let config = PomodoroConfig {
            rounds_before_long_break: 1,
            ..PomodoroConfig::default()
        };
        let (mut engine, _clock, alarm) = engine_at(T0);
        engine.start(None, "study", None, RunSpec::Pomodoro(config));

        let skipped = engine.skip_phase();
        assert!(matches!(
            skipped,
            Some(Event::PhaseEnded {
                next_phase: PomodoroPhase::LongBreak,
                skipped: true,
                ..
            })
        ));
        assert_eq!(alarm.play_count(), 0);

        // Skipping the long break ends the run and always rings.
        let Some(Event::RunFinished { reason, .. }) = engine.skip_phase() else {
            panic!("expected RunFinished");
        };
        assert_eq!(reason, FinishReason::Completed);
        assert_eq!(alarm.play_count(), 1);
    }

    #[test]
    fn skip_can_ring_by_policy() {
        let alarm = RecordingAlarm::default();
        let store = SnapshotStore::new(Database::open_memory().unwrap(), TimerContext::Focus);
        let mut engine = TimerEngine::new(TimerContext::Focus, store)
            .with_clock(ManualClock::at_ms(T0))
            .with_alarm(alarm.clone())
            .with_policy(AlarmPolicy {
                ring_ms: 5000,
                ring_on_skip: true,
            });

        engine.start(None, "study", None, RunSpec::Pomodoro(PomodoroConfig::default()));
        engine.skip_phase();
        assert_eq!(alarm.play_count(), 1);
        assert_eq!(engine.pomodoro_phase(), Some(PomodoroPhase::Break));
    }

    #[test]
    fn skip_from_paused_resumes_running() {
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "study", None, RunSpec::Pomodoro(PomodoroConfig::default()));

        clock.advance_secs(60);
        engine.pause();
        assert_eq!(engine.status(), RunStatus::Paused);

        assert!(engine.skip_phase().is_some());
        assert_eq!(engine.status(), RunStatus::Running);
        assert_eq!(engine.pomodoro_phase(), Some(PomodoroPhase::Break));
        assert_eq!(engine.remaining_secs(), 300);
    }

    #[test]
    fn stop_emits_one_record_spanning_the_run() {
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "study", None, RunSpec::Pomodoro(PomodoroConfig::default()));

        clock.advance_secs(1500);
        engine.tick(); // into the break
        clock.advance_secs(100);

        let Some(Event::RunFinished { reason, record, .. }) = engine.stop() else {
            panic!("expected RunFinished");
        };
        assert_eq!(reason, FinishReason::Stopped);
        assert_eq!(record.duration_secs(), 1600);
    }

    #[test]
    fn reset_finalizes_like_stop_with_its_own_reason() {
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "focus", None, RunSpec::Countdown { minutes: 5 });
        clock.advance_secs(60);

        let Some(Event::RunFinished { reason, record, .. }) = engine.reset() else {
            panic!("expected RunFinished");
        };
        assert_eq!(reason, FinishReason::Reset);
        assert_eq!(record.duration_secs(), 60);
        assert_eq!(engine.status(), RunStatus::Idle);
    }

    // ── Recovery ─────────────────────────────────────────────────────

    #[test]
    fn recover_restores_a_running_snapshot_without_a_jump() {
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "focus", None, RunSpec::Countdown { minutes: 25 });
        clock.advance_secs(600);

        // Simulate a restart: forget in-memory state, keep the store.
        engine.run = None;

        let recovered = engine.recover();
        assert!(matches!(
            recovered,
            Some(Event::RunRecovered {
                status: RunStatus::Running,
                remaining_secs: 900,
                ..
            })
        ));
        assert_eq!(engine.remaining_secs(), 900);

        // Second recover is a no-op.
        assert!(engine.recover().is_none());
    }

    #[test]
    fn recover_finalizes_a_run_that_finished_while_away() {
        let (mut engine, clock, alarm) = engine_at(T0);
        engine.start(None, "focus", None, RunSpec::Countdown { minutes: 25 });

        engine.run = None;
        clock.advance_secs(2000); // 500s past the end

        let Some(Event::RunFinished { reason, record, .. }) = engine.recover() else {
            panic!("expected RunFinished");
        };
        assert_eq!(reason, FinishReason::Recovered);
        // The record ends when the countdown actually ran out.
        assert_eq!(record.duration_secs(), 1500);
        assert_eq!(alarm.play_count(), 1);
        assert_eq!(engine.status(), RunStatus::Idle);
        assert!(engine.store().load().is_none());
        assert_eq!(
            engine.store().database().recent_records(10).unwrap().len(),
            1
        );
    }

    #[test]
    fn recover_restores_a_paused_snapshot() {
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "focus", None, RunSpec::Countdown { minutes: 25 });
        clock.advance_secs(600);
        engine.pause();

        engine.run = None;
        clock.advance_secs(50_000);

        assert!(matches!(
            engine.recover(),
            Some(Event::RunRecovered {
                status: RunStatus::Paused,
                remaining_secs: 900,
                ..
            })
        ));
        assert_eq!(engine.status(), RunStatus::Paused);
        assert!(engine.resume().is_some());
    }

    #[test]
    fn recover_with_nothing_persisted_is_a_noop() {
        let (mut engine, _clock, _alarm) = engine_at(T0);
        assert!(engine.recover().is_none());
        assert_eq!(engine.status(), RunStatus::Idle);
    }

    #[test]
    fn recover_ignores_corrupt_snapshots() {
        let (mut engine, _clock, _alarm) = engine_at(T0);
        engine
            .store()
            .database()
            .kv_set("timer/focus", "{\"garbage\":true}")
            .unwrap();

        assert!(engine.recover().is_none());
        // A corrupt leftover must never block a fresh start.
        assert!(engine.start(None, "fresh", None, RunSpec::CountUp).is_some());
    }

    #[test]
    fn recovered_pomodoro_mid_phase_keeps_its_position() {
        let config = PomodoroConfig::default();
        let (mut engine, clock, _alarm) = engine_at(T0);
        engine.start(None, "study", None, RunSpec::Pomodoro(config));
        clock.advance_secs(1500);
        engine.tick(); // into the break
        clock.advance_secs(60);

        engine.run = None;
        let recovered = engine.recover();
        assert!(recovered.is_some());
        assert_eq!(engine.pomodoro_phase(), Some(PomodoroPhase::Break));
        assert_eq!(engine.remaining_secs(), 240);
    }
}
