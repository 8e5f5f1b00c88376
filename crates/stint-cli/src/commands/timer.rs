use std::io::Write;
use std::time::Duration;

use clap::{Subcommand, ValueEnum};
use notify_rust::{Notification, Urgency};
use stint_core::store::{Config, Database, SnapshotStore};
use stint_core::timer::TimerEngine;
use stint_core::{
    format_clock, Event, NullAlarm, PomodoroPhase, RunSpec, RunStatus, TimerContext, TimerMode,
};

#[derive(Clone, Copy, ValueEnum)]
pub enum ContextArg {
    Focus,
    Plan,
}

impl From<ContextArg> for TimerContext {
    fn from(value: ContextArg) -> Self {
        match value {
            ContextArg::Focus => TimerContext::Focus,
            ContextArg::Plan => TimerContext::Plan,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Countdown,
    Countup,
    Pomodoro,
}

#[derive(Subcommand)]
pub enum TimerAction {
    /// Begin a run
    Start {
        /// Task ID to associate with the run
        #[arg(long)]
        task_id: Option<String>,
        /// Task name for the emitted record
        #[arg(long, default_value = "untitled")]
        name: String,
        /// Category for the emitted record
        #[arg(long)]
        category: Option<String>,
        /// Timer mode
        #[arg(long, value_enum, default_value = "countdown")]
        mode: ModeArg,
        /// Countdown length in minutes
        #[arg(long, default_value_t = 25)]
        minutes: u64,
        /// Override the configured pomodoro work length (minutes)
        #[arg(long)]
        work: Option<u64>,
        /// Override the configured pomodoro break length (minutes)
        #[arg(long = "break")]
        break_minutes: Option<u64>,
        /// Override how many work rounds precede the long break
        #[arg(long)]
        rounds: Option<u32>,
        /// Override the configured long break length (minutes)
        #[arg(long)]
        long_break: Option<u64>,
    },
    /// Freeze the current phase
    Pause,
    /// Continue a paused run
    Resume,
    /// End the run and record it
    Stop,
    /// End the run and record it, marked as a reset
    Reset,
    /// Force the next pomodoro phase
    Skip,
    /// Print the current state
    Status {
        /// Print the full state snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tick the run in the foreground until it finishes
    Watch,
}

/// Print the event an operation produced, or the current state when the
/// operation was a no-op.
fn print_outcome(
    event: Option<Event>,
    engine: &TimerEngine,
) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
        None => println!("{}", serde_json::to_string_pretty(&engine.snapshot_event())?),
    }
    Ok(())
}

fn status_line(engine: &TimerEngine) -> String {
    if engine.status() == RunStatus::Idle {
        return "idle".to_string();
    }
    let clock = match engine.mode() {
        Some(TimerMode::CountUp) => format_clock(engine.elapsed_secs()),
        _ => format_clock(engine.remaining_secs()),
    };
    let mut line = format!(
        "{} {} {}",
        engine.status().as_str(),
        engine.task_name().unwrap_or("-"),
        clock
    );
    if let (Some(phase), Some(round)) = (engine.pomodoro_phase(), engine.pomodoro_round()) {
        line.push_str(&format!(" [{} round {}]", phase_label(phase), round));
    }
    line
}

fn phase_label(phase: PomodoroPhase) -> &'static str {
    match phase {
        PomodoroPhase::Work => "work",
        PomodoroPhase::Break => "break",
        PomodoroPhase::LongBreak => "long break",
    }
}

/// Desktop notification for a boundary event. An unreachable
/// notification daemon is ignored.
fn notify_boundary(event: &Event) {
    let (summary, body) = match event {
        Event::PhaseEnded {
            phase,
            next_phase,
            round,
            ..
        } => (
            format!("{} over", phase_label(*phase)),
            format!("next: {} (round {round})", phase_label(*next_phase)),
        ),
        Event::RunFinished { record, .. } => (
            "timer finished".to_string(),
            format!("{} ({} min)", record.task_name, record.duration_minutes()),
        ),
        _ => return,
    };
    let _ = Notification::new()
        .summary(&summary)
        .body(&body)
        .appname("stint")
        .icon("alarm-clock")
        .urgency(Urgency::Critical)
        .show();
}

async fn watch_loop(
    engine: &mut TimerEngine,
    notify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        if let Some(event) = engine.tick() {
            println!();
            println!("{}", serde_json::to_string_pretty(&event)?);
            if notify {
                notify_boundary(&event);
            }
        }
        if engine.status() == RunStatus::Idle {
            break;
        }
        print!("\r{}    ", status_line(engine));
        std::io::stdout().flush()?;
    }
    Ok(())
}

pub fn run(context: ContextArg, action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let context: TimerContext = context.into();
    let db = Database::open()?;
    let mut engine =
        TimerEngine::new(context, SnapshotStore::new(db, context)).with_policy(config.alarm_policy());
    if !config.alarm.enabled {
        engine = engine.with_alarm(NullAlarm);
    }
    engine.unlock_alarm();

    // Pick up whatever the previous process left behind before acting.
    if let Some(event) = engine.recover() {
        println!("{}", serde_json::to_string_pretty(&event)?);
    }

    match action {
        TimerAction::Start {
            task_id,
            name,
            category,
            mode,
            minutes,
            work,
            break_minutes,
            rounds,
            long_break,
        } => {
            if engine.status() != RunStatus::Idle {
                eprintln!("a run is already active in the {context} context, stop it first");
                std::process::exit(1);
            }
            let spec = match mode {
                ModeArg::Countdown => {
                    if minutes == 0 {
                        eprintln!("minutes must be positive");
                        std::process::exit(1);
                    }
                    RunSpec::Countdown { minutes }
                }
                ModeArg::Countup => RunSpec::CountUp,
                ModeArg::Pomodoro => {
                    let mut cycle = config.pomodoro_config();
                    if let Some(m) = work {
                        cycle.work_minutes = m;
                    }
                    if let Some(m) = break_minutes {
                        cycle.break_minutes = m;
                    }
                    if let Some(n) = rounds {
                        cycle.rounds_before_long_break = n;
                    }
                    if let Some(m) = long_break {
                        cycle.long_break_minutes = m;
                    }
                    RunSpec::Pomodoro(cycle)
                }
            };
            print_outcome(engine.start(task_id, &name, category, spec), &engine)?;
        }
        TimerAction::Pause => print_outcome(engine.pause(), &engine)?,
        TimerAction::Resume => print_outcome(engine.resume(), &engine)?,
        TimerAction::Stop => print_outcome(engine.stop(), &engine)?,
        TimerAction::Reset => print_outcome(engine.reset(), &engine)?,
        TimerAction::Skip => print_outcome(engine.skip_phase(), &engine)?,
        TimerAction::Status { json } => {
            // A boundary may have passed since the last invocation.
            if let Some(event) = engine.tick() {
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&engine.snapshot_event())?);
            } else {
                println!("{}", status_line(&engine));
            }
        }
        TimerAction::Watch => {
            if engine.status() == RunStatus::Idle {
                println!("idle");
                return Ok(());
            }
            let notify = config.notifications.enabled;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(watch_loop(&mut engine, notify))?;
        }
    }

    Ok(())
}
