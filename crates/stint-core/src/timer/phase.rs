//! Phase timing arithmetic.
//!
//! Everything here is pure: elapsed and remaining are derived from the
//! anchor timestamp on every call, never stored or decremented, so a
//! missed or delayed tick can never accumulate drift. The next tick
//! recomputes from the anchor and lands on the right value.

use serde::Serialize;

use crate::timer::mode::TimerMode;

/// Derived timing for the current phase at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub is_complete: bool,
}

/// Compute elapsed/remaining for a phase anchored at `anchor_ms`.
///
/// `total_secs` is the phase length (ignored for count-up, which has no
/// end). A clock that stepped backwards reads as zero elapsed; remaining
/// is clamped to `[0, total_secs]`. For countdown and pomodoro phases
/// `is_complete` holds exactly when remaining hits zero; a count-up run
/// never completes on its own.
pub fn compute_phase(anchor_ms: u64, total_secs: u64, mode: TimerMode, now_ms: u64) -> PhaseTiming {
    let elapsed_secs = now_ms.saturating_sub(anchor_ms) / 1000;

    match mode {
        TimerMode::CountUp => PhaseTiming {
            elapsed_secs,
            remaining_secs: 0,
            is_complete: false,
        },
        TimerMode::Countdown | TimerMode::Pomodoro => {
            let remaining_secs = total_secs.saturating_sub(elapsed_secs);
            PhaseTiming {
                elapsed_secs: elapsed_secs.min(total_secs),
                remaining_secs,
                is_complete: remaining_secs == 0,
            }
        }
    }
}
