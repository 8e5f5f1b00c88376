//! Alarm playback behind a device trait.
//!
//! The engine only ever talks to [`AlarmDevice`]; the boundary between
//! timing logic and the host's audio quirks lives here. Devices must be
//! unlocked once before they will ring (audio output is gated on an
//! explicit opt-in from the surrounding app), playback loops until
//! stopped, and `play` arms a one-shot auto-stop so an unattended timer
//! does not ring forever. Alarm failures are logged and swallowed;
//! timing correctness never depends on the alarm.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Audible alarm with an unlock gate and looping playback.
pub trait AlarmDevice: Send {
    /// Arm the device. Idempotent; playback before the first unlock is
    /// refused.
    fn unlock(&self);

    /// Start looping the cue, stopping on its own after `duration_ms`.
    /// Restarts the clock if already playing.
    fn play(&self, duration_ms: u64);

    /// Stop playback and cancel the pending auto-stop.
    fn stop(&self);

    fn is_playing(&self) -> bool;
}

const PULSE_INTERVAL_MS: u64 = 1000;
const POLL_SLICE_MS: u64 = 50;

/// Terminal-bell alarm. Pulses BEL on stderr once a second from a
/// background thread until stopped or the auto-stop deadline passes.
pub struct ChimeAlarm {
    unlocked: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl ChimeAlarm {
    pub fn new() -> Self {
        Self {
            unlocked: Arc::new(AtomicBool::new(false)),
            playing: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn pulse() {
        let mut err = std::io::stderr();
        let _ = err.write_all(b"\x07");
        let _ = err.flush();
    }
}

impl Default for ChimeAlarm {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmDevice for ChimeAlarm {
    fn unlock(&self) {
        self.unlocked.store(true, Ordering::SeqCst);
    }

    fn play(&self, duration_ms: u64) {
        if !self.unlocked.load(Ordering::SeqCst) {
            tracing::warn!("alarm not unlocked, refusing to play");
            return;
        }

        // A new generation invalidates any loop already running.
        let my_gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.playing.store(true, Ordering::SeqCst);

        let playing = Arc::clone(&self.playing);
        let generation = Arc::clone(&self.generation);
        thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_millis(duration_ms);
            let mut next_pulse = Instant::now();
            loop {
                if !playing.load(Ordering::SeqCst) || generation.load(Ordering::SeqCst) != my_gen {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                if now >= next_pulse {
                    Self::pulse();
                    next_pulse = now + Duration::from_millis(PULSE_INTERVAL_MS);
                }
                thread::sleep(Duration::from_millis(POLL_SLICE_MS));
            }
            // Auto-stop, unless a newer play() took over.
            if generation.load(Ordering::SeqCst) == my_gen {
                playing.store(false, Ordering::SeqCst);
            }
        });
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

/// Silent device for configurations with audio disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAlarm;

impl AlarmDevice for NullAlarm {
    fn unlock(&self) {}
    fn play(&self, _duration_ms: u64) {}
    fn stop(&self) {}
    fn is_playing(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_play_before_unlock() {
        let alarm = ChimeAlarm::new();
        alarm.play(1000);
        assert!(!alarm.is_playing());
    }

    #[test]
    fn plays_after_unlock_and_stops_on_demand() {
        let alarm = ChimeAlarm::new();
        alarm.unlock();
        alarm.unlock(); // idempotent

        alarm.play(60_000);
        assert!(alarm.is_playing());

        alarm.stop();
        assert!(!alarm.is_playing());
    }

    #[test]
    fn auto_stops_after_duration() {
        let alarm = ChimeAlarm::new();
        alarm.unlock();

        alarm.play(100);
        thread::sleep(Duration::from_millis(600));
        assert!(!alarm.is_playing());
    }

    #[test]
    fn null_alarm_never_plays() {
        let alarm = NullAlarm;
        alarm.unlock();
        alarm.play(1000);
        assert!(!alarm.is_playing());
    }
}
