//! Wall-clock abstraction for the timer engine.
//!
//! All timing math in the engine derives elapsed/remaining from anchor
//! timestamps read through a [`Clock`], so tests can drive the engine
//! deterministically by injecting a [`ManualClock`] and advancing it by
//! hand. Production code uses [`SystemClock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of wall-clock time.
pub trait Clock: Send {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time as milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }
}

/// System wall clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests.
///
/// Clones share the same underlying instant, so a test can keep one
/// handle and hand another to the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    epoch_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            epoch_ms: Arc::new(AtomicU64::new(start.timestamp_millis().max(0) as u64)),
        }
    }

    pub fn at_ms(epoch_ms: u64) -> Self {
        Self {
            epoch_ms: Arc::new(AtomicU64::new(epoch_ms)),
        }
    }

    pub fn set_ms(&self, epoch_ms: u64) {
        self.epoch_ms.store(epoch_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.epoch_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.epoch_ms.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp_millis(ms as i64).unwrap_or_default()
    }

    fn now_ms(&self) -> u64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }
}
