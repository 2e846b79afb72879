//! Time sources for the timer engine.
//!
//! The engine never reads the wall clock directly. It asks a [`Clock`] so the
//! countdown can be driven deterministically in tests and replays.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Monotonic, non-decreasing time provider.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Real clock. Readings are the wall-clock time captured at construction plus
/// the monotonic time elapsed since, so they never go backwards when the
/// system clock is adjusted.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin_wall: DateTime<Utc>,
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin_wall: Utc::now(),
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_wall + elapsed
    }
}

/// Manually driven clock. Clones share the same reading.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());
        let mut guard = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *guard += by;
    }

    /// Moves the clock to `to`; earlier instants are ignored.
    pub fn set(&self, to: DateTime<Utc>) {
        let mut guard = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if to > *guard {
            *guard = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
