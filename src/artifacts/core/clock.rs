use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;

/// Source of timestamps for new commits and reflog entries
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        chrono::Local::now().fixed_offset()
    }
}

/// Deterministic clock that advances by a fixed step on every reading
#[derive(Debug)]
pub struct SteppedClock {
    next: Mutex<DateTime<FixedOffset>>,
    step: chrono::Duration,
}

impl SteppedClock {
    pub fn new(start: DateTime<FixedOffset>, step: chrono::Duration) -> Self {
        SteppedClock {
            next: Mutex::new(start),
            step,
        }
    }

    /// Ticks one second per reading starting at the given Unix time
    pub fn from_epoch_seconds(seconds: i64) -> Self {
        let start = DateTime::from_timestamp(seconds, 0)
            .unwrap_or_default()
            .fixed_offset();
        Self::new(start, chrono::Duration::seconds(1))
    }
}

impl Default for SteppedClock {
    fn default() -> Self {
        Self::from_epoch_seconds(1_672_531_200)
    }
}

impl Clock for SteppedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let mut next = self.next.lock();
        let now = *next;
        *next = now + self.step;
        now
    }
}
