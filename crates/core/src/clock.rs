//! Injectable time and identifier sources.
//!
//! The store never calls `Utc::now()` or `Uuid::now_v7()` directly; it goes
//! through these seams so tests can pin time and ids.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::id::EventId;

/// Source of "now".
pub trait Clock: Send + Sync + core::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of fresh event identifiers.
pub trait IdGenerator: Send + Sync + core::fmt::Debug {
    fn new_id(&self) -> EventId;
}

/// Wall clock that strictly increases within one process.
///
/// Every reading is at least one microsecond after the previous one, even if
/// the system clock steps back or two reads land in the same microsecond.
#[derive(Debug, Default)]
pub struct SystemClock {
    last_micros: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let next = |prev: i64| wall.max(prev.saturating_add(1));
        let micros = match self
            .last_micros
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| Some(next(prev)))
        {
            Ok(prev) | Err(prev) => next(prev),
        };
        Utc.timestamp_micros(micros).single().unwrap_or_else(Utc::now)
    }
}

/// Test clock: returns a fixed instant, optionally advancing by `step` after
/// every read.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    /// A clock frozen at `start` until [`ManualClock::advance`] is called.
    pub fn fixed(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            step: Duration::zero(),
        }
    }

    /// A clock that moves forward by `step` on every read.
    pub fn ticking(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        let current = *now;
        *now += self.step;
        current
    }
}

/// Production id source: UUIDv7 strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Ids;

impl IdGenerator for UuidV7Ids {
    fn new_id(&self) -> EventId {
        EventId::new()
    }
}

/// Deterministic id source for tests: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> EventId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
            .parse()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_strictly_increasing() {
        let clock = SystemClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn system_clock_steps_past_a_future_reading() {
        let clock = SystemClock::new();
        let ahead = Utc.timestamp_micros(Utc::now().timestamp_micros() + 60_000_000).unwrap();
        clock.last_micros.store(ahead.timestamp_micros(), Ordering::Release);
        assert_eq!(clock.now(), ahead + Duration::microseconds(1));
        assert_eq!(clock.now(), ahead + Duration::microseconds(2));
    }

    #[test]
    fn ticking_clock_advances_per_read() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::ticking(start, Duration::milliseconds(5));
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start + Duration::milliseconds(5));
    }

    #[test]
    fn fixed_clock_only_moves_when_told() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::fixed(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::seconds(1));
        assert_eq!(clock.now(), start + Duration::seconds(1));
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("evt");
        assert_eq!(ids.new_id().as_str(), "evt-1");
        assert_eq!(ids.new_id().as_str(), "evt-2");
    }
}
