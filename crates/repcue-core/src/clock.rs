//! Time sources and timer primitives.
//!
//! The core never sleeps or spawns. Wall-clock time comes from a [`Clock`]
//! and deferred work is requested from a [`TimerDriver`]; the host decides
//! how timers actually elapse and reports fired handles back to the owner.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Opaque identifier of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Host primitive for one-shot timers (`setTimeout`/`clearTimeout`).
///
/// Handles must never be reused by a driver. Clearing an unknown or
/// already-fired handle is a no-op.
pub trait TimerDriver {
    fn set_timer(&mut self, delay: std::time::Duration) -> TimerHandle;
    fn clear_timer(&mut self, handle: TimerHandle);
}

#[derive(Debug, Default)]
struct ManualTimersInner {
    next_handle: u64,
    armed: BTreeMap<TimerHandle, std::time::Duration>,
}

/// Timer driver that only records what is armed.
///
/// Nothing ever fires on its own. Tests fire a handle by passing it to the
/// owner; one-shot CLI commands use it because the process exits before any
/// reminder would be due anyway. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualTimers {
    inner: Rc<RefCell<ManualTimersInner>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed_count(&self) -> usize {
        self.inner.borrow().armed.len()
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.inner.borrow().armed.contains_key(&handle)
    }

    pub fn delay_of(&self, handle: TimerHandle) -> Option<std::time::Duration> {
        self.inner.borrow().armed.get(&handle).copied()
    }

    /// Mark a timer as elapsed. Returns false if it was not armed.
    pub fn elapse(&self, handle: TimerHandle) -> bool {
        self.inner.borrow_mut().armed.remove(&handle).is_some()
    }
}

impl TimerDriver for ManualTimers {
    fn set_timer(&mut self, delay: std::time::Duration) -> TimerHandle {
        let mut inner = self.inner.borrow_mut();
        inner.next_handle += 1;
        let handle = TimerHandle(inner.next_handle);
        inner.armed.insert(handle, delay);
        handle
    }

    fn clear_timer(&mut self, handle: TimerHandle) {
        self.inner.borrow_mut().armed.remove(&handle);
    }
}

/// Human-readable duration, e.g. `1m 5s`.
pub fn format_duration(total_secs: u64) -> String {
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let other = clock.clone();
        clock.advance(Duration::minutes(90));
        assert_eq!(other.now(), start + Duration::minutes(90));
    }

    #[test]
    fn manual_timers_never_reuse_handles() {
        let mut timers = ManualTimers::new();
        let a = timers.set_timer(std::time::Duration::from_secs(5));
        timers.clear_timer(a);
        let b = timers.set_timer(std::time::Duration::from_secs(5));
        assert_ne!(a, b);
        assert!(!timers.is_armed(a));
        assert!(timers.is_armed(b));
        assert_eq!(timers.armed_count(), 1);
    }

    #[test]
    fn clearing_unknown_handle_is_noop() {
        let mut timers = ManualTimers::new();
        timers.clear_timer(TimerHandle::new(42));
        assert_eq!(timers.armed_count(), 0);
    }

    #[test]
    fn durations_format_like_history_entries() {
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(0), "0m 0s");
    }
}
