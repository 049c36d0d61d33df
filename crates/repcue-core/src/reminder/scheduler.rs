//! Durable reminder scheduling.
//!
//! Pending reminders live in two maps: the persisted records, keyed by id,
//! and the transient id -> timer handle map. Every mutation of the first is
//! followed by a full rewrite of the persisted set.
//!
//! Timers only speed things up. After any gap (process closed, device
//! asleep) the startup reconciliation in [`ReminderScheduler::new`] is the
//! source of truth: past daily reminders move to their next slot, past
//! one-off reminders are dropped, and nothing is fired retroactively.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::model::{next_daily_occurrence, Recurrence, Reminder, ReminderKind};
use crate::clock::{Clock, TimerDriver, TimerHandle};
use crate::events::Event;
use crate::storage::KeyValueStore;

/// Storage key of the persisted reminder set.
pub const REMINDERS_KEY: &str = "reminders";

/// Displays a system notification. Fire-and-forget.
pub trait NotificationSink {
    fn notify(&mut self, title: &str, body: &str, tag: &str);
}

/// Result of a scheduling request. Only `Scheduled` changes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled(Reminder),
    /// Reminders are switched off globally.
    Disabled,
    /// A one-off reminder was requested for a time that has passed.
    InPast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persistence {
    Durable,
    /// The stored set could not be read; writing now would clobber it.
    MemoryOnly,
}

pub struct ReminderScheduler {
    store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    timers: Box<dyn TimerDriver>,
    notifier: Box<dyn NotificationSink>,
    enabled: bool,
    pending: BTreeMap<String, Reminder>,
    armed: HashMap<String, TimerHandle>,
    persistence: Persistence,
}

impl fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("enabled", &self.enabled)
            .field("pending", &self.pending)
            .field("armed", &self.armed)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

impl ReminderScheduler {
    /// Load the persisted set, reconcile it against the clock and arm a
    /// timer for every surviving reminder.
    ///
    /// When `enabled` is false the set is emptied instead.
    pub fn new(
        store: impl KeyValueStore + 'static,
        clock: impl Clock + 'static,
        timers: impl TimerDriver + 'static,
        notifier: impl NotificationSink + 'static,
        enabled: bool,
    ) -> Self {
        let mut scheduler = Self {
            store: Box::new(store),
            clock: Box::new(clock),
            timers: Box::new(timers),
            notifier: Box::new(notifier),
            enabled,
            pending: BTreeMap::new(),
            armed: HashMap::new(),
            persistence: Persistence::Durable,
        };
        scheduler.reconcile();
        if !enabled {
            scheduler.cancel_all();
        }
        scheduler
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// False once a read failure has degraded the scheduler to memory only.
    pub fn is_durable(&self) -> bool {
        self.persistence == Persistence::Durable
    }

    /// Pending reminders, soonest first.
    pub fn pending(&self) -> Vec<&Reminder> {
        let mut all: Vec<&Reminder> = self.pending.values().collect();
        all.sort_by(|a, b| {
            a.scheduled_time
                .cmp(&b.scheduled_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }

    pub fn get(&self, id: &str) -> Option<&Reminder> {
        self.pending.get(id)
    }

    pub fn next_due(&self) -> Option<&Reminder> {
        self.pending().into_iter().next()
    }

    /// Handle of the timer currently armed for `id`.
    pub fn armed_handle(&self, id: &str) -> Option<TimerHandle> {
        self.armed.get(id).copied()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Schedule (or replace) the reminder for a workout.
    pub fn schedule_workout_reminder(
        &mut self,
        workout_id: u64,
        workout_name: &str,
        scheduled_time: DateTime<Utc>,
        repeat_daily: bool,
    ) -> ScheduleOutcome {
        let reminder = Reminder::workout(
            workout_id,
            workout_name,
            scheduled_time,
            repeat_daily.then_some(Recurrence::Daily),
        );
        self.insert(reminder)
    }

    /// Schedule a meal reminder. Each call creates a new reminder.
    pub fn schedule_nutrition_reminder(
        &mut self,
        scheduled_time: DateTime<Utc>,
        message: &str,
        repeat_daily: bool,
    ) -> ScheduleOutcome {
        let mut created_ms = self.clock.now().timestamp_millis();
        while self
            .pending
            .contains_key(&Reminder::nutrition_reminder_id(created_ms))
        {
            created_ms += 1;
        }
        let reminder = Reminder::nutrition(
            Reminder::nutrition_reminder_id(created_ms),
            message,
            scheduled_time,
            repeat_daily.then_some(Recurrence::Daily),
        );
        self.insert(reminder)
    }

    /// Returns whether a reminder was removed.
    pub fn cancel_reminder(&mut self, id: &str) -> bool {
        self.remove_where(|r| r.id == id) > 0
    }

    pub fn cancel_all_for_workout(&mut self, workout_id: u64) -> usize {
        self.remove_where(|r| r.workout_id == Some(workout_id))
    }

    pub fn cancel_all_nutrition(&mut self) -> usize {
        self.remove_where(|r| r.kind == ReminderKind::Nutrition)
    }

    pub fn cancel_all(&mut self) -> usize {
        self.remove_where(|_| true)
    }

    /// Apply the global reminders setting. Disabling cancels everything.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            let removed = self.cancel_all();
            info!(removed, "reminders disabled");
        }
    }

    /// Called by the host when an armed timer elapses.
    ///
    /// Handles that were cleared or replaced are ignored, so a delivery that
    /// races a cancel never fires.
    pub fn handle_timer(&mut self, handle: TimerHandle) -> Option<Event> {
        let Some(id) = self
            .armed
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(id, _)| id.clone())
        else {
            debug!(handle = handle.raw(), "ignoring stale timer");
            return None;
        };
        self.armed.remove(&id);

        let reminder = self.pending.get(&id)?.clone();
        let now = self.clock.now();
        let title = reminder.title();
        let body = reminder.body();
        self.notifier.notify(title, &body, &id);

        let next = if reminder.is_daily() {
            // A timer may elapse a little early; never re-arm the same slot.
            let next = next_daily_occurrence(reminder.scheduled_time, now.max(reminder.scheduled_time));
            if let Some(r) = self.pending.get_mut(&id) {
                r.scheduled_time = next;
            }
            self.arm(&id, now);
            Some(next)
        } else {
            self.pending.remove(&id);
            None
        };
        self.persist();

        info!(id = %id, next = ?next, "reminder fired");
        Some(Event::ReminderFired {
            id,
            kind: reminder.kind,
            title: title.to_string(),
            body,
            next,
            at: now,
        })
    }

    /// Pick up changes another scheduler made to the shared store.
    ///
    /// The stored set replaces the in-memory one. Reminders that are
    /// unchanged keep their timer; new or edited ones are re-armed, and
    /// ones that vanished are disarmed so their pending deliveries are
    /// ignored. Call this before acting on a timer in a long-lived process.
    pub fn reload(&mut self) {
        if !self.enabled || self.persistence == Persistence::MemoryOnly {
            return;
        }
        let Some((loaded, mut dirty)) = self.load() else {
            debug!("keeping in-memory reminders");
            return;
        };
        let now = self.clock.now();

        let mut next = BTreeMap::new();
        let mut changed = Vec::new();
        for mut reminder in loaded {
            let unchanged = self.pending.get(&reminder.id) == Some(&reminder)
                && self.armed.contains_key(&reminder.id);
            if !unchanged {
                if reminder.scheduled_time <= now {
                    dirty = true;
                    if !reminder.is_daily() {
                        info!(id = %reminder.id, "dropping missed one-off reminder");
                        continue;
                    }
                    reminder.scheduled_time = next_daily_occurrence(reminder.scheduled_time, now);
                }
                changed.push(reminder.id.clone());
            }
            if next.contains_key(&reminder.id) {
                warn!(id = %reminder.id, "duplicate persisted reminder, keeping the last one");
                dirty = true;
            }
            next.insert(reminder.id.clone(), reminder);
        }

        let gone: Vec<String> = self
            .pending
            .keys()
            .filter(|id| !next.contains_key(*id))
            .cloned()
            .collect();
        for id in &gone {
            self.disarm(id);
        }
        self.pending = next;
        for id in &changed {
            if self.pending.contains_key(id) {
                self.arm(id, now);
            }
        }
        if dirty {
            self.persist();
        }
        debug!(
            added_or_changed = changed.len(),
            removed = gone.len(),
            "reminders reloaded"
        );
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn insert(&mut self, mut reminder: Reminder) -> ScheduleOutcome {
        if !self.enabled {
            debug!(id = %reminder.id, "reminders disabled, not scheduling");
            return ScheduleOutcome::Disabled;
        }
        let now = self.clock.now();
        if reminder.scheduled_time <= now {
            if !reminder.is_daily() {
                debug!(id = %reminder.id, "refusing to schedule in the past");
                return ScheduleOutcome::InPast;
            }
            reminder.scheduled_time = next_daily_occurrence(reminder.scheduled_time, now);
        }

        let id = reminder.id.clone();
        self.pending.insert(id.clone(), reminder.clone());
        self.arm(&id, now);
        self.persist();
        info!(id = %id, at = %reminder.scheduled_time, daily = reminder.is_daily(), "reminder scheduled");
        ScheduleOutcome::Scheduled(reminder)
    }

    fn remove_where(&mut self, matches: impl Fn(&Reminder) -> bool) -> usize {
        let ids: Vec<String> = self
            .pending
            .values()
            .filter(|r| matches(r))
            .map(|r| r.id.clone())
            .collect();
        for id in &ids {
            self.disarm(id);
            self.pending.remove(id);
        }
        if !ids.is_empty() {
            self.persist();
            info!(removed = ids.len(), "reminders cancelled");
        }
        ids.len()
    }

    /// Clear any previous timer for `id`, then arm a fresh one.
    fn arm(&mut self, id: &str, now: DateTime<Utc>) {
        self.disarm(id);
        let Some(reminder) = self.pending.get(id) else {
            return;
        };
        let delay = (reminder.scheduled_time - now).to_std().unwrap_or_default();
        let handle = self.timers.set_timer(delay);
        self.armed.insert(id.to_string(), handle);
    }

    fn disarm(&mut self, id: &str) {
        if let Some(handle) = self.armed.remove(id) {
            self.timers.clear_timer(handle);
        }
    }

    fn reconcile(&mut self) {
        let now = self.clock.now();
        let Some((loaded, mut dirty)) = self.load() else {
            warn!("continuing with reminders in memory only");
            self.persistence = Persistence::MemoryOnly;
            return;
        };

        for mut reminder in loaded {
            if reminder.scheduled_time <= now {
                dirty = true;
                if !reminder.is_daily() {
                    info!(id = %reminder.id, "dropping missed one-off reminder");
                    continue;
                }
                reminder.scheduled_time = next_daily_occurrence(reminder.scheduled_time, now);
                info!(id = %reminder.id, next = %reminder.scheduled_time, "advanced missed daily reminder");
            }
            if self.pending.contains_key(&reminder.id) {
                warn!(id = %reminder.id, "duplicate persisted reminder, keeping the last one");
                dirty = true;
            }
            self.pending.insert(reminder.id.clone(), reminder);
        }

        let ids: Vec<String> = self.pending.keys().cloned().collect();
        for id in &ids {
            self.arm(id, now);
        }
        if dirty {
            self.persist();
        }
    }

    /// Read the persisted set, or `None` when the store cannot be read.
    /// The flag is true when something unusable was skipped and the stored
    /// form should be rewritten.
    fn load(&self) -> Option<(Vec<Reminder>, bool)> {
        let raw = match self.store.get(REMINDERS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some((Vec::new(), false)),
            Err(e) => {
                warn!(error = %e, "failed to read reminders");
                return None;
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, "persisted reminder set is unreadable, starting empty");
                return Some((Vec::new(), true));
            }
        };

        let mut skipped = false;
        let mut reminders = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<Reminder>(value) {
                Ok(r) if r.is_well_formed() => reminders.push(r),
                Ok(r) => {
                    warn!(id = %r.id, "skipping malformed reminder");
                    skipped = true;
                }
                Err(e) => {
                    warn!(error = %e, "skipping malformed reminder");
                    skipped = true;
                }
            }
        }
        Some((reminders, skipped))
    }

    fn persist(&mut self) {
        if self.persistence == Persistence::MemoryOnly {
            debug!("reminder persistence disabled for this session");
            return;
        }
        let records: Vec<&Reminder> = self.pending.values().collect();
        let json = match serde_json::to_string(&records) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize reminders");
                return;
            }
        };
        if let Err(e) = self.store.set(REMINDERS_KEY, &json) {
            warn!(error = %e, "failed to persist reminders");
        }
    }
}
