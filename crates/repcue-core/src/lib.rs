//! # repcue Core Library
//!
//! This library provides the core logic of the repcue workout companion:
//! running a timed exercise session and scheduling workout and meal
//! reminders that survive restarts. The `repcue` CLI is a thin layer over
//! the same library.
//!
//! ## Architecture
//!
//! - **Session**: a tick-driven state machine that sequences exercises and
//!   rests and records one history entry per finished session
//! - **Reminders**: a scheduler that persists pending reminders to a
//!   key-value store and reconciles them against the clock on startup
//! - **Clock**: injected time source and timer primitive, so neither
//!   component sleeps or spawns on its own
//! - **Storage**: SQLite history and kv store, TOML configuration
//!
//! ## Key Components
//!
//! - [`WorkoutSession`]: Session timer state machine
//! - [`ReminderScheduler`]: Durable reminder scheduling
//! - [`Database`]: History and key-value persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod reminder;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, ManualTimers, SystemClock, TimerDriver, TimerHandle};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use reminder::{
    next_daily_occurrence, NotificationSink, Recurrence, Reminder, ReminderKind,
    ReminderScheduler, ScheduleOutcome,
};
pub use session::{
    AudioCueSink, Cue, ExerciseRef, HapticSink, HistoryRecord, HistorySink, SessionSinks,
    SessionState, SessionStatus, Stage, WorkoutDefinition, WorkoutSession,
};
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
