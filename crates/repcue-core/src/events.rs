use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reminder::ReminderKind;
use crate::session::{HistoryRecord, Stage};

/// Every state change in the system produces an Event.
/// The presentation layer renders them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        stage: Stage,
        exercise_index: usize,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        stage: Stage,
        exercise_index: usize,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    StageAdvanced {
        stage: Stage,
        exercise_index: usize,
        exercise_key: String,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    WorkoutCompleted {
        record: HistoryRecord,
        at: DateTime<Utc>,
    },
    WorkoutAbandoned {
        record: HistoryRecord,
        at: DateTime<Utc>,
    },
    SessionRestarted {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        workout_name: String,
        stage: Stage,
        exercise_index: usize,
        exercise_count: usize,
        exercise_key: String,
        remaining_secs: u32,
        stage_total_secs: u32,
        is_running: bool,
        is_completed: bool,
        is_abandoned: bool,
        workout_progress_pct: f64,
        at: DateTime<Utc>,
    },
    ReminderFired {
        id: String,
        kind: ReminderKind,
        title: String,
        body: String,
        /// Next occurrence for daily reminders.
        next: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// True for the two events that end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::WorkoutCompleted { .. } | Event::WorkoutAbandoned { .. }
        )
    }
}
