use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::format_duration;

/// Rough kcal burned per second of workout.
pub const CALORIES_PER_SECOND: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Complete,
    Incomplete,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Complete => "complete",
            SessionStatus::Incomplete => "incomplete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "complete" => Some(SessionStatus::Complete),
            "incomplete" => Some(SessionStatus::Incomplete),
            _ => None,
        }
    }
}

/// Summary of one finished (completed or abandoned) session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub workout_name: String,
    pub completed_at: DateTime<Utc>,
    /// Display form, e.g. `1m 5s`.
    pub duration: String,
    pub duration_secs: u64,
    pub calories: u64,
    pub status: SessionStatus,
}

impl HistoryRecord {
    pub fn new(
        workout_name: impl Into<String>,
        completed_at: DateTime<Utc>,
        duration_secs: u64,
        status: SessionStatus,
    ) -> Self {
        Self {
            workout_name: workout_name.into(),
            completed_at,
            duration: format_duration(duration_secs),
            duration_secs,
            calories: estimate_calories(duration_secs),
            status,
        }
    }
}

/// `round(seconds * 0.15)`. Not a physiological model.
pub fn estimate_calories(duration_secs: u64) -> u64 {
    (duration_secs as f64 * CALORIES_PER_SECOND).round() as u64
}

/// Receives exactly one record per finished session.
pub trait HistorySink {
    fn append(&mut self, record: &HistoryRecord);
}

/// Keeps records in memory.
impl HistorySink for Vec<HistoryRecord> {
    fn append(&mut self, record: &HistoryRecord) {
        self.push(record.clone());
    }
}
