use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NUTRITION_MESSAGE: &str = "Time to log your meal!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Workout,
    Nutrition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
}

/// Persisted reminder. Timer handles are never part of this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub kind: ReminderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub recurring: Option<Recurrence>,
}

impl Reminder {
    /// Stable id for a workout's reminder. Rescheduling replaces it.
    pub fn workout_reminder_id(workout_id: u64) -> String {
        format!("workout-{workout_id}")
    }

    pub fn nutrition_reminder_id(created_at_ms: i64) -> String {
        format!("nutrition-{created_at_ms}")
    }

    pub fn workout(
        workout_id: u64,
        workout_name: impl Into<String>,
        scheduled_time: DateTime<Utc>,
        recurring: Option<Recurrence>,
    ) -> Self {
        Self {
            id: Self::workout_reminder_id(workout_id),
            kind: ReminderKind::Workout,
            workout_id: Some(workout_id),
            workout_name: Some(workout_name.into()),
            message: None,
            scheduled_time,
            recurring,
        }
    }

    pub fn nutrition(
        id: String,
        message: impl Into<String>,
        scheduled_time: DateTime<Utc>,
        recurring: Option<Recurrence>,
    ) -> Self {
        Self {
            id,
            kind: ReminderKind::Nutrition,
            workout_id: None,
            workout_name: None,
            message: Some(message.into()),
            scheduled_time,
            recurring,
        }
    }

    pub fn is_daily(&self) -> bool {
        self.recurring == Some(Recurrence::Daily)
    }

    /// Workout reminders must name their workout; ids must be non-empty.
    pub fn is_well_formed(&self) -> bool {
        if self.id.trim().is_empty() {
            return false;
        }
        match self.kind {
            ReminderKind::Workout => self.workout_id.is_some(),
            ReminderKind::Nutrition => true,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            ReminderKind::Workout => "Workout Reminder",
            ReminderKind::Nutrition => "Meal Reminder",
        }
    }

    pub fn body(&self) -> String {
        match self.kind {
            ReminderKind::Workout => {
                let name = self.workout_name.as_deref().unwrap_or("scheduled");
                format!("Time for your \"{name}\" workout!")
            }
            ReminderKind::Nutrition => self
                .message
                .clone()
                .unwrap_or_else(|| DEFAULT_NUTRITION_MESSAGE.to_string()),
        }
    }
}

/// First `time + k * 24h` (k >= 0) strictly after `now`.
///
/// Missed days are skipped in one step rather than replayed.
pub fn next_daily_occurrence(time: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if time > now {
        return time;
    }
    let day = Duration::hours(24);
    let behind = now - time;
    let days = behind.num_seconds() / day.num_seconds() + 1;
    let mut next = time + day * days as i32;
    while next <= now {
        next += day;
    }
    next
}
