mod model;
mod scheduler;

pub use model::{
    next_daily_occurrence, Recurrence, Reminder, ReminderKind, DEFAULT_NUTRITION_MESSAGE,
};
pub use scheduler::{NotificationSink, ReminderScheduler, ScheduleOutcome, REMINDERS_KEY};
