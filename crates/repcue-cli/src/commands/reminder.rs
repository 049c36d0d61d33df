use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use clap::Subcommand;
use repcue_core::clock::{ManualTimers, SystemClock, TimerDriver};
use repcue_core::storage::Database;
use repcue_core::{Config, NotificationSink, ReminderScheduler, ScheduleOutcome, ValidationError};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use super::{emit, runtime};
use crate::timers::TokioTimers;

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Schedule (or replace) the reminder for a workout
    AddWorkout {
        #[arg(long)]
        workout_id: u64,
        /// Workout name shown in the notification
        #[arg(long)]
        name: String,
        /// RFC 3339 timestamp or local HH:MM today
        #[arg(long)]
        at: String,
        /// Repeat every day at the same time
        #[arg(long)]
        daily: bool,
    },
    /// Schedule a meal reminder
    AddNutrition {
        #[arg(long)]
        at: String,
        /// Notification text (defaults to the configured message)
        #[arg(long)]
        message: Option<String>,
        #[arg(long)]
        daily: bool,
    },
    /// List pending reminders, soonest first
    List,
    /// Cancel one reminder by id
    Cancel { id: String },
    /// Cancel every reminder for a workout
    CancelWorkout { workout_id: u64 },
    /// Cancel every meal reminder
    CancelNutrition,
    /// Cancel all reminders
    Clear,
    /// Stay in the foreground and deliver reminders as they come due (until Ctrl-C)
    Watch,
}

/// Delivers notifications to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&mut self, title: &str, body: &str, tag: &str) {
        eprintln!("[{tag}] {title}: {body}");
    }
}

/// Parse `--at`: an RFC 3339 timestamp, or `HH:MM` meaning today in the
/// local timezone.
pub(crate) fn parse_at(
    value: &str,
    today: DateTime<Local>,
) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    let invalid = |message: &str| ValidationError::InvalidValue {
        field: "at".into(),
        message: format!("{message}: {value}"),
    };
    let time = NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| invalid("expected RFC 3339 or HH:MM"))?;
    let local = today.date_naive().and_time(time);
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| invalid("time does not exist today"))
}

/// Open the persisted scheduler.
pub(crate) fn open_scheduler(
    timers: impl TimerDriver + 'static,
    enabled: bool,
) -> Result<ReminderScheduler, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(ReminderScheduler::new(db, SystemClock, timers, TerminalNotifier, enabled))
}

fn print_outcome(outcome: ScheduleOutcome) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        ScheduleOutcome::Scheduled(reminder) => {
            println!("{}", serde_json::to_string_pretty(&reminder)?);
            Ok(())
        }
        ScheduleOutcome::Disabled => {
            Err("reminders are disabled (config set reminders.enabled true)".into())
        }
        ScheduleOutcome::InPast => Err("scheduled time is in the past".into()),
    }
}

fn print_removed(removed: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&json!({ "removed": removed }))?);
    Ok(())
}

/// How often the watcher re-reads the store for reminders added, moved or
/// cancelled by other commands.
const RESYNC_PERIOD: Duration = Duration::from_secs(30);

async fn watch(enabled: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (fired_tx, mut fired) = mpsc::unbounded_channel();
    let mut scheduler = open_scheduler(TokioTimers::new(fired_tx), enabled)?;
    emit(&json!({
        "type": "watching",
        "pending": scheduler.pending().len(),
        "next_due": scheduler.next_due().map(|r| r.scheduled_time),
    }))?;
    if !enabled {
        info!("reminders disabled, nothing to watch");
        return Ok(());
    }

    let mut resync = interval_at(Instant::now() + RESYNC_PERIOD, RESYNC_PERIOD);
    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            handle = fired.recv() => {
                let Some(handle) = handle else { break };
                // Other commands may have rewritten the set since we last looked.
                scheduler.reload();
                if let Some(event) = scheduler.handle_timer(handle) {
                    emit(&event)?;
                }
            }
            _ = resync.tick() => scheduler.reload(),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    info!("reminder watch finished");
    Ok(())
}

pub fn run(action: ReminderAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let enabled = config.reminders.enabled;

    if let ReminderAction::Watch = action {
        return runtime()?.block_on(watch(enabled));
    }

    // Nothing comes due before a one-shot command exits.
    let mut scheduler = open_scheduler(ManualTimers::new(), enabled)?;
    match action {
        ReminderAction::AddWorkout {
            workout_id,
            name,
            at,
            daily,
        } => {
            let at = parse_at(&at, Local::now())?;
            print_outcome(scheduler.schedule_workout_reminder(workout_id, &name, at, daily))
        }
        ReminderAction::AddNutrition { at, message, daily } => {
            let at = parse_at(&at, Local::now())?;
            let message = message.unwrap_or(config.reminders.nutrition_message);
            print_outcome(scheduler.schedule_nutrition_reminder(at, &message, daily))
        }
        ReminderAction::List => {
            println!("{}", serde_json::to_string_pretty(&scheduler.pending())?);
            Ok(())
        }
        ReminderAction::Cancel { id } => {
            print_removed(usize::from(scheduler.cancel_reminder(&id)))
        }
        ReminderAction::CancelWorkout { workout_id } => {
            print_removed(scheduler.cancel_all_for_workout(workout_id))
        }
        ReminderAction::CancelNutrition => print_removed(scheduler.cancel_all_nutrition()),
        ReminderAction::Clear => print_removed(scheduler.cancel_all()),
        ReminderAction::Watch => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn local_noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).earliest().unwrap()
    }

    #[test]
    fn parses_rfc3339() {
        let at = parse_at("2024-06-15T07:30:00+02:00", local_noon()).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 6, 15, 5, 30, 0).unwrap());
    }

    #[test]
    fn parses_local_clock_time_today() {
        let at = parse_at("18:45", local_noon()).unwrap().with_timezone(&Local);
        assert_eq!(at.date_naive(), local_noon().date_naive());
        assert_eq!((at.hour(), at.minute()), (18, 45));
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_at("tomorrow", local_noon()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "at"));
        assert!(parse_at("25:00", local_noon()).is_err());
    }
}
