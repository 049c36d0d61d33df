use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use repcue_core::storage::Database;
use serde_json::json;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Recent sessions, newest first
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Totals over the last N days
    Stats {
        #[arg(long, default_value = "7")]
        days: u32,
    },
    /// Delete all history
    Reset,
}

/// Start of the stats window. Windows reaching past the earliest
/// representable instant cover all history.
fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { limit } => {
            let records = db.history(limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        HistoryAction::Stats { days } => {
            let stats = db.stats_since(days_before(Utc::now(), days))?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        HistoryAction::Reset => {
            let deleted = db.clear_history()?;
            println!("{}", serde_json::to_string_pretty(&json!({ "deleted": deleted }))?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_starts_whole_days_back() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(
            days_before(now, 7),
            Utc.with_ymd_and_hms(2024, 6, 8, 12, 0, 0).unwrap()
        );
        assert_eq!(days_before(now, 0), now);
    }

    #[test]
    fn huge_window_covers_everything() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(days_before(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
