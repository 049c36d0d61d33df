use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Subcommand;
use repcue_core::clock::format_duration;
use repcue_core::storage::Database;
use repcue_core::{Config, Event, SessionSinks, WorkoutDefinition, WorkoutSession};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::{emit, runtime};
use crate::feedback::TerminalFeedback;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a workout interactively (stdin: p = pause/resume, s = skip, r = restart, q = stop)
    Run {
        /// Workout definition (TOML); the built-in beginner workout when omitted
        #[arg(long)]
        workout: Option<PathBuf>,
        /// Start the first exercise without the get-ready countdown
        #[arg(long)]
        no_get_ready: bool,
    },
    /// Print the workout plan and its totals
    Preview {
        #[arg(long)]
        workout: Option<PathBuf>,
    },
}

/// One line of operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Toggle,
    Skip,
    Restart,
    Stop,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "p" | "pause" | "resume" => Some(Self::Toggle),
            "s" | "skip" => Some(Self::Skip),
            "r" | "restart" => Some(Self::Restart),
            "q" | "quit" | "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}

enum Input {
    Tick,
    Line(std::io::Result<Option<String>>),
    Interrupt,
}

fn load_workout(
    path: Option<&Path>,
    config: &Config,
) -> Result<WorkoutDefinition, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(WorkoutDefinition::from_toml_file(path)?),
        None => {
            let mut workout = WorkoutDefinition::beginner();
            workout.exercise_duration_secs = config.session.default_exercise_secs;
            workout.rest_duration_secs = config.session.rest_secs;
            workout.validate()?;
            Ok(workout)
        }
    }
}

/// A fresh one-second ticker whose first tick is one second away.
fn one_second_ticker() -> Interval {
    let period = Duration::from_secs(1);
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn emit_some(event: Option<Event>) -> Result<(), serde_json::Error> {
    match event {
        Some(event) => emit(&event),
        None => Ok(()),
    }
}

/// Returns false when the countdown was interrupted.
async fn get_ready(secs: u32) -> Result<bool, Box<dyn std::error::Error>> {
    for remaining in (1..=secs).rev() {
        emit(&json!({ "type": "get_ready", "remaining_secs": remaining }))?;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = tokio::signal::ctrl_c() => return Ok(false),
        }
    }
    Ok(true)
}

async fn run_session(
    mut session: WorkoutSession,
    get_ready_secs: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    emit(&session.snapshot())?;
    if !get_ready(get_ready_secs).await? {
        return Ok(());
    }

    emit_some(session.start())?;
    let mut ticker = session.is_running().then(one_second_ticker);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    while !session.is_terminal() {
        let input = tokio::select! {
            _ = next_tick(&mut ticker) => Input::Tick,
            line = lines.next_line(), if stdin_open => Input::Line(line),
            _ = tokio::signal::ctrl_c() => Input::Interrupt,
        };

        match input {
            Input::Tick => emit_some(session.tick())?,
            Input::Interrupt => emit_some(session.stop())?,
            Input::Line(Ok(None)) => stdin_open = false,
            Input::Line(Err(e)) => return Err(e.into()),
            Input::Line(Ok(Some(line))) => match Command::parse(&line) {
                Some(Command::Toggle) if session.is_running() => {
                    emit_some(session.pause())?;
                    ticker = None;
                }
                Some(Command::Toggle) => {
                    emit_some(session.resume())?;
                    ticker = session.is_running().then(one_second_ticker);
                }
                Some(Command::Skip) => {
                    emit_some(session.skip())?;
                    // The new stage gets a whole first second.
                    if ticker.is_some() && session.is_running() {
                        ticker = Some(one_second_ticker());
                    }
                }
                Some(Command::Restart) => {
                    emit_some(session.restart())?;
                    ticker = None;
                }
                Some(Command::Stop) => emit_some(session.stop())?,
                None => emit(&session.snapshot())?,
            },
        }
    }
    Ok(())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run {
            workout,
            no_get_ready,
        } => {
            let config = Config::load()?;
            let workout = load_workout(workout.as_deref(), &config)?;
            let feedback = TerminalFeedback::new(config.feedback.sound, config.feedback.vibration);
            let sinks = SessionSinks::new()
                .with_history(Database::open()?)
                .with_audio(feedback)
                .with_haptics(feedback);
            let session = WorkoutSession::new(workout, sinks)?;
            let get_ready_secs = if no_get_ready {
                0
            } else {
                config.session.get_ready_secs
            };
            let rt = runtime()?;
            let result = rt.block_on(run_session(session, get_ready_secs));
            // A pending stdin read cannot be cancelled; don't wait for it.
            rt.shutdown_background();
            result
        }
        SessionAction::Preview { workout } => {
            let config = Config::load()?;
            let workout = load_workout(workout.as_deref(), &config)?;
            let exercises: Vec<_> = workout
                .exercises
                .iter()
                .enumerate()
                .map(|(i, exercise)| {
                    json!({
                        "index": i,
                        "exercise_key": exercise.exercise_key,
                        "name": exercise.display_name(),
                        "duration_secs": workout.duration_of(i),
                    })
                })
                .collect();
            let total = workout.total_duration_secs();
            let plan = json!({
                "name": workout.name,
                "exercises": exercises,
                "rest_secs": workout.rest_duration_secs,
                "total_secs": total,
                "total": format_duration(total),
                "estimated_minutes": workout.estimated_minutes(),
            });
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operator_commands() {
        assert_eq!(Command::parse("p\n"), Some(Command::Toggle));
        assert_eq!(Command::parse(" s "), Some(Command::Skip));
        assert_eq!(Command::parse("restart"), Some(Command::Restart));
        assert_eq!(Command::parse("q"), Some(Command::Stop));
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("x"), None);
    }

    #[test]
    fn default_workout_uses_configured_durations() {
        let mut config = Config::default();
        config.session.default_exercise_secs = 40;
        config.session.rest_secs = 10;
        let workout = load_workout(None, &config).unwrap();
        assert_eq!(workout.exercise_duration_secs, 40);
        assert_eq!(workout.rest_duration_secs, 10);
        assert_eq!(workout.duration_of(0), Some(40));
        assert_eq!(workout.duration_of(2), Some(20));
    }

    #[test]
    fn zero_default_exercise_length_is_rejected() {
        let mut config = Config::default();
        config.session.default_exercise_secs = 0;
        assert!(load_workout(None, &config).is_err());
    }
}
