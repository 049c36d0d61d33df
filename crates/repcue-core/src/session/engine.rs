//! Workout session state machine.
//!
//! Like the rest of the core, the session owns no thread. The host calls
//! `tick()` once per second while the session is running.
//!
//! ## Stage sequence
//!
//! ```text
//! Exercise(0) -> Rest(0) -> Exercise(1) -> ... -> Exercise(n-1) -> Completed
//!        \__________________ stop() __________________/-> Abandoned
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = WorkoutSession::new(workout, SessionSinks::new())?;
//! session.start();
//! // Once per second:
//! if let Some(event) = session.tick() { render(event); }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::feedback::{AudioCueSink, Cue, HapticSink, Silent};
use super::history::{HistoryRecord, HistorySink, SessionStatus};
use super::workout::WorkoutDefinition;
use crate::clock::{Clock, SystemClock};
use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Exercise,
    Rest,
}

/// Observable state of the active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub stage: Stage,
    pub exercise_index: usize,
    pub time_remaining: u32,
    pub is_running: bool,
    pub is_completed: bool,
    pub is_abandoned: bool,
}

impl SessionState {
    fn initial(workout: &WorkoutDefinition) -> Self {
        Self {
            stage: Stage::Exercise,
            exercise_index: 0,
            time_remaining: workout.duration_of(0).unwrap_or(0),
            is_running: false,
            is_completed: false,
            is_abandoned: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.is_completed || self.is_abandoned
    }
}

/// Collaborators a session reports to.
pub struct SessionSinks {
    pub history: Box<dyn HistorySink>,
    pub audio: Box<dyn AudioCueSink>,
    pub haptics: Box<dyn HapticSink>,
    pub clock: Box<dyn Clock>,
}

impl SessionSinks {
    /// Silent cues, the system clock and an in-memory history.
    pub fn new() -> Self {
        Self {
            history: Box::new(Vec::<HistoryRecord>::new()),
            audio: Box::new(Silent),
            haptics: Box::new(Silent),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_history(mut self, history: impl HistorySink + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    pub fn with_audio(mut self, audio: impl AudioCueSink + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_haptics(mut self, haptics: impl HapticSink + 'static) -> Self {
        self.haptics = Box::new(haptics);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}

impl Default for SessionSinks {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one workout through its exercises and rests.
pub struct WorkoutSession {
    workout: WorkoutDefinition,
    state: SessionState,
    /// Seconds actually spent in stages already left behind.
    elapsed_before_stage: u64,
    sinks: SessionSinks,
}

impl fmt::Debug for WorkoutSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkoutSession")
            .field("workout", &self.workout.name)
            .field("state", &self.state)
            .field("elapsed_before_stage", &self.elapsed_before_stage)
            .finish_non_exhaustive()
    }
}

impl WorkoutSession {
    /// Create a session positioned at the first exercise, not running.
    ///
    /// # Errors
    /// Returns [`ValidationError::NoExercises`] if the workout is empty, or
    /// whatever else [`WorkoutDefinition::validate`] rejects.
    pub fn new(workout: WorkoutDefinition, sinks: SessionSinks) -> Result<Self, ValidationError> {
        workout.validate()?;
        let state = SessionState::initial(&workout);
        Ok(Self {
            workout,
            state,
            elapsed_before_stage: 0,
            sinks,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn workout(&self) -> &WorkoutDefinition {
        &self.workout
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn exercise_index(&self) -> usize {
        self.state.exercise_index
    }

    pub fn time_remaining(&self) -> u32 {
        self.state.time_remaining
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Catalog key of the exercise being performed (or rested after).
    pub fn current_exercise_key(&self) -> &str {
        self.workout
            .exercises
            .get(self.state.exercise_index)
            .map(|e| e.exercise_key.as_str())
            .unwrap_or_default()
    }

    /// Configured length of the current stage.
    pub fn stage_duration(&self) -> u32 {
        self.duration_for(self.state.stage, self.state.exercise_index)
    }

    /// Time actually spent so far: every stage already left plus the
    /// elapsed part of the current one.
    pub fn elapsed_secs(&self) -> u64 {
        if self.state.is_completed {
            return self.elapsed_before_stage;
        }
        let in_stage = self.stage_duration().saturating_sub(self.state.time_remaining);
        self.elapsed_before_stage + u64::from(in_stage)
    }

    /// 0.0 .. 100.0 position within the planned workout.
    pub fn progress_pct(&self) -> f64 {
        if self.state.is_completed {
            return 100.0;
        }
        let total = self.workout.total_duration_secs();
        if total == 0 {
            return 0.0;
        }
        let i = self.state.exercise_index;
        let rest = u64::from(self.workout.rest_duration_secs);
        let mut offset: u64 = (0..i)
            .filter_map(|k| self.workout.duration_of(k))
            .map(u64::from)
            .sum::<u64>()
            + rest * i as u64;
        if self.state.stage == Stage::Rest {
            offset += u64::from(self.workout.duration_of(i).unwrap_or(0));
        }
        let in_stage = self.stage_duration().saturating_sub(self.state.time_remaining);
        ((offset + u64::from(in_stage)) as f64 / total as f64 * 100.0).min(100.0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            workout_name: self.workout.name.clone(),
            stage: self.state.stage,
            exercise_index: self.state.exercise_index,
            exercise_count: self.workout.exercise_count(),
            exercise_key: self.current_exercise_key().to_string(),
            remaining_secs: self.state.time_remaining,
            stage_total_secs: self.stage_duration(),
            is_running: self.state.is_running,
            is_completed: self.state.is_completed,
            is_abandoned: self.state.is_abandoned,
            workout_progress_pct: self.progress_pct(),
            at: self.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the countdown.
    pub fn start(&mut self) -> Option<Event> {
        if self.state.is_terminal() || self.state.is_running || self.state.time_remaining == 0 {
            return None;
        }
        self.state.is_running = true;
        self.signal(Cue::for_stage(self.state.stage));
        Some(Event::SessionStarted {
            stage: self.state.stage,
            exercise_index: self.state.exercise_index,
            remaining_secs: self.state.time_remaining,
            at: self.now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        self.start()
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        self.state.is_running = false;
        Some(Event::SessionPaused {
            stage: self.state.stage,
            exercise_index: self.state.exercise_index,
            remaining_secs: self.state.time_remaining,
            at: self.now(),
        })
    }

    /// One second elapsed. Returns an event when the stage changes.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_running || self.state.is_terminal() || self.state.time_remaining == 0 {
            return None;
        }
        self.state.time_remaining -= 1;
        if self.state.time_remaining == 0 {
            return self.complete_stage();
        }
        None
    }

    /// End the current stage now, exactly as if its countdown had expired.
    pub fn skip(&mut self) -> Option<Event> {
        if self.state.is_terminal() {
            return None;
        }
        self.complete_stage()
    }

    /// Back to the first exercise, stopped, with terminal flags cleared.
    pub fn restart(&mut self) -> Option<Event> {
        self.state = SessionState::initial(&self.workout);
        self.elapsed_before_stage = 0;
        Some(Event::SessionRestarted { at: self.now() })
    }

    /// Abandon the session and record it as incomplete.
    pub fn stop(&mut self) -> Option<Event> {
        if self.state.is_terminal() {
            return None;
        }
        let elapsed = self.elapsed_secs();
        self.state.is_running = false;
        self.state.is_abandoned = true;

        let at = self.now();
        let record = HistoryRecord::new(
            self.workout.name.clone(),
            at,
            elapsed,
            SessionStatus::Incomplete,
        );
        info!(
            workout = %self.workout.name,
            elapsed_secs = elapsed,
            "workout abandoned"
        );
        self.sinks.history.append(&record);
        Some(Event::WorkoutAbandoned { record, at })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn now(&self) -> DateTime<Utc> {
        self.sinks.clock.now()
    }

    fn duration_for(&self, stage: Stage, index: usize) -> u32 {
        match stage {
            Stage::Exercise => self.workout.duration_of(index).unwrap_or(0),
            Stage::Rest => self.workout.rest_duration_secs,
        }
    }

    fn is_last_exercise(&self, index: usize) -> bool {
        index + 1 >= self.workout.exercise_count()
    }

    /// Apply the stage-completion rule. Zero-length stages are passed
    /// through immediately so the countdown never stalls on them.
    fn complete_stage(&mut self) -> Option<Event> {
        loop {
            let spent = self.stage_duration().saturating_sub(self.state.time_remaining);
            self.elapsed_before_stage += u64::from(spent);

            let i = self.state.exercise_index;
            let current = self.state.stage;
            let (stage, index) = match current {
                Stage::Exercise if self.is_last_exercise(i) => return Some(self.finish()),
                Stage::Exercise => (Stage::Rest, i),
                Stage::Rest => (Stage::Exercise, i + 1),
            };

            self.state.stage = stage;
            self.state.exercise_index = index;
            self.state.time_remaining = self.duration_for(stage, index);

            if self.state.time_remaining > 0 {
                if self.state.is_running {
                    self.signal(Cue::for_stage(stage));
                }
                return Some(Event::StageAdvanced {
                    stage,
                    exercise_index: index,
                    exercise_key: self.current_exercise_key().to_string(),
                    duration_secs: self.state.time_remaining,
                    at: self.now(),
                });
            }
        }
    }

    fn finish(&mut self) -> Event {
        self.state.is_running = false;
        self.state.is_completed = true;
        self.state.time_remaining = 0;

        let at = self.now();
        let record = HistoryRecord::new(
            self.workout.name.clone(),
            at,
            self.workout.total_duration_secs(),
            SessionStatus::Complete,
        );
        info!(
            workout = %self.workout.name,
            duration_secs = record.duration_secs,
            calories = record.calories,
            "workout completed"
        );
        self.sinks.history.append(&record);
        self.signal(Cue::WorkoutComplete);
        Event::WorkoutCompleted { record, at }
    }

    fn signal(&mut self, cue: Cue) {
        if let Err(e) = self.sinks.audio.play(cue) {
            debug!(?cue, error = %e, "audio cue dropped");
        }
        if let Err(e) = self.sinks.haptics.vibrate(cue.vibration_pattern()) {
            debug!(?cue, error = %e, "haptic cue dropped");
        }
    }
}
