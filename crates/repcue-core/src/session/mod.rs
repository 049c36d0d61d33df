mod engine;
mod feedback;
mod history;
mod workout;

pub use engine::{SessionSinks, SessionState, Stage, WorkoutSession};
pub use feedback::{AudioCueSink, Cue, FeedbackError, HapticSink, Silent};
pub use history::{estimate_calories, HistoryRecord, HistorySink, SessionStatus, CALORIES_PER_SECOND};
pub use workout::{ExerciseRef, WorkoutDefinition};
