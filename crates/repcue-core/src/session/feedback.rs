//! Sound and haptic cues emitted at stage boundaries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::engine::Stage;

/// Named sound cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    ExerciseStart,
    RestStart,
    WorkoutComplete,
}

impl Cue {
    /// Name of the bundled sound file for this cue.
    pub fn sound_name(self) -> &'static str {
        match self {
            Cue::ExerciseStart => "start",
            Cue::RestStart | Cue::WorkoutComplete => "end",
        }
    }

    /// Cue for entering `stage`.
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Exercise => Cue::ExerciseStart,
            Stage::Rest => Cue::RestStart,
        }
    }

    /// Vibration pattern in milliseconds (on, off, on, ...).
    pub fn vibration_pattern(self) -> &'static [u32] {
        match self {
            Cue::ExerciseStart => &[200],
            Cue::RestStart => &[100, 50, 100],
            Cue::WorkoutComplete => &[100, 50, 100, 50, 300],
        }
    }
}

#[derive(Debug, Error)]
#[error("feedback unavailable: {0}")]
pub struct FeedbackError(pub String);

pub trait AudioCueSink {
    fn play(&mut self, cue: Cue) -> Result<(), FeedbackError>;
}

pub trait HapticSink {
    fn vibrate(&mut self, pattern: &[u32]) -> Result<(), FeedbackError>;
}

/// Sink that ignores every cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl AudioCueSink for Silent {
    fn play(&mut self, _cue: Cue) -> Result<(), FeedbackError> {
        Ok(())
    }
}

impl HapticSink for Silent {
    fn vibrate(&mut self, _pattern: &[u32]) -> Result<(), FeedbackError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_cues_differ() {
        assert_ne!(Cue::for_stage(Stage::Exercise), Cue::for_stage(Stage::Rest));
        assert_ne!(
            Cue::ExerciseStart.vibration_pattern(),
            Cue::RestStart.vibration_pattern()
        );
    }

    #[test]
    fn sound_names_match_bundled_files() {
        assert_eq!(Cue::ExerciseStart.sound_name(), "start");
        assert_eq!(Cue::RestStart.sound_name(), "end");
        assert_eq!(Cue::WorkoutComplete.sound_name(), "end");
    }
}
