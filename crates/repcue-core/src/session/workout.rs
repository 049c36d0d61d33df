use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};

/// One slot of a workout: a catalog key plus an optional duration override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRef {
    pub exercise_key: String,
    /// Overrides the workout's default exercise duration when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

impl ExerciseRef {
    pub fn new(exercise_key: impl Into<String>) -> Self {
        Self {
            exercise_key: exercise_key.into(),
            duration_secs: None,
        }
    }

    pub fn with_duration(exercise_key: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            exercise_key: exercise_key.into(),
            duration_secs: Some(duration_secs),
        }
    }

    /// Catalog keys are kebab-case; this turns `jumping-jacks` into
    /// `Jumping Jacks` for display.
    pub fn display_name(&self) -> String {
        self.exercise_key
            .split(['-', '_'])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Immutable description of a workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutDefinition {
    pub id: u64,
    pub name: String,
    pub exercises: Vec<ExerciseRef>,
    /// Default per-exercise duration in seconds.
    #[serde(default = "default_exercise_duration")]
    pub exercise_duration_secs: u32,
    /// Rest between consecutive exercises, never after the last one.
    #[serde(default = "default_rest_duration")]
    pub rest_duration_secs: u32,
}

fn default_exercise_duration() -> u32 {
    30
}
fn default_rest_duration() -> u32 {
    15
}

impl WorkoutDefinition {
    /// Built-in starter workout.
    pub fn beginner() -> Self {
        Self {
            id: 1,
            name: "Beginner Workout".into(),
            exercises: vec![
                ExerciseRef::new("jumping-jacks"),
                ExerciseRef::new("squats"),
                ExerciseRef::with_duration("push-ups", 20),
                ExerciseRef::new("lunges"),
                ExerciseRef::with_duration("plank", 45),
            ],
            exercise_duration_secs: default_exercise_duration(),
            rest_duration_secs: default_rest_duration(),
        }
    }

    /// Load a workout from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// workout fails [`validate`](Self::validate).
    pub fn from_toml_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let workout: WorkoutDefinition = toml::from_str(&content).map_err(|e| {
            ValidationError::InvalidValue {
                field: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        workout.validate()?;
        Ok(workout)
    }

    /// Reject workouts a session could not run.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "workout name must not be empty".into(),
            });
        }
        if self.exercises.is_empty() {
            return Err(ValidationError::NoExercises {
                workout: self.name.clone(),
            });
        }
        // A zero-length exercise can never be started. Rests may be zero.
        if let Some(i) = (0..self.exercises.len()).find(|&i| self.duration_of(i) == Some(0)) {
            return Err(ValidationError::InvalidValue {
                field: format!("exercises[{i}].duration_secs"),
                message: format!(
                    "\"{}\" must last at least one second",
                    self.exercises[i].exercise_key
                ),
            });
        }
        Ok(())
    }

    pub fn exercise_count(&self) -> usize {
        self.exercises.len()
    }

    /// Effective duration of exercise `index`.
    pub fn duration_of(&self, index: usize) -> Option<u32> {
        self.exercises
            .get(index)
            .map(|e| e.duration_secs.unwrap_or(self.exercise_duration_secs))
    }

    pub fn exercise_total_secs(&self) -> u64 {
        (0..self.exercises.len())
            .filter_map(|i| self.duration_of(i))
            .map(u64::from)
            .sum()
    }

    pub fn rest_total_secs(&self) -> u64 {
        let rests = self.exercises.len().saturating_sub(1) as u64;
        rests * u64::from(self.rest_duration_secs)
    }

    /// Sum of all exercises plus the rests between them.
    pub fn total_duration_secs(&self) -> u64 {
        self.exercise_total_secs() + self.rest_total_secs()
    }

    /// Rounded length for listings ("15 min").
    pub fn estimated_minutes(&self) -> u64 {
        (self.total_duration_secs() + 30) / 60
    }
}

impl Default for WorkoutDefinition {
    fn default() -> Self {
        Self::beginner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_exercises() -> WorkoutDefinition {
        WorkoutDefinition {
            id: 7,
            name: "Quick".into(),
            exercises: vec![
                ExerciseRef::with_duration("a", 30),
                ExerciseRef::with_duration("b", 20),
            ],
            exercise_duration_secs: 40,
            rest_duration_secs: 15,
        }
    }

    #[test]
    fn override_beats_default_duration() {
        let mut w = two_exercises();
        w.exercises[1].duration_secs = None;
        assert_eq!(w.duration_of(0), Some(30));
        assert_eq!(w.duration_of(1), Some(40));
        assert_eq!(w.duration_of(2), None);
    }

    #[test]
    fn total_counts_rests_between_exercises_only() {
        let w = two_exercises();
        assert_eq!(w.total_duration_secs(), 30 + 15 + 20);
    }

    #[test]
    fn single_exercise_has_no_rest() {
        let mut w = two_exercises();
        w.exercises.truncate(1);
        assert_eq!(w.rest_total_secs(), 0);
        assert_eq!(w.total_duration_secs(), 30);
    }

    #[test]
    fn estimated_minutes_rounds() {
        let w = two_exercises();
        assert_eq!(w.estimated_minutes(), 1);
        assert_eq!(WorkoutDefinition::beginner().estimated_minutes(), 4);
    }

    #[test]
    fn validate_rejects_empty_workouts() {
        let mut w = two_exercises();
        w.exercises.clear();
        assert!(matches!(
            w.validate(),
            Err(ValidationError::NoExercises { .. })
        ));
        let mut w = two_exercises();
        w.name = "  ".into();
        assert!(matches!(
            w.validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_length_exercises() {
        let mut w = two_exercises();
        w.exercises[0].duration_secs = Some(0);
        match w.validate() {
            Err(ValidationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "exercises[0].duration_secs");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }

        let mut w = two_exercises();
        w.exercises[0].duration_secs = None;
        w.exercise_duration_secs = 0;
        assert!(w.validate().is_err());

        let mut w = two_exercises();
        w.rest_duration_secs = 0;
        assert!(w.validate().is_ok());
    }

    #[test]
    fn display_name_from_catalog_key() {
        assert_eq!(ExerciseRef::new("jumping-jacks").display_name(), "Jumping Jacks");
        assert_eq!(ExerciseRef::new("plank").display_name(), "Plank");
    }

    #[test]
    fn parses_from_toml_with_defaults() {
        let src = r#"
            id = 3
            name = "Legs"

            [[exercises]]
            exercise_key = "squats"

            [[exercises]]
            exercise_key = "lunges"
            duration_secs = 45
        "#;
        let w: WorkoutDefinition = toml::from_str(src).unwrap();
        assert_eq!(w.exercise_duration_secs, 30);
        assert_eq!(w.rest_duration_secs, 15);
        assert_eq!(w.duration_of(1), Some(45));
    }
}
