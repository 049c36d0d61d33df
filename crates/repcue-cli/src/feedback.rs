//! Terminal stand-ins for the audio and haptic cue players.

use std::io::Write;

use repcue_core::session::{AudioCueSink, Cue, FeedbackError, HapticSink};
use tracing::debug;

/// Rings the terminal bell for sound cues; vibration has no terminal
/// equivalent and is only logged.
#[derive(Debug, Clone, Copy)]
pub struct TerminalFeedback {
    sound: bool,
    vibration: bool,
}

impl TerminalFeedback {
    pub fn new(sound: bool, vibration: bool) -> Self {
        Self { sound, vibration }
    }
}

impl AudioCueSink for TerminalFeedback {
    fn play(&mut self, cue: Cue) -> Result<(), FeedbackError> {
        if !self.sound {
            return Ok(());
        }
        debug!(sound = cue.sound_name(), "cue");
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| FeedbackError(e.to_string()))
    }
}

impl HapticSink for TerminalFeedback {
    fn vibrate(&mut self, pattern: &[u32]) -> Result<(), FeedbackError> {
        if self.vibration {
            debug!(?pattern, "vibrate");
        }
        Ok(())
    }
}
