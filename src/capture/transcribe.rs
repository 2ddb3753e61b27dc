//! Dictation session state
//!
//! Confirmed text accumulates in `final_transcript`; the current unconfirmed
//! guess lives in `interim_text` and is replaced on every update.

use super::platform::RecognitionSegment;
use super::SessionState;

#[derive(Debug)]
pub struct TranscribeSession {
    pub(super) state: SessionState,
    final_transcript: String,
    interim_text: String,
    /// Automatic restarts after the recognizer went quiet
    pub(super) restarts: u32,
}

impl TranscribeSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Capturing,
            final_transcript: String::new(),
            interim_text: String::new(),
            restarts: 0,
        }
    }

    /// Fold a recognition update into the transcript
    pub fn apply_results(&mut self, result_index: usize, results: &[RecognitionSegment]) {
        let mut interim = String::new();
        for segment in results.iter().skip(result_index) {
            if segment.is_final {
                self.final_transcript.push_str(&segment.transcript);
            } else {
                interim.push_str(&segment.transcript);
            }
        }
        self.interim_text = interim;
    }

    pub fn final_transcript(&self) -> &str {
        &self.final_transcript
    }

    pub fn interim_text(&self) -> &str {
        &self.interim_text
    }

    /// What the input shows while dictating
    pub fn display_text(&self) -> String {
        format!("{}{}", self.final_transcript, self.interim_text)
            .trim()
            .to_string()
    }
}

impl Default for TranscribeSession {
    fn default() -> Self {
        Self::new()
    }
}
