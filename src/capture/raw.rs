//! Raw recording session state

use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::events::AudioInput;

use super::SessionState;

#[derive(Debug)]
pub struct RawSession {
    pub(super) state: SessionState,
    encoding: String,
    start_time: Instant,
    elapsed_seconds: u64,
    chunks: Vec<Vec<u8>>,
}

impl RawSession {
    pub fn new(encoding: String, start_time: Instant) -> Self {
        Self {
            state: SessionState::Capturing,
            encoding,
            start_time,
            elapsed_seconds: 0,
            chunks: Vec::new(),
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Refresh the elapsed duration from the clock
    pub fn tick(&mut self, now: Instant) {
        self.elapsed_seconds = now.saturating_duration_since(self.start_time).as_secs();
    }

    /// Assemble the buffered chunks into one payload
    ///
    /// Returns `None` when nothing was recorded.
    pub fn into_audio_input(self) -> Option<AudioInput> {
        let payload = self.chunks.concat();
        if payload.is_empty() {
            return None;
        }

        Some(AudioInput {
            audio: BASE64.encode(&payload),
            format: self.encoding,
            duration_seconds: self.elapsed_seconds,
            size_bytes: payload.len(),
        })
    }
}

/// `m:ss` form of a recording duration
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
