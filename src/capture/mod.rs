//! Voice capture module
//!
//! Two mutually exclusive ways to speak to the widget:
//! - Transcribe: continuous speech-to-text; the dictated text is submitted
//!   like typed input when the user stops
//! - Raw: microphone recording; the audio is handed off as one payload
//!
//! One controller per widget owns the single "capturing" slot, so starting
//! one mode while the other is active is refused.

mod error;
mod platform;
mod raw;
mod transcribe;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::events::AudioInput;

pub use error::{CaptureError, RecognitionErrorCode};
pub use platform::{
    negotiate_encoding, AudioDevice, CaptureEvent, DeviceFailure, RecognitionConfig,
    RecognitionSegment, SpeechService, FALLBACK_ENCODING, PREFERRED_ENCODINGS,
};
pub use raw::{format_elapsed, RawSession};
pub use transcribe::TranscribeSession;

#[cfg(test)]
pub(crate) use platform::fakes;

/// Configured voice input for a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioInputMode {
    Transcribe,
    Raw,
    #[default]
    #[serde(alias = "none")]
    Disabled,
}

impl AudioInputMode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "transcribe" => Self::Transcribe,
            "raw" => Self::Raw,
            "" | "none" | "disabled" | "off" => Self::Disabled,
            other => {
                warn!(mode = other, "unknown audio input mode, disabling voice input");
                Self::Disabled
            }
        }
    }
}

/// The capture mode a session runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Transcribe,
    Raw,
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMode::Transcribe => write!(f, "transcribe"),
            CaptureMode::Raw => write!(f, "raw"),
        }
    }
}

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Capturing,
    Finalizing,
}

/// What a finished session hands to the submission path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Dictated text, submitted as if typed
    Submit(String),
    /// A raw recording, sent as its own audio-input event
    Audio(AudioInput),
}

#[derive(Debug)]
enum Session {
    Transcribe(TranscribeSession),
    Raw(RawSession),
}

/// Owns the capture slot of one widget
pub struct CaptureController {
    mode: AudioInputMode,
    speech: Box<dyn SpeechService>,
    audio: Box<dyn AudioDevice>,
    session: Option<Session>,
    /// A microphone request is outstanding
    awaiting_microphone: bool,
    attached: bool,
}

impl CaptureController {
    pub fn new(
        mode: AudioInputMode,
        speech: Box<dyn SpeechService>,
        audio: Box<dyn AudioDevice>,
    ) -> Self {
        Self {
            mode,
            speech,
            audio,
            session: None,
            awaiting_microphone: false,
            attached: true,
        }
    }

    pub fn mode(&self) -> AudioInputMode {
        self.mode
    }

    /// True while a session exists or is being set up
    pub fn is_capturing(&self) -> bool {
        self.session.is_some() || self.awaiting_microphone
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            Some(Session::Transcribe(s)) => s.state,
            Some(Session::Raw(s)) => s.state,
            None => SessionState::Idle,
        }
    }

    pub fn active_mode(&self) -> Option<CaptureMode> {
        match &self.session {
            Some(Session::Transcribe(_)) => Some(CaptureMode::Transcribe),
            Some(Session::Raw(_)) => Some(CaptureMode::Raw),
            None if self.awaiting_microphone => Some(CaptureMode::Raw),
            None => None,
        }
    }

    /// Live dictation text, if dictating
    pub fn display_text(&self) -> Option<String> {
        match &self.session {
            Some(Session::Transcribe(s)) => Some(s.display_text()),
            _ => None,
        }
    }

    /// Elapsed recording time, if recording
    pub fn elapsed_seconds(&self) -> Option<u64> {
        match &self.session {
            Some(Session::Raw(s)) => Some(s.elapsed_seconds()),
            _ => None,
        }
    }

    /// The microphone button: start when idle, stop otherwise
    pub fn toggle(&mut self, now: Instant) -> Result<Option<CaptureOutcome>, CaptureError> {
        if self.is_capturing() {
            Ok(self.stop(now))
        } else {
            self.start().map(|()| None)
        }
    }

    /// Start a session in the configured mode, falling back when the
    /// platform lacks it
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if !self.attached {
            return Err(CaptureError::Detached);
        }
        if self.is_capturing() {
            return Err(CaptureError::AlreadyCapturing);
        }

        let requested = match self.mode {
            AudioInputMode::Disabled => return Err(CaptureError::Disabled),
            AudioInputMode::Transcribe => CaptureMode::Transcribe,
            AudioInputMode::Raw => CaptureMode::Raw,
        };

        let mode = match requested {
            CaptureMode::Transcribe if !self.speech.is_available() => {
                warn!("speech recognition unavailable, falling back to raw recording");
                CaptureMode::Raw
            }
            CaptureMode::Raw if !self.audio.is_available() => {
                warn!("audio recording unavailable, falling back to transcription");
                CaptureMode::Transcribe
            }
            mode => mode,
        };

        match mode {
            CaptureMode::Transcribe if self.speech.is_available() => self.start_transcribe(),
            CaptureMode::Raw if self.audio.is_available() => {
                self.start_raw();
                Ok(())
            }
            _ => {
                warn!(mode = %requested, "no capture mode available on this platform");
                Err(CaptureError::PlatformUnavailable(requested))
            }
        }
    }

    fn start_transcribe(&mut self) -> Result<(), CaptureError> {
        self.speech.start(RecognitionConfig::default())?;
        self.session = Some(Session::Transcribe(TranscribeSession::new()));
        info!(mode = %CaptureMode::Transcribe, "capture started");
        Ok(())
    }

    fn start_raw(&mut self) {
        self.awaiting_microphone = true;
        debug!("requesting microphone access");
        self.audio.request_microphone();
    }

    /// Explicit stop: the session produces its submission
    ///
    /// Dictation completes immediately. A recording enters `Finalizing` and
    /// completes on `RecorderStopped`, or on a second stop if the recorder
    /// never reports back.
    pub fn stop(&mut self, now: Instant) -> Option<CaptureOutcome> {
        if self.awaiting_microphone && self.session.is_none() {
            self.awaiting_microphone = false;
            debug!("stop before microphone access resolved");
            return None;
        }

        match self.session.take()? {
            Session::Transcribe(mut session) => {
                session.state = SessionState::Finalizing;
                self.speech.stop();
                let text = session.display_text();
                info!(mode = %CaptureMode::Transcribe, chars = text.len(), "capture stopped");
                (!text.is_empty()).then_some(CaptureOutcome::Submit(text))
            }
            Session::Raw(mut session) => {
                if session.state == SessionState::Finalizing {
                    // Tracks are already released; hand off what arrived
                    warn!(
                        bytes = session.buffered_bytes(),
                        "recorder never reported stop, assembling buffered audio"
                    );
                    return session.into_audio_input().map(CaptureOutcome::Audio);
                }

                session.tick(now);
                session.state = SessionState::Finalizing;
                self.stop_raw_capture();
                info!(
                    mode = %CaptureMode::Raw,
                    seconds = session.elapsed_seconds(),
                    "capture stopped, waiting for recorder"
                );
                self.session = Some(Session::Raw(session));
                None
            }
        }
    }

    /// Discard the session without submitting anything
    pub fn cancel(&mut self) {
        if self.awaiting_microphone {
            self.awaiting_microphone = false;
            debug!("microphone request abandoned");
        }

        match self.session.take() {
            Some(Session::Transcribe(_)) => {
                self.speech.abort();
                info!(mode = %CaptureMode::Transcribe, "capture cancelled");
            }
            Some(Session::Raw(session)) => {
                if session.state == SessionState::Capturing {
                    self.stop_raw_capture();
                }
                info!(mode = %CaptureMode::Raw, "capture cancelled");
            }
            None => {}
        }
    }

    /// Component teardown: always cancels, never submits
    pub fn detach(&mut self) {
        self.cancel();
        self.attached = false;
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    /// The single release point for a recording: recorder and tracks
    fn stop_raw_capture(&mut self) {
        self.audio.stop_recording();
        self.audio.release_tracks();
    }

    /// Apply a platform callback
    pub fn handle_event(&mut self, event: CaptureEvent, now: Instant) -> Option<CaptureOutcome> {
        match event {
            CaptureEvent::RecognitionResult {
                result_index,
                results,
            } => {
                if let Some(Session::Transcribe(session)) = &mut self.session {
                    session.apply_results(result_index, &results);
                }
                None
            }
            CaptureEvent::RecognitionEnd => {
                self.restart_recognition();
                None
            }
            CaptureEvent::RecognitionError { code } => {
                self.recognition_failed(RecognitionErrorCode::from_code(&code));
                None
            }
            CaptureEvent::MicrophoneGranted => {
                self.microphone_granted(now);
                None
            }
            CaptureEvent::MicrophoneDenied(failure) => {
                self.microphone_denied(failure);
                None
            }
            CaptureEvent::AudioData(chunk) => {
                if let Some(Session::Raw(session)) = &mut self.session {
                    session.push_chunk(chunk);
                }
                None
            }
            CaptureEvent::Tick => {
                if let Some(Session::Raw(session)) = &mut self.session {
                    if session.state == SessionState::Capturing {
                        session.tick(now);
                    }
                }
                None
            }
            CaptureEvent::RecorderStopped => self.recorder_stopped(),
        }
    }

    /// The recognizer went quiet; resume only if the user has not stopped
    fn restart_recognition(&mut self) {
        let Some(Session::Transcribe(session)) = &mut self.session else {
            return;
        };
        if !self.attached || session.state != SessionState::Capturing {
            return;
        }

        session.restarts += 1;
        debug!(restarts = session.restarts, "restarting speech recognition");

        if let Err(e) = self.speech.start(RecognitionConfig::default()) {
            warn!(error = %e, "speech recognition could not be resumed");
            self.cancel();
        }
    }

    fn recognition_failed(&mut self, code: RecognitionErrorCode) {
        if !matches!(self.session, Some(Session::Transcribe(_))) {
            debug!(%code, "recognition error with no active dictation");
            return;
        }
        warn!(advisory = %code.advisory(), "speech recognition error");
        self.cancel();
    }

    fn microphone_granted(&mut self, now: Instant) {
        if matches!(self.session, Some(Session::Raw(_))) {
            debug!("duplicate microphone grant for the active recording, ignoring");
            return;
        }
        if !self.awaiting_microphone || !self.attached {
            debug!("microphone granted after the request was abandoned, releasing");
            self.audio.release_tracks();
            return;
        }
        self.awaiting_microphone = false;

        let encoding = negotiate_encoding(self.audio.as_ref());
        if let Err(e) = self.audio.start_recording(&encoding) {
            error!(error = %e, "failed to start recorder");
            self.audio.release_tracks();
            return;
        }

        info!(mode = %CaptureMode::Raw, %encoding, "capture started");
        self.session = Some(Session::Raw(RawSession::new(encoding, now)));
    }

    fn microphone_denied(&mut self, failure: DeviceFailure) {
        if !self.awaiting_microphone {
            return;
        }
        self.awaiting_microphone = false;

        let err = match failure {
            DeviceFailure::PermissionDenied => CaptureError::DeviceAccessDenied,
            DeviceFailure::NotFound => CaptureError::DeviceError("no microphone found".into()),
            DeviceFailure::Other(reason) => CaptureError::DeviceError(reason),
        };
        warn!(error = %err, "could not acquire microphone");
    }

    fn recorder_stopped(&mut self) -> Option<CaptureOutcome> {
        if !matches!(self.session, Some(Session::Raw(_))) {
            return None;
        }
        let Some(Session::Raw(session)) = self.session.take() else {
            return None;
        };

        match session.state {
            SessionState::Finalizing => {
                let bytes = session.buffered_bytes();
                let audio = session.into_audio_input();
                if audio.is_none() {
                    warn!("recording stopped with no audio, nothing to send");
                } else {
                    debug!(bytes, "recording assembled");
                }
                audio.map(CaptureOutcome::Audio)
            }
            _ => {
                let err = CaptureError::DeviceError("recorder stopped unexpectedly".into());
                warn!(error = %err, "discarding recording");
                self.stop_raw_capture();
                None
            }
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.cancel();
    }
}
