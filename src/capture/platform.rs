//! Platform services used for voice capture
//!
//! The host environment supplies speech recognition and microphone access.
//! Both are asynchronous on the host side: calls here only start work, and
//! results come back later as [`CaptureEvent`]s.

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Encodings tried in order when starting a raw recording
pub const PREFERRED_ENCODINGS: [&str; 4] = [
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/ogg;codecs=opus",
    "audio/mp4",
];

/// Used when the platform supports none of the preferred encodings
pub const FALLBACK_ENCODING: &str = "audio/webm";

/// Recognizer settings for dictation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
        }
    }
}

/// Continuous speech-to-text provided by the host
pub trait SpeechService: Send {
    fn is_available(&self) -> bool;

    /// Begin (or resume) recognition
    fn start(&mut self, config: RecognitionConfig) -> Result<(), CaptureError>;

    /// Stop listening and deliver any pending results
    fn stop(&mut self);

    /// Stop listening and discard pending results
    fn abort(&mut self);
}

/// Microphone and recorder provided by the host
pub trait AudioDevice: Send {
    fn is_available(&self) -> bool;

    fn is_encoding_supported(&self, encoding: &str) -> bool;

    /// Ask for microphone access; answered by `MicrophoneGranted` or
    /// `MicrophoneDenied`
    fn request_microphone(&mut self);

    fn start_recording(&mut self, encoding: &str) -> Result<(), CaptureError>;

    /// Stop the recorder; answered by `RecorderStopped`
    fn stop_recording(&mut self);

    /// Stop every underlying device track
    fn release_tracks(&mut self);
}

/// Pick the first preferred encoding the device supports
pub fn negotiate_encoding(device: &dyn AudioDevice) -> String {
    PREFERRED_ENCODINGS
        .into_iter()
        .find(|encoding| device.is_encoding_supported(encoding))
        .unwrap_or(FALLBACK_ENCODING)
        .to_string()
}

/// One segment of a recognition result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionSegment {
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
}

impl RecognitionSegment {
    pub fn final_text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }
}

/// Why the microphone could not be acquired
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFailure {
    PermissionDenied,
    NotFound,
    Other(String),
}

/// Callbacks from the capture platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Results from `result_index` onward changed
    RecognitionResult {
        result_index: usize,
        results: Vec<RecognitionSegment>,
    },
    RecognitionEnd,
    RecognitionError {
        code: String,
    },
    MicrophoneGranted,
    MicrophoneDenied(DeviceFailure),
    AudioData(Vec<u8>),
    RecorderStopped,
    Tick,
}

#[cfg(test)]
pub(crate) mod fakes {
    //! Recording fakes shared by capture and widget tests

    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Default)]
    pub struct SpeechLog {
        pub starts: usize,
        pub stops: usize,
        pub aborts: usize,
        /// Refuse the next `start` calls
        pub fail_start: bool,
    }

    pub struct FakeSpeech {
        pub available: bool,
        pub log: Arc<Mutex<SpeechLog>>,
    }

    impl FakeSpeech {
        pub fn new(available: bool) -> (Self, Arc<Mutex<SpeechLog>>) {
            let log = Arc::new(Mutex::new(SpeechLog::default()));
            let speech = Self {
                available,
                log: Arc::clone(&log),
            };
            (speech, log)
        }
    }

    impl SpeechService for FakeSpeech {
        fn is_available(&self) -> bool {
            self.available
        }

        fn start(&mut self, _config: RecognitionConfig) -> Result<(), CaptureError> {
            let mut log = self.log.lock().unwrap();
            if log.fail_start {
                return Err(CaptureError::DeviceError("recognizer busy".into()));
            }
            log.starts += 1;
            Ok(())
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().stops += 1;
        }

        fn abort(&mut self) {
            self.log.lock().unwrap().aborts += 1;
        }
    }

    #[derive(Debug, Default)]
    pub struct DeviceLog {
        pub requests: usize,
        pub recording: Option<String>,
        pub recorder_stops: usize,
        pub releases: usize,
    }

    pub struct FakeDevice {
        pub available: bool,
        pub supported: Vec<&'static str>,
        pub log: Arc<Mutex<DeviceLog>>,
    }

    impl FakeDevice {
        pub fn new(available: bool) -> (Self, Arc<Mutex<DeviceLog>>) {
            let log = Arc::new(Mutex::new(DeviceLog::default()));
            let device = Self {
                available,
                supported: vec!["audio/webm", "audio/mp4"],
                log: Arc::clone(&log),
            };
            (device, log)
        }
    }

    impl AudioDevice for FakeDevice {
        fn is_available(&self) -> bool {
            self.available
        }

        fn is_encoding_supported(&self, encoding: &str) -> bool {
            self.supported.contains(&encoding)
        }

        fn request_microphone(&mut self) {
            self.log.lock().unwrap().requests += 1;
        }

        fn start_recording(&mut self, encoding: &str) -> Result<(), CaptureError> {
            self.log.lock().unwrap().recording = Some(encoding.to_string());
            Ok(())
        }

        fn stop_recording(&mut self) {
            self.log.lock().unwrap().recorder_stops += 1;
        }

        fn release_tracks(&mut self) {
            self.log.lock().unwrap().releases += 1;
        }
    }
}
