//! Capture errors and recognition error codes

use super::CaptureMode;

/// Errors that can occur while starting or running a capture session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("voice input is disabled for this widget")]
    Disabled,

    #[error("{0} capture is not supported by this platform")]
    PlatformUnavailable(CaptureMode),

    #[error("a capture session is already active")]
    AlreadyCapturing,

    #[error("widget is detached")]
    Detached,

    #[error("microphone access was denied")]
    DeviceAccessDenied,

    #[error("audio device error: {0}")]
    DeviceError(String),

    #[error("speech recognition failed: {0}")]
    Recognition(RecognitionErrorCode),
}

/// Error codes reported by the speech service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    Network,
    NotAllowed,
    NoSpeech,
    Aborted,
    AudioCapture,
    Other(String),
}

impl RecognitionErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "network" => Self::Network,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            other => Self::Other(other.to_string()),
        }
    }

    /// Human-readable advisory for logs and status text
    pub fn advisory(&self) -> String {
        match self {
            Self::Network => "Speech recognition needs a network connection.".into(),
            Self::NotAllowed => {
                "Microphone permission was denied. Allow microphone access to use voice input."
                    .into()
            }
            Self::NoSpeech => "No speech was detected. Try again.".into(),
            Self::Aborted => "Speech recognition was aborted.".into(),
            Self::AudioCapture => "No microphone was found.".into(),
            Self::Other(code) => format!("Speech recognition error: {code}"),
        }
    }
}

impl std::fmt::Display for RecognitionErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.advisory())
    }
}
