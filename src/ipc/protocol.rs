//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::capture::{CaptureEvent, DeviceFailure, RecognitionSegment};
use crate::config::WidgetConfig;
use crate::events::OutboundEvent;
use crate::interaction::{Target, Trigger};
use crate::transcript::Message;
use crate::view::RenderEvent;
use crate::widget::{CaptureCommand, InputEvent, Signal, WidgetSnapshot};

/// Largest frame either side may send
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// What the front end can do for a widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCapabilities {
    /// Speech recognition is available
    pub speech: bool,
    /// A microphone recorder is available
    pub audio: bool,
    /// Recorder encodings the page supports
    pub encodings: Vec<String>,
}

/// Requests from the front end to the daemon
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Subscribe to outbound events and platform commands
    Subscribe,

    /// Create a widget, or re-attach a detached one
    Attach {
        widget: String,
        #[serde(default)]
        config: Option<WidgetConfig>,
        #[serde(default)]
        capabilities: HostCapabilities,
    },

    Detach { widget: String },

    /// An inbound transport signal
    Signal { widget: String, signal: Signal },

    /// User activity in the input box
    Input { widget: String, event: InputEvent },

    /// A click or key press on transcript content
    Interact {
        widget: String,
        target: Target,
        trigger: Trigger,
    },

    /// The microphone controls
    Capture {
        widget: String,
        command: CaptureCommand,
    },

    /// A callback from the page
    Platform { widget: String, event: PlatformEvent },

    Snapshot { widget: String },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::Subscribe => "subscribe",
            Request::Attach { .. } => "attach",
            Request::Detach { .. } => "detach",
            Request::Signal { .. } => "signal",
            Request::Input { .. } => "input",
            Request::Interact { .. } => "interact",
            Request::Capture { .. } => "capture",
            Request::Platform { .. } => "platform",
            Request::Snapshot { .. } => "snapshot",
        }
    }
}

/// Responses from the daemon to the front end
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Request applied
    Ok,

    Snapshot(WidgetSnapshot),

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl ToString) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Push notification from the daemon to subscribed front ends
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A widget produced an outbound signal
    Outbound { widget: String, event: OutboundEvent },

    /// A widget needs the page to do something
    Command {
        widget: String,
        command: PlatformCommand,
    },
}

/// Work a widget asks of the page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlatformCommand {
    StartRecognition {
        continuous: bool,
        interim_results: bool,
    },
    StopRecognition,
    AbortRecognition,
    RequestMicrophone,
    StartRecording { encoding: String },
    StopRecording,
    ReleaseMicrophone,
    WriteClipboard { message_index: usize, text: String },
    ConfirmLink { url: String },
    OpenLink { url: String },
    OpenMenu { message_index: usize },
    FocusInput,
    RenderMessage { index: usize, message: Message },
    /// Text added to the end of a message already rendered
    AppendContent { index: usize, text: String },
    RemoveMessage { index: usize },
    ClearMessages,
}

/// Why the page could not open the microphone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    PermissionDenied,
    NotFound,
    Other,
}

/// Callbacks from the page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    RecognitionResult {
        result_index: usize,
        results: Vec<RecognitionSegment>,
    },
    RecognitionEnd,
    RecognitionError {
        code: String,
    },
    MicrophoneGranted,
    MicrophoneDenied {
        reason: DenialReason,
        #[serde(default)]
        message: Option<String>,
    },
    /// A recorded chunk, base64 encoded
    AudioData {
        data: String,
    },
    RecorderStopped,
    ClipboardResult {
        message_index: usize,
        #[serde(default)]
        error: Option<String>,
    },
    LinkConfirmation {
        url: String,
        #[serde(default)]
        confirmed: bool,
        /// The dialog itself failed
        #[serde(default)]
        error: Option<String>,
    },
    ContentChanged {
        index: usize,
        #[serde(default)]
        text: Option<String>,
    },
    StreamEnded {
        index: usize,
    },
}

/// A page callback once its wire encoding is decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformInput {
    Capture(CaptureEvent),
    Clipboard {
        message_index: usize,
        result: Result<(), String>,
    },
    Link {
        url: Url,
        answer: Result<bool, String>,
    },
    Render(RenderEvent),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("audio data is not valid base64: {0}")]
    InvalidAudio(#[from] base64::DecodeError),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl TryFrom<PlatformEvent> for PlatformInput {
    type Error = ProtocolError;

    fn try_from(event: PlatformEvent) -> Result<Self, Self::Error> {
        let capture = |event| -> Result<Self, ProtocolError> { Ok(PlatformInput::Capture(event)) };

        match event {
            PlatformEvent::RecognitionResult {
                result_index,
                results,
            } => capture(CaptureEvent::RecognitionResult {
                result_index,
                results,
            }),
            PlatformEvent::RecognitionEnd => capture(CaptureEvent::RecognitionEnd),
            PlatformEvent::RecognitionError { code } => {
                capture(CaptureEvent::RecognitionError { code })
            }
            PlatformEvent::MicrophoneGranted => capture(CaptureEvent::MicrophoneGranted),
            PlatformEvent::MicrophoneDenied { reason, message } => {
                let failure = match reason {
                    DenialReason::PermissionDenied => DeviceFailure::PermissionDenied,
                    DenialReason::NotFound => DeviceFailure::NotFound,
                    DenialReason::Other => {
                        DeviceFailure::Other(message.unwrap_or_else(|| "unknown error".into()))
                    }
                };
                capture(CaptureEvent::MicrophoneDenied(failure))
            }
            PlatformEvent::AudioData { data } => {
                capture(CaptureEvent::AudioData(BASE64.decode(data.as_bytes())?))
            }
            PlatformEvent::RecorderStopped => capture(CaptureEvent::RecorderStopped),
            PlatformEvent::ClipboardResult {
                message_index,
                error,
            } => Ok(PlatformInput::Clipboard {
                message_index,
                result: error.map_or(Ok(()), Err),
            }),
            PlatformEvent::LinkConfirmation {
                url,
                confirmed,
                error,
            } => Ok(PlatformInput::Link {
                url: Url::parse(&url)?,
                answer: error.map_or(Ok(confirmed), Err),
            }),
            PlatformEvent::ContentChanged { index, text } => {
                Ok(PlatformInput::Render(RenderEvent::ContentChanged { index, text }))
            }
            PlatformEvent::StreamEnded { index } => {
                Ok(PlatformInput::Render(RenderEvent::StreamEnded { index }))
            }
        }
    }
}

/// Encode a message as one length-prefixed frame
pub fn encode_frame<T: Serialize>(msg: &T) -> serde_json::Result<Vec<u8>> {
    let body = serde_json::to_vec(msg)?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}
