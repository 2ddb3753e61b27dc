//! Outbound events
//!
//! Everything the engine hands to the external transport: submitted text,
//! recorded audio, and message action records. Each variant is a distinct
//! channel on the wire.

use serde::{Deserialize, Serialize};

/// Polarity of message feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    Positive,
    Negative,
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feedback::Positive => write!(f, "positive"),
            Feedback::Negative => write!(f, "negative"),
        }
    }
}

/// Identifies the message an action was taken on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    /// Ordinal position of the message in the transcript
    pub message_index: usize,
    /// Message content at the time of the action
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

/// A finished raw recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInput {
    /// Base64 text of the recorded bytes
    pub audio: String,
    /// Negotiated encoding, e.g. `audio/webm;codecs=opus`
    pub format: String,
    pub duration_seconds: u64,
    pub size_bytes: usize,
}

/// Signals produced by a widget for the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "kebab-case")]
pub enum OutboundEvent {
    /// Text the user typed or dictated, unmodified
    #[serde(rename = "input")]
    InputSubmitted { value: String },

    AudioInput(AudioInput),

    MessageCopy(ActionRecord),

    MessageFeedback(ActionRecord),

    MessageRegenerate(ActionRecord),

    MessageShare(ActionRecord),
}

impl std::fmt::Display for OutboundEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutboundEvent::InputSubmitted { value } => {
                write!(f, "INPUT ({} chars)", value.chars().count())
            }
            OutboundEvent::AudioInput(audio) => {
                write!(f, "AUDIO_INPUT ({}s, {} bytes)", audio.duration_seconds, audio.size_bytes)
            }
            OutboundEvent::MessageCopy(record) => {
                write!(f, "MESSAGE_COPY (#{})", record.message_index)
            }
            OutboundEvent::MessageFeedback(record) => match record.feedback {
                Some(feedback) => {
                    write!(f, "MESSAGE_FEEDBACK (#{}, {})", record.message_index, feedback)
                }
                None => write!(f, "MESSAGE_FEEDBACK (#{})", record.message_index),
            },
            OutboundEvent::MessageRegenerate(record) => {
                write!(f, "MESSAGE_REGENERATE (#{})", record.message_index)
            }
            OutboundEvent::MessageShare(record) => {
                write!(f, "MESSAGE_SHARE (#{})", record.message_index)
            }
        }
    }
}
