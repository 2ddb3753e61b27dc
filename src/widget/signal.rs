//! Inbound signals and user input events

use serde::{Deserialize, Serialize};

use crate::interaction::{Key, ModifierState};
use crate::state::InputUpdate;
use crate::transcript::{MessagePayload, Role};

/// Signals the transport delivers to a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Signal {
    /// A user turn was sent
    InputSent {
        content: String,
        #[serde(default)]
        role: Option<Role>,
    },
    /// An atomic message
    AppendMessage(MessagePayload),
    /// One chunk of a streamed message
    AppendMessageChunk(MessagePayload),
    ClearMessages,
    UpdateUserInput(InputUpdate),
    /// The backend will not respond to the pending turn
    RemoveLoadingMessage,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::InputSent { .. } => "input-sent",
            Signal::AppendMessage(_) => "append-message",
            Signal::AppendMessageChunk(_) => "append-message-chunk",
            Signal::ClearMessages => "clear-messages",
            Signal::UpdateUserInput(_) => "update-user-input",
            Signal::RemoveLoadingMessage => "remove-loading-message",
        }
    }
}

/// What the user did in the input box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// The box now holds `value`
    Changed { value: String },
    Key {
        key: Key,
        #[serde(default)]
        modifiers: ModifierState,
    },
    CompositionStart,
    CompositionEnd,
    /// The send button
    Submit,
}

/// The microphone controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureCommand {
    Toggle,
    Stop,
    Cancel,
}
