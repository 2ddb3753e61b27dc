//! The external message renderer, as seen by the engine
//!
//! The renderer turns message content into markup. The engine only tells it
//! what changed and asks it for the plain text it rendered.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::transcript::Message;

/// Receives transcript changes for display
pub trait MessageView: Send {
    fn message_updated(&mut self, index: usize, message: &Message);

    fn message_removed(&mut self, index: usize);

    fn cleared(&mut self);

    /// Plain text of a rendered message, if the renderer has produced it
    fn rendered_text(&self, index: usize) -> Option<String>;

    /// The renderer reported the plain text it produced for a message
    fn text_rendered(&mut self, _index: usize, _text: String) {}
}

/// Callbacks from the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    ContentChanged {
        index: usize,
        /// Plain text of the new rendering
        #[serde(default)]
        text: Option<String>,
    },
    StreamEnded {
        index: usize,
    },
}

impl RenderEvent {
    pub fn log(&self) {
        match self {
            RenderEvent::ContentChanged { index, text } => {
                trace!(index, has_text = text.is_some(), "rendered content changed")
            }
            RenderEvent::StreamEnded { index } => debug!(index, "rendered stream ended"),
        }
    }
}

/// A view that renders nothing
#[derive(Debug, Default)]
pub struct NullView;

impl MessageView for NullView {
    fn message_updated(&mut self, _index: usize, _message: &Message) {}

    fn message_removed(&mut self, _index: usize) {}

    fn cleared(&mut self) {}

    fn rendered_text(&self, _index: usize) -> Option<String> {
        None
    }
}
