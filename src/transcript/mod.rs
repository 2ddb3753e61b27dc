//! Transcript module
//!
//! Holds the ordered sequence of messages shown in a widget and reassembles
//! streamed responses chunk by chunk.

mod actions;
mod message;
mod store;

pub use actions::{ActionKind, ActionSet, ActionSpec};
pub use message::{ChunkType, ContentType, DisplayIcon, Message, MessagePayload, Operation, Role};
pub use store::{StoreUpdate, TranscriptError, TranscriptStore};
