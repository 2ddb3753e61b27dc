//! Ordered transcript ledger with chunk reassembly
//!
//! The store never toggles input availability itself. Operations report
//! whether the turn they completed should be finalized and the owning
//! container acts on that.

use tracing::{debug, trace};

use super::message::{ChunkType, Message, Operation, Role};

/// Errors raised by transcript mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    /// A continuation chunk arrived with nothing to continue
    #[error("no active message to apply the chunk to; message_start must come first")]
    NoActiveMessage,
}

/// What a mutation did to the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreUpdate {
    /// Index of the entry that was created or written
    pub index: usize,
    /// Placeholder removed from the tail before the write, if any
    pub removed_placeholder: Option<usize>,
    /// The turn is complete and input should be re-enabled
    pub finalize: bool,
}

/// The transcript: append-only except for `clear`
#[derive(Debug, Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
    default_icon: Option<String>,
}

impl TranscriptStore {
    pub fn new(default_icon: Option<String>) -> Self {
        Self {
            messages: Vec::new(),
            default_icon,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Index of the loading placeholder, which can only ever be the tail
    pub fn placeholder_index(&self) -> Option<usize> {
        match self.messages.last() {
            Some(last) if last.is_placeholder() => Some(self.messages.len() - 1),
            _ => None,
        }
    }

    /// Insert a message at the tail, replacing an empty loading placeholder
    pub fn append(&mut self, mut message: Message, finalize: bool) -> StoreUpdate {
        let removed_placeholder = self.remove_placeholder();

        if message.role == Role::Assistant && message.icon.is_none() {
            message.icon = self.default_icon.clone();
        }

        debug!(
            role = %message.role,
            len = message.content.len(),
            finalize,
            "appending message"
        );
        self.messages.push(message);

        StoreUpdate {
            index: self.messages.len() - 1,
            removed_placeholder,
            finalize,
        }
    }

    /// Append the loading placeholder for a pending response
    pub fn add_placeholder(&mut self) -> StoreUpdate {
        self.append(Message::placeholder(), false)
    }

    /// Drop the tail if it is a placeholder that never received content
    pub fn remove_placeholder(&mut self) -> Option<usize> {
        let index = self.placeholder_index()?;
        self.messages.pop();
        debug!(index, "removed loading placeholder");
        Some(index)
    }

    /// Apply one chunk of a streamed message
    pub fn append_chunk(&mut self, mut message: Message) -> Result<StoreUpdate, TranscriptError> {
        if message.chunk_type == Some(ChunkType::MessageStart) {
            message.content.clear();
            message.streaming = true;
            return Ok(self.append(message, false));
        }

        let index = self
            .messages
            .len()
            .checked_sub(1)
            .ok_or(TranscriptError::NoActiveMessage)?;
        let tail = &mut self.messages[index];

        match message.operation {
            Some(Operation::Append) => tail.content.push_str(&message.content),
            _ => tail.content = message.content,
        }
        if !tail.content.is_empty() {
            tail.placeholder = false;
        }
        tail.chunk_type = message.chunk_type;
        tail.operation = message.operation;

        let finalize = message.chunk_type == Some(ChunkType::MessageEnd);
        if finalize {
            tail.streaming = false;
        }

        trace!(index, len = tail.content.len(), finalize, "applied chunk");

        Ok(StoreUpdate {
            index,
            removed_placeholder: None,
            finalize,
        })
    }

    /// Empty the transcript
    pub fn clear(&mut self) {
        debug!(removed = self.messages.len(), "clearing transcript");
        self.messages.clear();
    }
}
